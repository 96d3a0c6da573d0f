//! Background eviction of long-idle resources.
//!
//! A periodic sweep inspects a bounded number of idle records per run
//! (oldest idle first) and retires those past their idle timeout or maximum
//! lifetime, never shrinking the pool below `min`. The sweep takes only
//! short critical sections; factory destruction runs outside the lock.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::Strategy;
use crate::events::DestroyReason;
use crate::factory::Factory;
use crate::pool::{Mode, Shared};
use crate::record::{RecordId, RecordState};

/// Sweep loop. Exits when the pool is cleared (token), or when the last
/// pool handle is dropped (weak upgrade fails).
pub(crate) async fn run<F: Factory>(
    shared: Weak<Shared<F>>,
    period: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; skip it so the first sweep
    // happens one full period after start.
    ticker.tick().await;
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let Some(shared) = shared.upgrade() else {
            break;
        };
        sweep(&shared).await;
    }
}

/// One eviction pass.
async fn sweep<F: Factory>(shared: &Arc<Shared<F>>) {
    if shared.config.idle_timeout.is_none() && shared.config.max_lifetime.is_none() {
        return;
    }

    let mut doomed: Vec<(RecordId, F::Resource)> = Vec::new();
    {
        let mut guard = shared.state.lock();
        let st = &mut *guard;
        if st.mode != Mode::Running {
            return;
        }
        let budget = shared.config.num_tests_per_run.min(st.available.len());
        // The oldest idle entries sit at the front under Fifo and at the
        // back under Lifo.
        let candidates: Vec<RecordId> = match shared.config.strategy {
            Strategy::Fifo => st.available.iter().take(budget).copied().collect(),
            Strategy::Lifo => st.available.iter().rev().take(budget).copied().collect(),
        };
        for rid in candidates {
            if st.records.len() - doomed.len() <= shared.config.min {
                break;
            }
            let Some(rec) = st.records.get_mut(&rid) else {
                // Stale id in the idle queue; dispatch discards these.
                continue;
            };
            if !rec.is_expired(&shared.config) {
                continue;
            }
            let Some(resource) = rec.slot.take() else {
                continue;
            };
            rec.state = RecordState::Invalid;
            doomed.push((rid, resource));
        }
        if !doomed.is_empty() {
            st.available.retain(|rid| {
                st.records
                    .get(rid)
                    .is_some_and(|rec| rec.state == RecordState::Idle)
            });
        }
    }

    let evicted = doomed.len();
    for (rid, resource) in doomed {
        shared.retire(rid, resource, DestroyReason::Evicted).await;
    }
    if evicted > 0 {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            factory = shared.factory.id(),
            evicted,
            "eviction sweep retired idle resources"
        );
    }
}
