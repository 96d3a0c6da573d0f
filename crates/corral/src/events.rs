//! Event broadcasting for pool lifecycle observability.
//!
//! Provides [`PoolEvent`] variants emitted as the pool creates, loans,
//! returns, and retires resources, and an [`EventBus`] backed by
//! `tokio::sync::broadcast`. Emission is fire-and-forget: with no
//! subscribers, events are dropped without backpressure.

use std::time::Duration;

use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// PoolEvent
// ---------------------------------------------------------------------------

/// Events emitted during pool lifecycle operations.
#[derive(Debug, Clone)]
pub enum PoolEvent {
    /// A factory creation completed and the resource joined the pool.
    Created,
    /// A resource was loaned to a borrower.
    Acquired {
        /// How long the borrower waited for dispatch.
        waited: Duration,
    },
    /// A loaned resource was returned to the pool.
    Released {
        /// How long the borrower held the loan.
        held: Duration,
    },
    /// An acquire gave up after exceeding its deadline.
    AcquireTimedOut {
        /// The configured deadline that expired.
        waited: Duration,
    },
    /// A resource was permanently removed from the pool.
    Destroyed {
        /// Why the resource was removed.
        reason: DestroyReason,
    },
    /// The pool finished quiescing: no loans outstanding, no waiters queued.
    Drained,
    /// The pool destroyed its idle resources and reached its terminal state.
    Cleared,
}

// ---------------------------------------------------------------------------
// DestroyReason
// ---------------------------------------------------------------------------

/// Reason a resource was permanently removed from the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyReason {
    /// A borrow- or return-time validation rejected the resource.
    FailedValidation,
    /// The eviction sweep retired the resource after its idle timeout.
    Evicted,
    /// A borrower force-retired the resource.
    Forced,
    /// The resource was detached from the pool without destruction.
    Detached,
    /// The pool was cleared.
    Cleared,
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Broadcast-based event bus for pool lifecycle events.
pub(crate) struct EventBus {
    sender: broadcast::Sender<PoolEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer size.
    pub(crate) fn new(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size);
        Self { sender }
    }

    /// Emit an event to all current subscribers.
    ///
    /// Non-blocking; with no active receivers the event is silently dropped.
    pub(crate) fn emit(&self, event: PoolEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to events emitted after this call.
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.sender.receiver_count())
            .finish()
    }
}
