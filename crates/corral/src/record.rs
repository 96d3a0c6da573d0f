//! Bookkeeping wrapper around one pooled resource.

use tokio::time::Instant;

use crate::config::PoolConfig;

/// Identifier for a [`Record`] within its pool.
pub(crate) type RecordId = u64;

/// Lifecycle state of a pooled resource.
///
/// A resource being created has no record yet (the pool tracks in-flight
/// creations as a count); a destroyed record is removed from the pool, so
/// neither end of the lifecycle appears here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordState {
    /// In the idle set, ready to be loaned out.
    Idle,
    /// On loan to a borrower.
    Allocated,
    /// Undergoing a borrow- or return-time validation.
    Validating,
    /// Condemned; awaiting factory destruction.
    Invalid,
}

/// A pool entry wrapping one resource.
///
/// The `slot` holds the resource whenever the pool owns it; it is empty
/// while the resource is loaned out or carried by an in-flight validation
/// or destruction task.
#[derive(Debug)]
pub(crate) struct Record<T> {
    pub(crate) slot: Option<T>,
    pub(crate) state: RecordState,
    pub(crate) created_at: Instant,
    pub(crate) last_used: Instant,
}

impl<T> Record<T> {
    pub(crate) fn new_idle(resource: T) -> Self {
        let now = Instant::now();
        Self {
            slot: Some(resource),
            state: RecordState::Idle,
            created_at: now,
            last_used: now,
        }
    }

    /// Mark the record as used now.
    pub(crate) fn touch(&mut self) {
        self.last_used = Instant::now();
    }

    /// Whether the record is eligible for eviction: idle past the idle
    /// timeout, or older than the maximum lifetime.
    pub(crate) fn is_expired(&self, config: &PoolConfig) -> bool {
        config
            .idle_timeout
            .is_some_and(|limit| self.last_used.elapsed() >= limit)
            || config
                .max_lifetime
                .is_some_and(|limit| self.created_at.elapsed() >= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn new_record_is_idle_with_resource() {
        let rec = Record::new_idle("conn");
        assert_eq!(rec.state, RecordState::Idle);
        assert_eq!(rec.slot, Some("conn"));
        assert_eq!(rec.created_at, rec.last_used);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_expiry_tracks_last_use() {
        let mut rec = Record::new_idle(());
        let config = PoolConfig {
            idle_timeout: Some(Duration::from_millis(10)),
            ..Default::default()
        };
        assert!(!rec.is_expired(&config));

        tokio::time::sleep(Duration::from_millis(15)).await;
        assert!(rec.is_expired(&config));

        rec.touch();
        assert!(!rec.is_expired(&config));
    }

    #[tokio::test(start_paused = true)]
    async fn lifetime_expiry_ignores_touch() {
        let mut rec = Record::new_idle(());
        let config = PoolConfig {
            max_lifetime: Some(Duration::from_millis(20)),
            ..Default::default()
        };
        assert!(!rec.is_expired(&config));

        tokio::time::sleep(Duration::from_millis(25)).await;
        rec.touch();
        assert!(rec.is_expired(&config));
    }

    #[test]
    fn no_limits_means_never_expired() {
        let rec = Record::new_idle(());
        assert!(!rec.is_expired(&PoolConfig::default()));
    }
}
