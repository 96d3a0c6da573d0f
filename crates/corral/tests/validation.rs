//! Borrow-time and return-time validation paths.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use corral::{BoxError, Factory, Pool, PoolConfig};

// ---------------------------------------------------------------------------
// Test factory
// ---------------------------------------------------------------------------

/// Factory whose validate fails a configured number of times, then passes.
struct FlakyFactory {
    counter: AtomicU64,
    fails_remaining: AtomicU32,
}

impl FlakyFactory {
    fn failing(times: u32) -> Self {
        Self {
            counter: AtomicU64::new(0),
            fails_remaining: AtomicU32::new(times),
        }
    }
}

impl Factory for FlakyFactory {
    type Resource = u64;

    fn id(&self) -> &str {
        "flaky"
    }

    async fn create(&self) -> Result<u64, BoxError> {
        Ok(self.counter.fetch_add(1, Ordering::SeqCst))
    }

    async fn destroy(&self, _resource: u64) -> Result<(), BoxError> {
        Ok(())
    }

    async fn validate(&self, _resource: &u64) -> bool {
        // Consume one failure if any are left; valid otherwise.
        self.fails_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_err()
    }
}

/// A stale idle resource fails its borrow test, is destroyed, and the
/// acquire still succeeds on a freshly created replacement.
#[tokio::test]
async fn borrow_validation_retries_until_a_healthy_resource() {
    let config = PoolConfig {
        max: 2,
        test_on_borrow: true,
        ..Default::default()
    };
    let pool = Pool::new(FlakyFactory::failing(1), config).unwrap();

    // Fresh creations are not validated; seed one idle resource.
    let seed = pool.acquire().await.unwrap();
    assert_eq!(*seed, 0);
    pool.release(seed);
    tokio::time::sleep(Duration::from_millis(20)).await;

    // The idle resource fails validation and a replacement is created.
    let loan = pool.acquire().await.unwrap();
    assert_eq!(*loan, 1, "should get the replacement, not the stale one");

    let stats = pool.stats();
    assert_eq!(stats.created, 2);
    assert_eq!(stats.destroyed, 1);
    assert_eq!(pool.status().size, 1);
}

/// A resource failing its return test never re-enters the idle set.
#[tokio::test]
async fn return_validation_discards_unhealthy_resources() {
    let config = PoolConfig {
        max: 1,
        test_on_return: true,
        ..Default::default()
    };
    let pool = Pool::new(FlakyFactory::failing(1), config).unwrap();

    let loan = pool.acquire().await.unwrap();
    pool.release(loan);
    tokio::time::sleep(Duration::from_millis(20)).await;

    let status = pool.status();
    assert_eq!(status.size, 0, "failed return test should destroy");
    assert_eq!(status.available, 0);

    // The slot is free again; the next acquire creates a replacement.
    let loan = pool.acquire().await.unwrap();
    assert_eq!(*loan, 1);
    let stats = pool.stats();
    assert_eq!(stats.created, 2);
    assert_eq!(stats.destroyed, 1);
}

/// A healthy return test puts the resource back into rotation.
#[tokio::test]
async fn return_validation_keeps_healthy_resources() {
    let config = PoolConfig {
        max: 1,
        test_on_return: true,
        ..Default::default()
    };
    let pool = Pool::new(FlakyFactory::failing(0), config).unwrap();

    let loan = pool.acquire().await.unwrap();
    pool.release(loan);
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(pool.status().available, 1);
    let loan = pool.acquire().await.unwrap();
    assert_eq!(*loan, 0, "healthy resource should be reused");
    assert_eq!(pool.stats().destroyed, 0);
}

/// A borrower that observed a broken resource can force-retire it.
#[tokio::test]
async fn borrower_can_force_destroy_a_loan() {
    let config = PoolConfig {
        max: 1,
        ..Default::default()
    };
    let pool = Pool::new(FlakyFactory::failing(0), config).unwrap();

    let loan = pool.acquire().await.unwrap();
    pool.destroy(loan).await;

    let status = pool.status();
    assert_eq!(status.size, 0);
    assert_eq!(status.borrowed, 0);
    assert_eq!(pool.stats().destroyed, 1);

    // The slot is free: a replacement can be created.
    let loan = pool.acquire().await.unwrap();
    assert_eq!(*loan, 1);
}

/// Force-destroying a loan while a waiter is queued frees the slot for a
/// replacement creation dispatched to that waiter.
#[tokio::test]
async fn force_destroy_unblocks_queued_waiters() {
    let config = PoolConfig {
        max: 1,
        ..Default::default()
    };
    let pool = Pool::new(FlakyFactory::failing(0), config).unwrap();

    let loan = pool.acquire().await.unwrap();
    let waiting = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.acquire().await.unwrap() })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    pool.destroy(loan).await;
    let replacement = waiting.await.unwrap();
    assert_eq!(*replacement, 1);
}
