//! Acquire deadlines and what happens to work earmarked for a waiter that
//! gave up.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use corral::{BoxError, Error, Factory, Pool, PoolConfig};
use tokio::sync::Semaphore;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Test factories
// ---------------------------------------------------------------------------

struct CountingFactory {
    counter: AtomicU64,
}

impl CountingFactory {
    fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }
}

impl Factory for CountingFactory {
    type Resource = u64;

    fn id(&self) -> &str {
        "counting"
    }

    async fn create(&self) -> Result<u64, BoxError> {
        Ok(self.counter.fetch_add(1, Ordering::SeqCst))
    }

    async fn destroy(&self, _resource: u64) -> Result<(), BoxError> {
        Ok(())
    }
}

struct GatedFactory {
    gate: Arc<Semaphore>,
    counter: AtomicU64,
}

impl Factory for GatedFactory {
    type Resource = u64;

    fn id(&self) -> &str {
        "gated"
    }

    async fn create(&self) -> Result<u64, BoxError> {
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        Ok(self.counter.fetch_add(1, Ordering::SeqCst))
    }

    async fn destroy(&self, _resource: u64) -> Result<(), BoxError> {
        Ok(())
    }
}

/// With the only resource held, a second acquire rejects after the
/// configured deadline and the waiter queue empties.
#[tokio::test(start_paused = true)]
async fn acquire_times_out_and_pending_returns_to_zero() {
    let config = PoolConfig {
        max: 1,
        acquire_timeout: Some(Duration::from_millis(50)),
        ..Default::default()
    };
    let pool = Pool::new(CountingFactory::new(), config).unwrap();

    let held = pool.acquire().await.unwrap();

    let start = Instant::now();
    let err = pool.acquire().await.unwrap_err();
    assert!(
        matches!(err, Error::AcquireTimeout { .. }),
        "got: {err:?}"
    );
    assert!(start.elapsed() >= Duration::from_millis(50));
    assert_eq!(pool.status().pending, 0);
    assert_eq!(pool.stats().timeouts, 1);

    drop(held);
}

/// A creation earmarked for a waiter that timed out still completes; the
/// resulting resource joins the idle set instead of being lost.
#[tokio::test(start_paused = true)]
async fn late_creation_after_timeout_joins_the_idle_set() {
    let gate = Arc::new(Semaphore::new(0));
    let factory = GatedFactory {
        gate: Arc::clone(&gate),
        counter: AtomicU64::new(0),
    };
    let config = PoolConfig {
        max: 1,
        acquire_timeout: Some(Duration::from_millis(50)),
        ..Default::default()
    };
    let pool = Pool::new(factory, config).unwrap();

    // The creation for this acquire parks on the gate past the deadline.
    let err = pool.acquire().await.unwrap_err();
    assert!(matches!(err, Error::AcquireTimeout { .. }));
    assert_eq!(pool.status().pending, 0);

    // Let the creation finish now that nobody is waiting.
    gate.add_permits(1);
    tokio::time::sleep(Duration::from_millis(20)).await;

    let status = pool.status();
    assert_eq!(status.size, 1);
    assert_eq!(status.available, 1, "late resource should be kept");

    // The next acquire reuses it without creating another.
    let loan = pool.acquire().await.unwrap();
    assert_eq!(*loan, 0);
    assert_eq!(pool.stats().created, 1);
}

/// A creation earmarked for a timed-out waiter is handed to the next
/// waiter still in the queue.
#[tokio::test(start_paused = true)]
async fn late_creation_goes_to_the_next_waiter() {
    let gate = Arc::new(Semaphore::new(0));
    let factory = GatedFactory {
        gate: Arc::clone(&gate),
        counter: AtomicU64::new(0),
    };
    let config = PoolConfig {
        max: 1,
        acquire_timeout: Some(Duration::from_millis(50)),
        ..Default::default()
    };
    let pool = Pool::new(factory, config).unwrap();

    // First waiter triggers the creation, then times out.
    let impatient = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.acquire().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Second waiter arrives with a fresh deadline.
    let patient = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.acquire().await })
    };
    tokio::time::sleep(Duration::from_millis(40)).await;

    // The first has timed out by now; the second is still waiting.
    assert!(matches!(
        impatient.await.unwrap(),
        Err(Error::AcquireTimeout { .. })
    ));
    assert_eq!(pool.status().pending, 1);

    gate.add_permits(1);
    let loan = patient.await.unwrap().unwrap();
    assert_eq!(*loan, 0, "late creation dispatched to the surviving waiter");
}
