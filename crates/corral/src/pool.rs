//! Pool core: shared state, the dispatch pump, and the public lifecycle.
//!
//! All bookkeeping lives behind a single mutex. Factory calls (create,
//! destroy, validate) always run outside the critical section, with the
//! affected record pre-marked so concurrent operations see and skip it.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::{PoolConfig, Strategy};
use crate::deferred::{Deferred, deferred};
use crate::error::{Error, Result};
use crate::events::{DestroyReason, EventBus, PoolEvent};
use crate::evictor;
use crate::factory::Factory;
use crate::loan::Loan;
use crate::queue::PriorityQueue;
use crate::record::{Record, RecordId, RecordState};

// ---------------------------------------------------------------------------
// Introspection types
// ---------------------------------------------------------------------------

/// Point-in-time occupancy of the pool.
#[derive(Debug, Clone, Copy)]
pub struct Status {
    /// Number of resources the pool currently manages.
    pub size: usize,
    /// Resources idle and ready to be loaned out.
    pub available: usize,
    /// Resources currently on loan.
    pub borrowed: usize,
    /// Acquires waiting for dispatch.
    pub pending: usize,
    /// Room left for new resources, net of in-flight creations.
    pub spare_capacity: usize,
    /// Configured lower bound.
    pub min: usize,
    /// Configured upper bound.
    pub max: usize,
}

/// Cumulative lifecycle counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stats {
    /// Resources created by the factory.
    pub created: u64,
    /// Resources permanently removed from the pool.
    pub destroyed: u64,
    /// Successful acquisitions.
    pub acquisitions: u64,
    /// Returns to the pool.
    pub releases: u64,
    /// Acquires that gave up waiting.
    pub timeouts: u64,
}

// ---------------------------------------------------------------------------
// Pool internals
// ---------------------------------------------------------------------------

/// Lifecycle phase of the pool itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Running,
    Draining,
    Cleared,
}

/// One pending acquire.
struct Waiter<T> {
    enqueued_at: Instant,
    deferred: Deferred<(RecordId, T)>,
}

/// Everything the pool tracks, guarded by one mutex.
pub(crate) struct PoolState<T> {
    pub(crate) records: HashMap<RecordId, Record<T>>,
    /// Idle records in dispatch order; the front is borrowed next.
    pub(crate) available: VecDeque<RecordId>,
    waiters: PriorityQueue<Waiter<T>>,
    /// Factory creations currently in flight (no record yet).
    pub(crate) creating: usize,
    pub(crate) mode: Mode,
    borrowed: usize,
    started: bool,
    next_record_id: RecordId,
    next_waiter_key: u64,
    drain_waiters: Vec<Deferred<()>>,
    counters: Stats,
}

/// Async work the dispatch pump decided on under the lock.
enum Op<T> {
    Idle,
    Create { earmark: Option<u64> },
    Validate { record: RecordId, resource: T },
}

/// Inner shared state for the pool.
pub(crate) struct Shared<F: Factory> {
    pub(crate) factory: F,
    pub(crate) config: PoolConfig,
    pub(crate) state: Mutex<PoolState<F::Resource>>,
    events: EventBus,
    shutdown: CancellationToken,
    /// Back-reference for spawning pump tasks from `&self` contexts.
    self_ref: Weak<Shared<F>>,
}

impl<F: Factory> Shared<F> {
    /// Start pre-warming and the eviction sweep. Idempotent.
    fn start(&self) {
        {
            let mut st = self.state.lock();
            if st.started {
                return;
            }
            st.started = true;
        }
        if let Some(period) = self.config.eviction_interval {
            tokio::spawn(evictor::run(
                self.self_ref.clone(),
                period,
                self.shutdown.clone(),
            ));
        }
        self.spawn_pump();
    }

    /// Run the dispatch pump on a fresh task.
    ///
    /// Pumping never happens on a caller's future: cancelling a public
    /// operation must not be able to abandon bookkeeping midway.
    pub(crate) fn spawn_pump(&self) {
        let Some(shared) = self.self_ref.upgrade() else {
            return;
        };
        tokio::spawn(async move { shared.pump().await });
    }

    /// Dispatch until no further progress is possible.
    async fn pump(self: Arc<Self>) {
        loop {
            match self.next_op() {
                Op::Idle => break,
                Op::Create { earmark } => {
                    let shared = Arc::clone(&self);
                    tokio::spawn(async move { shared.run_create(earmark).await });
                }
                Op::Validate { record, resource } => self.run_validate(record, resource).await,
            }
        }
    }

    /// One scheduling decision under the lock.
    ///
    /// Direct allocations complete inline; anything that needs a factory
    /// call is handed back as an [`Op`]. In-flight creations are counted
    /// before this returns, so concurrent pumps never overshoot `max`.
    fn next_op(&self) -> Op<F::Resource> {
        let mut guard = self.state.lock();
        let st = &mut *guard;

        // Serve queued waiters from the idle set. Existing waiters are
        // still served while draining; only admission is closed.
        while !st.waiters.is_empty() && st.mode != Mode::Cleared {
            let Some(rid) = st.available.pop_front() else {
                break;
            };
            let Some(resource) = st.records.get_mut(&rid).and_then(|rec| rec.slot.take()) else {
                // Stale id in the idle queue; drop it and move on.
                #[cfg(feature = "tracing")]
                tracing::debug!(factory = self.factory.id(), record = rid, "skipping stale idle record");
                continue;
            };
            if self.config.test_on_borrow {
                if let Some(rec) = st.records.get_mut(&rid) {
                    rec.state = RecordState::Validating;
                }
                return Op::Validate {
                    record: rid,
                    resource,
                };
            }
            if let Some(resource) = self.offer_to_waiters(st, rid, resource) {
                // Every queued borrower had given up; put it back.
                if let Some(rec) = st.records.get_mut(&rid) {
                    rec.slot = Some(resource);
                    rec.state = RecordState::Idle;
                    st.available.push_front(rid);
                }
            }
        }

        // Waiters left over and room to grow: request a creation. The
        // earmark is the first waiter not already covered by one.
        if st.mode != Mode::Cleared {
            let covered = st.available.len() + st.creating;
            let spare = self
                .config
                .max
                .saturating_sub(st.records.len() + st.creating);
            if st.waiters.len() > covered && spare > 0 {
                let earmark = st.waiters.peek_nth_key(st.creating);
                st.creating += 1;
                return Op::Create { earmark };
            }
        }

        // Opportunistic replenishment up to `min`.
        if st.mode == Mode::Running && st.records.len() + st.creating < self.config.min {
            st.creating += 1;
            return Op::Create { earmark: None };
        }

        self.check_quiesced(st);
        Op::Idle
    }

    /// Hand `resource` (belonging to `rid`, whose slot is empty) to the
    /// first waiter still listening. Returns the resource back when no
    /// waiter accepted it; the caller decides where it goes.
    fn offer_to_waiters(
        &self,
        st: &mut PoolState<F::Resource>,
        rid: RecordId,
        mut resource: F::Resource,
    ) -> Option<F::Resource> {
        while st.mode != Mode::Cleared {
            // The record must still be there to complete an allocation.
            if !st.records.contains_key(&rid) {
                break;
            }
            let Some((_, mut waiter)) = st.waiters.pop() else {
                break;
            };
            match waiter.deferred.resolve((rid, resource)) {
                None => {
                    if let Some(rec) = st.records.get_mut(&rid) {
                        rec.state = RecordState::Allocated;
                        rec.touch();
                        st.borrowed += 1;
                        st.counters.acquisitions += 1;
                    }
                    self.events.emit(PoolEvent::Acquired {
                        waited: waiter.enqueued_at.elapsed(),
                    });
                    return None;
                }
                // The borrower cancelled its acquire; try the next one.
                Some((_, reclaimed)) => resource = reclaimed,
            }
        }
        Some(resource)
    }

    /// Borrow-time validation of the record popped from the idle set.
    async fn run_validate(&self, rid: RecordId, resource: F::Resource) {
        if !self.factory.validate(&resource).await {
            {
                let mut st = self.state.lock();
                if let Some(rec) = st.records.get_mut(&rid) {
                    rec.state = RecordState::Invalid;
                }
            }
            self.retire(rid, resource, DestroyReason::FailedValidation)
                .await;
            return;
        }

        let mut carried = Some(resource);
        let doomed = {
            let mut guard = self.state.lock();
            let st = &mut *guard;
            match self.offer_to_waiters(st, rid, carried.take().expect("resource present")) {
                None => None,
                Some(resource) if st.mode == Mode::Cleared => {
                    if let Some(rec) = st.records.get_mut(&rid) {
                        rec.state = RecordState::Invalid;
                    }
                    carried = Some(resource);
                    Some(DestroyReason::Cleared)
                }
                Some(resource) => {
                    // Nobody is waiting anymore; restore its place in line.
                    let Some(rec) = st.records.get_mut(&rid) else {
                        // Record vanished mid-validation; nothing to restore.
                        return;
                    };
                    rec.slot = Some(resource);
                    rec.state = RecordState::Idle;
                    st.available.push_front(rid);
                    None
                }
            }
        };
        if let Some(reason) = doomed {
            self.retire(rid, carried.take().expect("resource present"), reason)
                .await;
        }
    }

    /// Factory creation, spawned off the pump so creations run concurrently.
    async fn run_create(&self, earmark: Option<u64>) {
        #[cfg(feature = "tracing")]
        tracing::debug!(factory = self.factory.id(), "creating resource");
        match self.factory.create().await {
            Ok(resource) => {
                let leftover = {
                    let mut guard = self.state.lock();
                    let st = &mut *guard;
                    st.creating -= 1;
                    st.counters.created += 1;
                    if st.mode == Mode::Cleared {
                        Some(resource)
                    } else {
                        let rid = st.next_record_id;
                        st.next_record_id += 1;
                        st.records.insert(rid, Record::new_idle(resource));
                        self.events.emit(PoolEvent::Created);
                        // A fresh resource goes to whichever waiter heads the
                        // queue now, not necessarily the one that asked.
                        if let Some(resource) =
                            st.records.get_mut(&rid).and_then(|rec| rec.slot.take())
                        {
                            if let Some(resource) = self.offer_to_waiters(st, rid, resource) {
                                if let Some(rec) = st.records.get_mut(&rid) {
                                    rec.slot = Some(resource);
                                    rec.state = RecordState::Idle;
                                    st.available.push_back(rid);
                                }
                            }
                        }
                        None
                    }
                };
                if let Some(resource) = leftover {
                    // The pool was cleared while this creation was in flight.
                    if let Err(_err) = self.factory.destroy(resource).await {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(factory = self.factory.id(), error = %_err, "resource destroy failed");
                    }
                    let mut st = self.state.lock();
                    st.counters.destroyed += 1;
                    self.events.emit(PoolEvent::Destroyed {
                        reason: DestroyReason::Cleared,
                    });
                }
                self.spawn_pump();
            }
            Err(err) => {
                let (rejected, retry) = {
                    let mut guard = self.state.lock();
                    let st = &mut *guard;
                    st.creating -= 1;
                    let rejected = earmark.and_then(|key| st.waiters.remove(key));
                    // A waiter-driven failure re-pumps so the remaining
                    // queue keeps making progress; min replenishment does
                    // not, or a dead factory would spin.
                    let retry = earmark.is_some() && !st.waiters.is_empty();
                    self.check_quiesced(st);
                    (rejected, retry)
                };
                match rejected {
                    Some(mut waiter) => {
                        waiter.deferred.reject(Error::create_failed(err));
                    }
                    None => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(factory = self.factory.id(), error = %err, "resource creation failed");
                        let _ = err;
                    }
                }
                if retry {
                    self.spawn_pump();
                }
            }
        }
    }

    /// Destroy a condemned record's resource and remove the record.
    ///
    /// The record must already be marked `Invalid` and unlinked from the
    /// idle set; destroy failures are logged and swallowed because keeping
    /// a doomed record would wedge the pool's bounds.
    pub(crate) async fn retire(&self, rid: RecordId, resource: F::Resource, reason: DestroyReason) {
        if let Err(_err) = self.factory.destroy(resource).await {
            #[cfg(feature = "tracing")]
            tracing::warn!(factory = self.factory.id(), error = %_err, "resource destroy failed");
        }
        {
            let mut guard = self.state.lock();
            let st = &mut *guard;
            st.records.remove(&rid);
            st.counters.destroyed += 1;
            self.events.emit(PoolEvent::Destroyed { reason });
            self.check_quiesced(st);
        }
        self.spawn_pump();
    }

    /// Return a loaned resource to the pool. Unknown records and records
    /// not currently on loan are silent no-ops.
    pub(crate) fn release_parts(&self, rid: RecordId, resource: F::Resource, acquired_at: Instant) {
        enum After<T> {
            Done,
            Validate(T),
            Retire(T, DestroyReason),
        }

        let after = {
            let mut guard = self.state.lock();
            let st = &mut *guard;
            let Some(rec) = st.records.get_mut(&rid) else {
                return;
            };
            if rec.state != RecordState::Allocated {
                return;
            }
            st.borrowed -= 1;
            st.counters.releases += 1;
            self.events.emit(PoolEvent::Released {
                held: acquired_at.elapsed(),
            });
            let after = if st.mode == Mode::Cleared {
                rec.state = RecordState::Invalid;
                After::Retire(resource, DestroyReason::Cleared)
            } else if self.config.test_on_return {
                rec.state = RecordState::Validating;
                After::Validate(resource)
            } else {
                rec.slot = Some(resource);
                rec.state = RecordState::Idle;
                rec.touch();
                match self.config.strategy {
                    Strategy::Fifo => st.available.push_back(rid),
                    Strategy::Lifo => st.available.push_front(rid),
                }
                After::Done
            };
            self.check_quiesced(st);
            after
        };

        match after {
            After::Done => self.spawn_pump(),
            After::Validate(resource) => {
                if let Some(shared) = self.self_ref.upgrade() {
                    tokio::spawn(async move { shared.finish_return(rid, resource).await });
                }
            }
            After::Retire(resource, reason) => {
                if let Some(shared) = self.self_ref.upgrade() {
                    tokio::spawn(async move { shared.retire(rid, resource, reason).await });
                }
            }
        }
    }

    /// Return-time validation, off the releasing caller's path.
    async fn finish_return(&self, rid: RecordId, resource: F::Resource) {
        let healthy = self.factory.validate(&resource).await;
        let mut carried = Some(resource);
        let doomed = {
            let mut guard = self.state.lock();
            let st = &mut *guard;
            let Some(rec) = st.records.get_mut(&rid) else {
                return;
            };
            if !healthy {
                rec.state = RecordState::Invalid;
                Some(DestroyReason::FailedValidation)
            } else if st.mode == Mode::Cleared {
                rec.state = RecordState::Invalid;
                Some(DestroyReason::Cleared)
            } else {
                rec.slot = carried.take();
                rec.state = RecordState::Idle;
                rec.touch();
                match self.config.strategy {
                    Strategy::Fifo => st.available.push_back(rid),
                    Strategy::Lifo => st.available.push_front(rid),
                }
                None
            }
        };
        match doomed {
            Some(reason) => {
                self.retire(rid, carried.take().expect("resource present"), reason)
                    .await;
            }
            None => self.spawn_pump(),
        }
    }

    /// Forget a record whose resource was detached by the borrower.
    pub(crate) fn detach_record(&self, rid: RecordId) {
        {
            let mut guard = self.state.lock();
            let st = &mut *guard;
            match st.records.get(&rid) {
                Some(rec) if rec.state == RecordState::Allocated => {}
                _ => return,
            }
            st.records.remove(&rid);
            st.borrowed -= 1;
            st.counters.destroyed += 1;
            self.events.emit(PoolEvent::Destroyed {
                reason: DestroyReason::Detached,
            });
            self.check_quiesced(st);
        }
        self.spawn_pump();
    }

    /// Resolve drain waiters once the pool has quiesced.
    fn check_quiesced(&self, st: &mut PoolState<F::Resource>) {
        if st.mode == Mode::Draining
            && st.borrowed == 0
            && st.waiters.is_empty()
            && !st.drain_waiters.is_empty()
        {
            for mut deferred in st.drain_waiters.drain(..) {
                deferred.resolve(());
            }
            self.events.emit(PoolEvent::Drained);
        }
    }
}

// ---------------------------------------------------------------------------
// Pool<F>
// ---------------------------------------------------------------------------

/// Generic asynchronous resource pool.
///
/// Rations a bounded population of factory-built resources among concurrent
/// borrowers: idle resources are reused, demand beyond the idle set triggers
/// creations up to `max`, and everything else queues in priority order.
/// Cloning is cheap and clones share state.
pub struct Pool<F: Factory> {
    shared: Arc<Shared<F>>,
}

impl<F: Factory> Clone for Pool<F> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<F: Factory> std::fmt::Debug for Pool<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("factory", &self.shared.factory.id())
            .field("status", &self.status())
            .finish()
    }
}

impl<F: Factory> Pool<F> {
    /// Create a new pool around `factory`.
    ///
    /// Must be called within a tokio runtime: pre-warming and the eviction
    /// sweep run as background tasks (immediately when `autostart` is set,
    /// on the first acquire otherwise).
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if `config` is invalid.
    pub fn new(factory: F, config: PoolConfig) -> Result<Self> {
        config.validate()?;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            factory = factory.id(),
            min = config.min,
            max = config.max,
            "created resource pool"
        );
        let shared = Arc::new_cyclic(|self_ref| Shared {
            state: Mutex::new(PoolState {
                records: HashMap::new(),
                available: VecDeque::with_capacity(config.max),
                waiters: PriorityQueue::new(config.priority_range),
                creating: 0,
                mode: Mode::Running,
                borrowed: 0,
                started: false,
                next_record_id: 0,
                next_waiter_key: 0,
                drain_waiters: Vec::new(),
                counters: Stats::default(),
            }),
            factory,
            config,
            events: EventBus::default(),
            shutdown: CancellationToken::new(),
            self_ref: self_ref.clone(),
        });
        if shared.config.autostart {
            shared.start();
        }
        Ok(Self { shared })
    }

    /// Acquire a resource at the highest priority.
    pub async fn acquire(&self) -> Result<Loan<F>> {
        self.acquire_at(0).await
    }

    /// Acquire a resource at the given priority class (0 is the highest;
    /// out-of-range values are clamped).
    ///
    /// Resolves as soon as a resource is dispatched to this caller. With an
    /// `acquire_timeout` configured, gives up with
    /// [`Error::AcquireTimeout`] once the deadline passes.
    ///
    /// # Errors
    /// [`Error::Shutdown`] after `drain`, [`Error::AcquireTimeout`] on
    /// deadline, [`Error::CreateFailed`] when the creation earmarked for
    /// this caller fails.
    pub async fn acquire_at(&self, priority: usize) -> Result<Loan<F>> {
        let shared = &self.shared;
        shared.start();

        let (key, outcome) = {
            let mut guard = shared.state.lock();
            let st = &mut *guard;
            if st.mode != Mode::Running {
                return Err(Error::Shutdown);
            }
            // Fast path: an idle resource, an empty queue, and no borrow
            // test means the caller can leave with it immediately. A stale
            // id is discarded and the caller queues like anyone else.
            if st.waiters.is_empty() && !shared.config.test_on_borrow {
                if let Some(rid) = st.available.pop_front() {
                    if let Some(rec) = st.records.get_mut(&rid) {
                        if let Some(resource) = rec.slot.take() {
                            rec.state = RecordState::Allocated;
                            rec.touch();
                            st.borrowed += 1;
                            st.counters.acquisitions += 1;
                            shared.events.emit(PoolEvent::Acquired {
                                waited: Duration::ZERO,
                            });
                            return Ok(Loan::new(Arc::downgrade(shared), rid, resource));
                        }
                    }
                }
            }
            let key = st.next_waiter_key;
            st.next_waiter_key += 1;
            let (producer, outcome) = deferred();
            st.waiters.push(
                key,
                Waiter {
                    enqueued_at: Instant::now(),
                    deferred: producer,
                },
                priority,
            );
            (key, outcome)
        };
        shared.spawn_pump();

        let (rid, resource) = match shared.config.acquire_timeout {
            None => outcome.await?,
            Some(limit) => {
                let mut outcome = outcome;
                tokio::select! {
                    settled = &mut outcome => settled?,
                    () = tokio::time::sleep(limit) => {
                        let expired = {
                            let mut guard = shared.state.lock();
                            let st = &mut *guard;
                            let removed = st.waiters.remove(key);
                            if removed.is_some() {
                                st.counters.timeouts += 1;
                                shared.events.emit(PoolEvent::AcquireTimedOut { waited: limit });
                                shared.check_quiesced(st);
                            }
                            removed.is_some()
                        };
                        if expired {
                            return Err(Error::AcquireTimeout { waited: limit });
                        }
                        // Dispatched in the same instant the timer fired;
                        // the settled outcome wins.
                        outcome.await?
                    }
                }
            }
        };
        Ok(Loan::new(Arc::downgrade(shared), rid, resource))
    }

    /// Return a loaned resource to the pool.
    ///
    /// Equivalent to dropping the loan; provided for call sites that want
    /// the return to read as an action. Returning a resource that the pool
    /// no longer knows is a silent no-op.
    pub fn release(&self, loan: Loan<F>) {
        drop(loan);
    }

    /// Force-retire a loaned resource the borrower observed to be broken.
    ///
    /// The resource is destroyed via the factory and its slot freed, which
    /// may dispatch or create for queued waiters.
    pub async fn destroy(&self, loan: Loan<F>) {
        let (rid, resource) = loan.into_parts();
        let shared = &self.shared;
        let known = {
            let mut guard = shared.state.lock();
            let st = &mut *guard;
            match st.records.get_mut(&rid) {
                Some(rec) if rec.state == RecordState::Allocated => {
                    rec.state = RecordState::Invalid;
                    st.borrowed -= 1;
                    true
                }
                _ => false,
            }
        };
        if known {
            shared.retire(rid, resource, DestroyReason::Forced).await;
        } else if let Err(_err) = shared.factory.destroy(resource).await {
            #[cfg(feature = "tracing")]
            tracing::warn!(factory = shared.factory.id(), error = %_err, "resource destroy failed");
        }
    }

    /// Stop admitting borrowers and wait for the pool to quiesce.
    ///
    /// Existing waiters are not rejected: they are served as loans come
    /// back (or time out as configured). Resolves once no resources are on
    /// loan and no waiters are queued. Idempotent; returns immediately if
    /// the pool is already cleared.
    pub async fn drain(&self) {
        let (wait, newly_draining) = {
            let mut guard = self.shared.state.lock();
            let st = &mut *guard;
            match st.mode {
                Mode::Cleared => (None, false),
                Mode::Running | Mode::Draining => {
                    let was_running = st.mode == Mode::Running;
                    st.mode = Mode::Draining;
                    if st.borrowed == 0 && st.waiters.is_empty() {
                        if was_running {
                            self.shared.events.emit(PoolEvent::Drained);
                        }
                        (None, was_running)
                    } else {
                        let (producer, outcome) = deferred();
                        st.drain_waiters.push(producer);
                        (Some(outcome), was_running)
                    }
                }
            }
        };
        if newly_draining {
            #[cfg(feature = "tracing")]
            tracing::debug!(factory = self.shared.factory.id(), "pool draining");
        }
        if let Some(outcome) = wait {
            let _ = outcome.await;
        }
    }

    /// Destroy every idle resource and move the pool to its terminal state.
    ///
    /// Destructions run in parallel and are all awaited. Requires a
    /// preceding [`drain`](Pool::drain).
    ///
    /// # Errors
    /// [`Error::NotDrained`] if the pool is still running or resources are
    /// still on loan.
    pub async fn clear(&self) -> Result<()> {
        let shared = &self.shared;
        let (doomed, stragglers) = {
            let mut guard = shared.state.lock();
            let st = &mut *guard;
            if st.mode == Mode::Running || st.borrowed > 0 {
                return Err(Error::NotDrained {
                    borrowed: st.borrowed,
                });
            }
            if st.mode == Mode::Cleared && st.available.is_empty() && st.waiters.is_empty() {
                return Ok(());
            }
            st.mode = Mode::Cleared;
            let mut stragglers = Vec::new();
            while let Some((_, waiter)) = st.waiters.pop() {
                stragglers.push(waiter);
            }
            for mut deferred in st.drain_waiters.drain(..) {
                deferred.resolve(());
            }
            let mut doomed = Vec::new();
            while let Some(rid) = st.available.pop_front() {
                let Some(rec) = st.records.get_mut(&rid) else {
                    continue;
                };
                let Some(resource) = rec.slot.take() else {
                    continue;
                };
                rec.state = RecordState::Invalid;
                doomed.push((rid, resource));
            }
            (doomed, stragglers)
        };

        shared.shutdown.cancel();
        for mut waiter in stragglers {
            waiter.deferred.reject(Error::Shutdown);
        }

        let mut tasks = Vec::with_capacity(doomed.len());
        for (rid, resource) in doomed {
            let shared = Arc::clone(shared);
            tasks.push(tokio::spawn(async move {
                shared.retire(rid, resource, DestroyReason::Cleared).await;
            }));
        }
        for task in tasks {
            let _ = task.await;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(factory = shared.factory.id(), "pool cleared");
        shared.events.emit(PoolEvent::Cleared);
        Ok(())
    }

    /// Current occupancy, consistent at the instant of observation.
    #[must_use]
    pub fn status(&self) -> Status {
        let st = self.shared.state.lock();
        Status {
            size: st.records.len(),
            available: st.available.len(),
            borrowed: st.borrowed,
            pending: st.waiters.len(),
            spare_capacity: self
                .shared
                .config
                .max
                .saturating_sub(st.records.len() + st.creating),
            min: self.shared.config.min,
            max: self.shared.config.max,
        }
    }

    /// Cumulative lifecycle counters.
    #[must_use]
    pub fn stats(&self) -> Stats {
        self.shared.state.lock().counters
    }

    /// Subscribe to pool lifecycle events emitted after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.shared.events.subscribe()
    }
}
