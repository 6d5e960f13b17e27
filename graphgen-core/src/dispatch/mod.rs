//! The write dispatch pipeline.
//!
//! Producers hand [`WriteRequest`]s to a [`WriteDispatcher`], which queues
//! them in a bounded buffer drained by a fixed pool of worker threads. Each
//! worker pops a request, calls the matching backend write inside a metrics
//! measurement, and marks the request complete.
//!
//! - A full queue blocks producers instead of growing.
//! - The pending counter covers every request between `submit` and the end
//!   of its backend call, including ones still being pushed.
//! - A submission that fails is handed back and its pending count rolled
//!   back, so `pending` never drifts.
//! - Shutdown closes intake, lets the workers drain the queue and waits for
//!   them on a condition variable. It stops waiting only when no request has
//!   completed for a whole grace period.

mod queue;


use std::{
    sync::{
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use tracing::{debug, field, info, instrument, warn};

use self::queue::{BoundedQueue, Popped};
use crate::{
    Backend, Metrics, Operation, Status, WriteRequest,
    error::{ConfigurationError, DispatchError, GraphGenError, Rejected},
};

/// Queue slots provisioned per worker.
pub const QUEUE_SLOTS_PER_WORKER: usize = 16;

/// Sizing and timing of a [`WriteDispatcher`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchOptions {
    concurrency: usize,
    poll_interval: Duration,
    grace_period: Duration,
}

impl DispatchOptions {
    /// Default time a blocked worker or waiter sleeps before re-checking.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
    /// Default time shutdown tolerates without progress.
    pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);

    /// Options for `concurrency` workers with default timings.
    #[must_use]
    pub const fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            grace_period: Self::DEFAULT_GRACE_PERIOD,
        }
    }

    /// Sets how long workers and waiters sleep between re-checks.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets how long shutdown waits without progress before abandoning
    /// workers.
    #[must_use]
    pub const fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Number of worker threads.
    #[must_use]
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Queue capacity: [`QUEUE_SLOTS_PER_WORKER`] slots per worker.
    #[must_use]
    pub const fn queue_capacity(&self) -> usize {
        self.concurrency.saturating_mul(QUEUE_SLOTS_PER_WORKER)
    }
}

/// What happened during [`WriteDispatcher::shutdown`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Requests whose backend call finished over the dispatcher's lifetime.
    pub completed: u64,
    /// Requests still queued when shutdown gave up; they were never sent.
    pub undelivered: usize,
    /// Requests taken by abandoned workers but not yet finished when
    /// shutdown returned. Each abandoned worker holds at most one and may
    /// still deliver it.
    pub in_flight: usize,
    /// Workers still busy when the grace period ran out.
    pub abandoned_workers: Vec<usize>,
    /// Workers that panicked inside a backend call.
    pub panicked_workers: Vec<usize>,
    /// Time spent shutting down.
    pub elapsed: Duration,
}

impl ShutdownReport {
    /// Returns whether every worker exited normally and nothing was left
    /// behind.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.undelivered == 0
            && self.in_flight == 0
            && self.abandoned_workers.is_empty()
            && self.panicked_workers.is_empty()
    }
}

struct Shared {
    queue: BoundedQueue<WriteRequest>,
    backend: Arc<dyn Backend>,
    metrics: Arc<Metrics>,
    poll_interval: Duration,
    pending: AtomicUsize,
    active_workers: AtomicUsize,
    completed: AtomicU64,
    panicked: Mutex<Vec<usize>>,
    // Paired with `changed`; notified when `pending` reaches zero or a
    // worker exits.
    signal: Mutex<()>,
    changed: Condvar,
}

impl Shared {
    fn dispatch(&self, request: &WriteRequest) -> Status {
        let status = match request {
            WriteRequest::Vertex(write) => self
                .metrics
                .get(Operation::WriteVertex)
                .measure(|| self.backend.write_vertex(write)),
            WriteRequest::Edge(write) => self
                .metrics
                .get(Operation::WriteEdge)
                .measure(|| self.backend.write_edge(write)),
        };
        if status == Status::Error {
            debug!(%request, backend = self.backend.name(), "backend rejected write");
        }
        status
    }

    fn release_pending(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.notify();
        }
    }

    fn notify(&self) {
        let _signal = self.lock_signal();
        self.changed.notify_all();
    }

    fn lock_signal(&self) -> MutexGuard<'_, ()> {
        self.signal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_for_change<'a>(&self, guard: MutexGuard<'a, ()>, timeout: Duration) -> MutexGuard<'a, ()> {
        self.changed
            .wait_timeout(guard, timeout)
            .unwrap_or_else(PoisonError::into_inner)
            .0
    }
}

/// Marks one popped request complete, even if the backend call unwinds.
struct Completion<'a>(&'a Shared);

impl Drop for Completion<'_> {
    fn drop(&mut self) {
        self.0.completed.fetch_add(1, Ordering::Relaxed);
        self.0.release_pending();
    }
}

/// Accounts for a worker's exit, including exit by panic.
struct WorkerExit {
    shared: Arc<Shared>,
    worker: usize,
}

impl Drop for WorkerExit {
    fn drop(&mut self) {
        if thread::panicking() {
            self.shared
                .panicked
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(self.worker);
        }
        self.shared.active_workers.fetch_sub(1, Ordering::AcqRel);
        self.shared.notify();
    }
}

fn run_worker(exit: &WorkerExit) {
    let shared = &*exit.shared;
    loop {
        match shared.queue.pop(shared.poll_interval) {
            Popped::Item(request) => {
                let _completion = Completion(shared);
                shared.dispatch(&request);
            }
            Popped::Idle => {}
            Popped::Drained => break,
        }
    }
    debug!(worker = exit.worker, "write worker exiting");
}

/// A bounded-queue worker pool feeding one backend.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use graphgen_core::{
///     Backend, DispatchOptions, EdgeWrite, Metrics, Operation, QualifiedName, Status,
///     VertexRef, VertexWrite, WriteDispatcher, WriteRequest,
/// };
///
/// struct Discard;
/// impl Backend for Discard {
///     fn name(&self) -> &str { "discard" }
///     fn write_vertex(&self, _: &VertexWrite) -> Status { Status::Ok }
///     fn write_edge(&self, _: &EdgeWrite) -> Status { Status::Ok }
/// }
///
/// let metrics = Arc::new(Metrics::new());
/// let dispatcher =
///     WriteDispatcher::start(Arc::new(Discard), Arc::clone(&metrics), DispatchOptions::new(2))?;
/// for id in 0..10 {
///     let vertex = VertexRef { vertex_type: QualifiedName::parse("zoo.Monkey"), id };
///     dispatcher
///         .submit(WriteRequest::Vertex(VertexWrite { vertex, properties: Vec::new() }))
///         .map_err(|rejected| rejected.reason)?;
/// }
/// let report = dispatcher.shutdown();
/// assert!(report.is_clean());
/// assert_eq!(metrics.get(Operation::WriteVertex).count(), 10);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct WriteDispatcher {
    shared: Arc<Shared>,
    workers: Vec<(usize, JoinHandle<()>)>,
    grace_period: Duration,
}

impl WriteDispatcher {
    /// Spawns the worker pool.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::ZeroConcurrency`] when no workers were
    /// requested and [`DispatchError::SpawnFailed`] when a thread cannot be
    /// started; workers spawned before the failure are shut down first.
    #[instrument(
        name = "dispatch.start",
        err,
        skip_all,
        fields(
            backend = %backend.name(),
            concurrency = options.concurrency,
            capacity = options.queue_capacity(),
        ),
    )]
    pub fn start(
        backend: Arc<dyn Backend>,
        metrics: Arc<Metrics>,
        options: DispatchOptions,
    ) -> Result<Self, GraphGenError> {
        if options.concurrency == 0 {
            return Err(ConfigurationError::ZeroConcurrency.into());
        }
        let shared = Arc::new(Shared {
            queue: BoundedQueue::new(options.queue_capacity()),
            backend,
            metrics,
            poll_interval: options.poll_interval,
            pending: AtomicUsize::new(0),
            active_workers: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
            panicked: Mutex::new(Vec::new()),
            signal: Mutex::new(()),
            changed: Condvar::new(),
        });
        let mut dispatcher = Self {
            shared,
            workers: Vec::with_capacity(options.concurrency),
            grace_period: options.grace_period,
        };
        for worker in 0..options.concurrency {
            dispatcher
                .shared
                .active_workers
                .fetch_add(1, Ordering::AcqRel);
            let exit = WorkerExit {
                shared: Arc::clone(&dispatcher.shared),
                worker,
            };
            let spawned = thread::Builder::new()
                .name(format!("graphgen-writer-{worker}"))
                .spawn(move || run_worker(&exit));
            match spawned {
                Ok(handle) => dispatcher.workers.push((worker, handle)),
                Err(error) => {
                    // The closure, and with it the exit guard, was dropped.
                    let message = Arc::from(error.to_string());
                    let _report = dispatcher.close_and_join();
                    return Err(DispatchError::SpawnFailed { worker, message }.into());
                }
            }
        }
        info!("write pipeline started");
        Ok(dispatcher)
    }

    /// Enqueues `request`, blocking while the queue is full.
    ///
    /// # Errors
    /// Hands the request back with [`DispatchError::Closed`] when intake has
    /// stopped and with [`DispatchError::WorkersExited`] when no worker is
    /// left to make room.
    pub fn submit(&self, request: WriteRequest) -> Result<(), Rejected> {
        self.enqueue(request, None)
    }

    /// Like [`WriteDispatcher::submit`] but gives up after `timeout`.
    ///
    /// # Errors
    /// As [`WriteDispatcher::submit`], plus [`DispatchError::TimedOut`] when
    /// no queue space became available in time.
    pub fn submit_timeout(&self, request: WriteRequest, timeout: Duration) -> Result<(), Rejected> {
        self.enqueue(request, Some(Instant::now() + timeout))
    }

    fn enqueue(&self, request: WriteRequest, deadline: Option<Instant>) -> Result<(), Rejected> {
        let shared = &*self.shared;
        let started = Instant::now();
        shared.pending.fetch_add(1, Ordering::AcqRel);
        let mut request = request;
        loop {
            let slice = Instant::now() + shared.poll_interval;
            let slice_end = deadline.map_or(slice, |deadline| deadline.min(slice));
            let reason = match shared.queue.push(request, Some(slice_end)) {
                Ok(()) => return Ok(()),
                Err((returned, DispatchError::TimedOut { .. })) => {
                    request = returned;
                    if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                        DispatchError::TimedOut {
                            waited: started.elapsed(),
                        }
                    } else if shared.active_workers.load(Ordering::Acquire) == 0 {
                        DispatchError::WorkersExited {
                            pending: shared.pending.load(Ordering::Acquire),
                        }
                    } else {
                        continue;
                    }
                }
                Err((returned, reason)) => {
                    request = returned;
                    reason
                }
            };
            shared.release_pending();
            return Err(Rejected { request, reason });
        }
    }

    /// Stops accepting new requests.
    ///
    /// Queued requests are still dispatched. Blocked producers are woken
    /// and receive their request back.
    pub fn close(&self) {
        self.shared.queue.close();
    }

    /// Blocks until every submitted request has been dispatched.
    ///
    /// # Errors
    /// Returns [`DispatchError::WorkersExited`] when every worker has exited
    /// while requests remain.
    pub fn wait_idle(&self) -> Result<(), DispatchError> {
        let shared = &*self.shared;
        let mut guard = shared.lock_signal();
        loop {
            let pending = shared.pending.load(Ordering::Acquire);
            if pending == 0 {
                return Ok(());
            }
            if shared.active_workers.load(Ordering::Acquire) == 0 {
                return Err(DispatchError::WorkersExited { pending });
            }
            guard = shared.wait_for_change(guard, shared.poll_interval);
        }
    }

    /// Requests submitted but not yet fully dispatched.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::Acquire)
    }

    /// Requests waiting in the queue.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    /// Workers that have not exited.
    #[must_use]
    pub fn active_workers(&self) -> usize {
        self.shared.active_workers.load(Ordering::Acquire)
    }

    /// Maximum number of queued requests.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.queue.capacity()
    }

    /// Drains the queue, waits for the workers and releases them.
    ///
    /// Every request submitted before this call is dispatched exactly once
    /// unless a worker stalls: when no request completes for a whole grace
    /// period, shutdown stops waiting, discards what is still queued and
    /// reports the stuck workers. Nothing queued is sent after this returns;
    /// a request an abandoned worker already took is reported as in flight
    /// and may still reach the backend.
    #[must_use = "the report says whether every request was delivered"]
    pub fn shutdown(mut self) -> ShutdownReport {
        self.close_and_join()
    }

    #[instrument(
        name = "dispatch.shutdown",
        skip_all,
        fields(
            pending = self.pending(),
            workers = self.workers.len(),
            completed = field::Empty,
            clean = field::Empty,
        ),
    )]
    fn close_and_join(&mut self) -> ShutdownReport {
        let started = Instant::now();
        let shared = Arc::clone(&self.shared);
        shared.queue.close();

        let stalled = self.await_workers(&shared);
        let (undelivered, in_flight) = if stalled {
            let dropped = shared.queue.drain();
            for _ in &dropped {
                shared.release_pending();
            }
            // The queue is closed and empty, so pending now only counts
            // requests that workers took before the drain.
            (dropped.len(), shared.pending.load(Ordering::Acquire))
        } else {
            (0, 0)
        };

        let mut abandoned_workers = Vec::new();
        for (worker, handle) in self.workers.drain(..) {
            if stalled && !handle.is_finished() {
                abandoned_workers.push(worker);
                continue;
            }
            // Panics are recorded by the worker's exit guard.
            let _joined = handle.join();
        }
        let mut panicked_workers = shared
            .panicked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        panicked_workers.sort_unstable();

        let report = ShutdownReport {
            completed: shared.completed.load(Ordering::Acquire),
            undelivered,
            in_flight,
            abandoned_workers,
            panicked_workers,
            elapsed: started.elapsed(),
        };
        let span = tracing::Span::current();
        span.record("completed", report.completed);
        span.record("clean", report.is_clean());
        if report.is_clean() {
            info!("write pipeline drained");
        } else {
            warn!(
                undelivered = report.undelivered,
                in_flight = report.in_flight,
                abandoned = ?report.abandoned_workers,
                panicked = ?report.panicked_workers,
                "write pipeline shut down with problems",
            );
        }
        report
    }

    /// Waits for every worker to exit; returns `true` if it gave up.
    fn await_workers(&self, shared: &Shared) -> bool {
        let tick = shared.poll_interval.min(self.grace_period);
        let mut last_completed = shared.completed.load(Ordering::Acquire);
        let mut last_progress = Instant::now();
        let mut guard = shared.lock_signal();
        while shared.active_workers.load(Ordering::Acquire) > 0 {
            let completed = shared.completed.load(Ordering::Acquire);
            if completed != last_completed {
                last_completed = completed;
                last_progress = Instant::now();
            } else if last_progress.elapsed() >= self.grace_period {
                warn!(
                    active = shared.active_workers.load(Ordering::Acquire),
                    grace_ms = u64::try_from(self.grace_period.as_millis()).unwrap_or(u64::MAX),
                    "write workers made no progress within the grace period",
                );
                return true;
            }
            guard = shared.wait_for_change(guard, tick);
        }
        false
    }
}

impl Drop for WriteDispatcher {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            let _report = self.close_and_join();
        }
    }
}

impl std::fmt::Debug for WriteDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteDispatcher")
            .field("backend", &self.shared.backend.name())
            .field("workers", &self.workers.len())
            .field("capacity", &self.capacity())
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}
