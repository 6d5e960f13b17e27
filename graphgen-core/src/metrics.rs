//! Per-operation counters and latency totals for backend calls.
//!
//! A [`Metrics`] value is shared by every pipeline worker; all counters are
//! atomics so measuring never takes a lock. With the `metrics` feature
//! enabled each measurement is mirrored into the `metrics` facade as
//! `graphgen_<op>_total`, `graphgen_<op>_errors_total` and
//! `graphgen_<op>_latency_seconds`.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use crate::Status;

/// The measured backend operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    /// [`crate::Backend::write_vertex`].
    WriteVertex,
    /// [`crate::Backend::write_edge`].
    WriteEdge,
    /// [`crate::Backend::subgraph`].
    Subgraph,
}

impl Operation {
    /// Every operation in report order.
    pub const ALL: [Self; 3] = [Self::WriteVertex, Self::WriteEdge, Self::Subgraph];

    /// Stable snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WriteVertex => "write_vertex",
            Self::WriteEdge => "write_edge",
            Self::Subgraph => "subgraph",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for one operation.
#[derive(Debug)]
pub struct Measurement {
    operation: Operation,
    count: AtomicU64,
    ok: AtomicU64,
    errors: AtomicU64,
    not_implemented: AtomicU64,
    total_nanos: AtomicU64,
    min_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

impl Measurement {
    fn new(operation: Operation) -> Self {
        Self {
            operation,
            count: AtomicU64::new(0),
            ok: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            not_implemented: AtomicU64::new(0),
            total_nanos: AtomicU64::new(0),
            min_nanos: AtomicU64::new(u64::MAX),
            max_nanos: AtomicU64::new(0),
        }
    }

    /// Times `work` and records its outcome.
    ///
    /// # Examples
    /// ```
    /// use graphgen_core::{Metrics, Operation, Status};
    ///
    /// let metrics = Metrics::new();
    /// let status = metrics.get(Operation::WriteVertex).measure(|| Status::Ok);
    /// assert_eq!(status, Status::Ok);
    /// assert_eq!(metrics.get(Operation::WriteVertex).count(), 1);
    /// ```
    pub fn measure(&self, work: impl FnOnce() -> Status) -> Status {
        let started = Instant::now();
        let status = work();
        self.record(status, started.elapsed());
        status
    }

    /// Records an outcome measured elsewhere.
    pub fn record(&self, status: Status, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.outcome_counter(status).fetch_add(1, Ordering::Relaxed);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.min_nanos.fetch_min(nanos, Ordering::Relaxed);
        self.max_nanos.fetch_max(nanos, Ordering::Relaxed);
        self.mirror(status, elapsed);
    }

    const fn outcome_counter(&self, status: Status) -> &AtomicU64 {
        match status {
            Status::Ok => &self.ok,
            Status::Error => &self.errors,
            Status::NotImplemented => &self.not_implemented,
        }
    }

    /// Adds `other`'s counts into `self`.
    pub fn merge(&self, other: &Self) {
        for (mine, theirs) in [
            (&self.count, &other.count),
            (&self.ok, &other.ok),
            (&self.errors, &other.errors),
            (&self.not_implemented, &other.not_implemented),
            (&self.total_nanos, &other.total_nanos),
        ] {
            mine.fetch_add(theirs.load(Ordering::Relaxed), Ordering::Relaxed);
        }
        self.min_nanos
            .fetch_min(other.min_nanos.load(Ordering::Relaxed), Ordering::Relaxed);
        self.max_nanos
            .fetch_max(other.max_nanos.load(Ordering::Relaxed), Ordering::Relaxed);
    }

    /// Calls recorded so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Copies the counters into a plain value.
    ///
    /// `elapsed` is the wall time the calls were spread over and is used
    /// for throughput.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        clippy::float_arithmetic,
        reason = "Throughput is reported as a floating-point rate."
    )]
    pub fn snapshot(&self, elapsed: Duration) -> MeasurementSnapshot {
        let count = self.count();
        let total = Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed));
        let min_nanos = self.min_nanos.load(Ordering::Relaxed);
        let seconds = elapsed.as_secs_f64();
        MeasurementSnapshot {
            operation: self.operation,
            count,
            ok: self.ok.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            not_implemented: self.not_implemented.load(Ordering::Relaxed),
            total_latency: total,
            min_latency: (count > 0).then(|| Duration::from_nanos(min_nanos)),
            max_latency: (count > 0)
                .then(|| Duration::from_nanos(self.max_nanos.load(Ordering::Relaxed))),
            mean_latency: u32::try_from(count)
                .ok()
                .filter(|&n| n > 0)
                .map(|n| total / n),
            throughput: (seconds > 0.0).then(|| count as f64 / seconds),
        }
    }

    #[cfg(feature = "metrics")]
    fn mirror(&self, status: Status, elapsed: Duration) {
        let (total, errors, latency) = facade_names(self.operation);
        metrics::counter!(total).increment(1);
        if status == Status::Error {
            metrics::counter!(errors).increment(1);
        }
        metrics::histogram!(latency).record(elapsed.as_secs_f64());
    }

    #[cfg(not(feature = "metrics"))]
    fn mirror(&self, _status: Status, _elapsed: Duration) {}
}

#[cfg(feature = "metrics")]
const fn facade_names(operation: Operation) -> (&'static str, &'static str, &'static str) {
    match operation {
        Operation::WriteVertex => (
            "graphgen_write_vertex_total",
            "graphgen_write_vertex_errors_total",
            "graphgen_write_vertex_latency_seconds",
        ),
        Operation::WriteEdge => (
            "graphgen_write_edge_total",
            "graphgen_write_edge_errors_total",
            "graphgen_write_edge_latency_seconds",
        ),
        Operation::Subgraph => (
            "graphgen_subgraph_total",
            "graphgen_subgraph_errors_total",
            "graphgen_subgraph_latency_seconds",
        ),
    }
}

/// Point-in-time copy of a [`Measurement`].
#[derive(Clone, Debug, PartialEq)]
pub struct MeasurementSnapshot {
    /// Operation measured.
    pub operation: Operation,
    /// Calls made.
    pub count: u64,
    /// Calls returning [`Status::Ok`].
    pub ok: u64,
    /// Calls returning [`Status::Error`].
    pub errors: u64,
    /// Calls returning [`Status::NotImplemented`].
    pub not_implemented: u64,
    /// Sum of call latencies.
    pub total_latency: Duration,
    /// Fastest call, if any.
    pub min_latency: Option<Duration>,
    /// Slowest call, if any.
    pub max_latency: Option<Duration>,
    /// Mean call latency, if any.
    pub mean_latency: Option<Duration>,
    /// Calls per second of wall time, if the wall time was non-zero.
    pub throughput: Option<f64>,
}

/// Measurements for every backend operation.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use graphgen_core::{Metrics, Operation, Status};
///
/// let left = Metrics::new();
/// let right = Metrics::new();
/// left.get(Operation::WriteEdge).record(Status::Ok, Duration::from_millis(2));
/// right.get(Operation::WriteEdge).record(Status::Error, Duration::from_millis(4));
/// left.merge(&right);
///
/// let snapshot = left.snapshot(Duration::from_secs(1));
/// let edges = snapshot.get(Operation::WriteEdge);
/// assert_eq!((edges.count, edges.ok, edges.errors), (2, 1, 1));
/// assert_eq!(edges.mean_latency, Some(Duration::from_millis(3)));
/// ```
#[derive(Debug)]
pub struct Metrics {
    write_vertex: Measurement,
    write_edge: Measurement,
    subgraph: Measurement,
}

impl Metrics {
    /// Creates zeroed measurements.
    #[must_use]
    pub fn new() -> Self {
        Self {
            write_vertex: Measurement::new(Operation::WriteVertex),
            write_edge: Measurement::new(Operation::WriteEdge),
            subgraph: Measurement::new(Operation::Subgraph),
        }
    }

    /// Returns the measurement for `operation`.
    #[must_use]
    pub const fn get(&self, operation: Operation) -> &Measurement {
        match operation {
            Operation::WriteVertex => &self.write_vertex,
            Operation::WriteEdge => &self.write_edge,
            Operation::Subgraph => &self.subgraph,
        }
    }

    /// Adds every measurement of `other` into `self`.
    pub fn merge(&self, other: &Self) {
        for operation in Operation::ALL {
            self.get(operation).merge(other.get(operation));
        }
    }

    /// Total calls across all operations.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        Operation::ALL.iter().map(|&op| self.get(op).count()).sum()
    }

    /// Copies every measurement; see [`Measurement::snapshot`].
    #[must_use]
    pub fn snapshot(&self, elapsed: Duration) -> MetricsSnapshot {
        MetricsSnapshot {
            elapsed,
            measurements: Operation::ALL.map(|op| self.get(op).snapshot(elapsed)),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`Metrics`].
#[derive(Clone, Debug, PartialEq)]
pub struct MetricsSnapshot {
    /// Wall time the measurements were spread over.
    pub elapsed: Duration,
    /// One snapshot per operation, in [`Operation::ALL`] order.
    pub measurements: [MeasurementSnapshot; 3],
}

impl MetricsSnapshot {
    /// Returns the snapshot for `operation`.
    #[must_use]
    pub fn get(&self, operation: Operation) -> &MeasurementSnapshot {
        let index = match operation {
            Operation::WriteVertex => 0,
            Operation::WriteEdge => 1,
            Operation::Subgraph => 2,
        };
        &self.measurements[index]
    }
}
