//! The generation engine.
//!
//! [`GraphGenerator`] turns a [`GraphModel`] and a seed into write requests
//! and streams them through a [`WriteDispatcher`]. All vertices are written
//! before any edge. Randomness is drawn from per-identifier streams, so the
//! same seed yields the same multiset of requests for every concurrency and
//! partition count.

mod emit;
mod partition;
mod stream;


use std::{collections::BTreeMap, sync::Arc, time::Duration};

use rayon::{ThreadPoolBuilder, prelude::*};
use tracing::{info, instrument, warn};

pub use self::partition::{PartitionExecutor, RayonExecutor, SequentialExecutor};
use self::emit::PartitionScope;
use crate::{
    Backend, DispatchOptions, GraphModel, Metrics, QualifiedName, ShutdownReport,
    WriteDispatcher, WriteRequest,
    backend::with_lifecycle,
    error::{BackendError, ConfigurationError, DispatchError, GraphGenError, Result},
};

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 12_345;

/// Size and shape of one generation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationPlan {
    total_vertices: u64,
    concurrency: usize,
    partition_count: usize,
}

impl GenerationPlan {
    /// Validates a plan.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::ZeroConcurrency`] or
    /// [`ConfigurationError::ZeroPartitions`] when either count is zero.
    pub const fn new(
        total_vertices: u64,
        concurrency: usize,
        partition_count: usize,
    ) -> core::result::Result<Self, ConfigurationError> {
        if concurrency == 0 {
            return Err(ConfigurationError::ZeroConcurrency);
        }
        if partition_count == 0 {
            return Err(ConfigurationError::ZeroPartitions);
        }
        Ok(Self {
            total_vertices,
            concurrency,
            partition_count,
        })
    }

    /// Vertices to generate across all types.
    #[must_use]
    pub const fn total_vertices(&self) -> u64 {
        self.total_vertices
    }

    /// Write workers, and producer threads in in-process mode.
    #[must_use]
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Number of independent partitions.
    #[must_use]
    pub const fn partition_count(&self) -> usize {
        self.partition_count
    }

    const fn check_partition(&self, partition: usize) -> core::result::Result<(), ConfigurationError> {
        if partition >= self.partition_count {
            return Err(ConfigurationError::PartitionOutOfRange {
                partition,
                partition_count: self.partition_count,
            });
        }
        Ok(())
    }
}

/// Outcome of [`GraphGenerator::generate_distributed`].
#[derive(Debug)]
pub struct DistributedReport {
    /// Merged measurements of every partition that succeeded.
    pub metrics: Metrics,
    /// Partitions that succeeded.
    pub succeeded: Vec<usize>,
    /// One [`GraphGenError::PartitionFailed`] per failed partition.
    pub failures: Vec<GraphGenError>,
}

impl DistributedReport {
    /// Returns whether every partition succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Generates a graph from a model.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use graphgen_core::{
///     DegreeDistribution, EdgeModel, EntityType, GenerationPlan, GraphGenerator, GraphModel,
///     Incidence, RelationType, VocabularyBuilder, WriteRequest,
/// };
///
/// let vocabulary = Arc::new(
///     VocabularyBuilder::new("zoo")
///         .entity(EntityType::new("Monkey"))
///         .entity(EntityType::new("Weasel"))
///         .relation(RelationType::new("chased", "Monkey", "Weasel"))
///         .build()?,
/// );
/// let model = GraphModel::builder(vocabulary)
///     .weight("Monkey", 1)
///     .weight("Weasel", 1)
///     .edge(
///         "chased",
///         EdgeModel::new(
///             Incidence::new("Monkey", 1.0, DegreeDistribution::Constant(2))?,
///             Incidence::new("Weasel", 0.0, DegreeDistribution::Constant(0))?,
///         ),
///     )
///     .build()?;
///
/// let generator = GraphGenerator::new(Arc::new(model)).with_seed(7);
/// let plan = GenerationPlan::new(10, 1, 1)?;
/// let requests = generator.requests_for_partition(&plan, 0)?;
/// let edges = requests.iter().filter(|r| !r.is_vertex()).count();
/// assert_eq!(requests.len() - edges, 10);
/// assert_eq!(edges, 5 * 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug)]
pub struct GraphGenerator {
    model: Arc<GraphModel>,
    seed: u64,
    poll_interval: Duration,
    grace_period: Duration,
}

impl GraphGenerator {
    /// Creates a generator with [`DEFAULT_SEED`].
    #[must_use]
    pub const fn new(model: Arc<GraphModel>) -> Self {
        Self {
            model,
            seed: DEFAULT_SEED,
            poll_interval: DispatchOptions::DEFAULT_POLL_INTERVAL,
            grace_period: DispatchOptions::DEFAULT_GRACE_PERIOD,
        }
    }

    /// Sets the run seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the dispatcher poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets the dispatcher shutdown grace period.
    #[must_use]
    pub const fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// The model being generated.
    #[must_use]
    pub const fn model(&self) -> &Arc<GraphModel> {
        &self.model
    }

    /// The run seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Vertices per type for `plan`.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::EmptyPartitioner`] when vertices are
    /// requested from a model without weights.
    pub fn populations(&self, plan: &GenerationPlan) -> Result<BTreeMap<QualifiedName, u64>> {
        Ok(self.model.partitioner().partition_sizes(plan.total_vertices)?)
    }

    fn scope<'a>(
        &'a self,
        plan: &GenerationPlan,
        populations: &'a BTreeMap<QualifiedName, u64>,
        partition: usize,
    ) -> PartitionScope<'a> {
        PartitionScope {
            model: &self.model,
            seed: self.seed,
            populations,
            partition,
            partition_count: plan.partition_count,
        }
    }

    fn dispatch_options(&self, plan: &GenerationPlan) -> DispatchOptions {
        DispatchOptions::new(plan.concurrency)
            .with_poll_interval(self.poll_interval)
            .with_grace_period(self.grace_period)
    }

    /// Lists a partition's requests without writing them: its vertices
    /// first, then its edges.
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] when the partition is out of range
    /// or the model cannot be sized.
    pub fn requests_for_partition(
        &self,
        plan: &GenerationPlan,
        partition: usize,
    ) -> Result<Vec<WriteRequest>> {
        plan.check_partition(partition)?;
        let populations = self.populations(plan)?;
        let scope = self.scope(plan, &populations, partition);
        let mut requests = Vec::new();
        let mut collect = |request| {
            requests.push(request);
            Ok::<(), std::convert::Infallible>(())
        };
        let Ok(_) = scope.emit_vertices(&mut collect);
        let Ok(_) = scope.emit_edges(&mut collect);
        Ok(requests)
    }

    /// Generates the whole graph in this process.
    ///
    /// Partitions are produced in parallel on a rayon pool of
    /// `plan.concurrency()` threads, all feeding one dispatcher with the
    /// same number of workers. Returns once the pipeline has drained.
    ///
    /// # Errors
    /// Returns configuration errors before any write, and dispatch errors
    /// when the pipeline fails or shuts down uncleanly.
    #[instrument(
        name = "generate.run",
        err,
        skip(self, backend),
        fields(
            seed = self.seed,
            total_vertices = plan.total_vertices,
            concurrency = plan.concurrency,
            partitions = plan.partition_count,
            model = %self.model.hash(),
        ),
    )]
    pub fn generate(&self, backend: Arc<dyn Backend>, plan: &GenerationPlan) -> Result<Arc<Metrics>> {
        let populations = self.populations(plan)?;
        let producers = ThreadPoolBuilder::new()
            .num_threads(plan.concurrency)
            .thread_name(|index| format!("graphgen-producer-{index}"))
            .build()
            .map_err(|error| DispatchError::SpawnFailed {
                worker: 0,
                message: Arc::from(error.to_string()),
            })?;
        let metrics = Arc::new(Metrics::new());
        let dispatcher = WriteDispatcher::start(backend, Arc::clone(&metrics), self.dispatch_options(plan))?;

        let submit = |request| dispatcher.submit(request).map_err(|rejected| rejected.reason);
        let produced = producers.install(|| {
            let vertices = (0..plan.partition_count)
                .into_par_iter()
                .map(|partition| {
                    self.scope(plan, &populations, partition)
                        .emit_vertices(&mut &submit)
                })
                .try_reduce(|| 0, |a, b| Ok(a + b))?;
            dispatcher.wait_idle()?;
            let edges = (0..plan.partition_count)
                .into_par_iter()
                .map(|partition| {
                    self.scope(plan, &populations, partition)
                        .emit_edges(&mut &submit)
                })
                .try_reduce(|| 0, |a, b| Ok(a + b))?;
            Ok::<_, DispatchError>((vertices, edges))
        });

        let report = dispatcher.shutdown();
        check_shutdown(&report)?;
        let (vertices, edges) = produced?;
        info!(vertices, edges, "generation complete");
        Ok(metrics)
    }

    /// Generates one partition with its own dispatcher.
    ///
    /// This is the unit of work a distributed substrate runs; partitions
    /// share nothing and can run in separate processes.
    ///
    /// # Errors
    /// As [`GraphGenerator::generate`], plus
    /// [`ConfigurationError::PartitionOutOfRange`].
    #[instrument(
        name = "generate.partition",
        err,
        skip(self, backend, plan),
        fields(seed = self.seed, partitions = plan.partition_count),
    )]
    pub fn generate_partition(
        &self,
        backend: Arc<dyn Backend>,
        plan: &GenerationPlan,
        partition: usize,
    ) -> Result<Arc<Metrics>> {
        plan.check_partition(partition)?;
        let populations = self.populations(plan)?;
        let scope = self.scope(plan, &populations, partition);
        let metrics = Arc::new(Metrics::new());
        let dispatcher = WriteDispatcher::start(backend, Arc::clone(&metrics), self.dispatch_options(plan))?;

        let mut submit = |request| dispatcher.submit(request).map_err(|rejected| rejected.reason);
        let produced = scope.emit_vertices(&mut submit).and_then(|vertices| {
            dispatcher.wait_idle()?;
            scope.emit_edges(&mut submit).map(|edges| (vertices, edges))
        });

        let report = dispatcher.shutdown();
        check_shutdown(&report)?;
        let (vertices, edges) = produced?;
        info!(vertices, edges, "partition complete");
        Ok(metrics)
    }

    /// Runs every partition through `executor` and merges the results.
    ///
    /// `backend_for` supplies a configured backend per partition; each one
    /// is initialised before and cleaned up after its partition. A failing
    /// partition is reported in [`DistributedReport::failures`] and does not
    /// stop the others.
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] only when the model cannot be sized
    /// at all; per-partition problems are reported instead.
    pub fn generate_distributed<X, F>(
        &self,
        executor: &X,
        plan: &GenerationPlan,
        backend_for: F,
    ) -> Result<DistributedReport>
    where
        X: PartitionExecutor,
        F: Fn(usize) -> core::result::Result<Arc<dyn Backend>, BackendError> + Send + Sync,
    {
        self.populations(plan)?;
        let outcomes = executor.execute(plan.partition_count, |partition| {
            let backend = backend_for(partition)?;
            with_lifecycle(backend.as_ref(), || {
                self.generate_partition(Arc::clone(&backend), plan, partition)
            })
        });

        let mut report = DistributedReport {
            metrics: Metrics::new(),
            succeeded: Vec::new(),
            failures: Vec::new(),
        };
        for (partition, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(metrics) => {
                    report.metrics.merge(&metrics);
                    report.succeeded.push(partition);
                }
                Err(error) => {
                    warn!(partition, code = %error.code(), %error, "partition failed");
                    report.failures.push(GraphGenError::PartitionFailed {
                        partition,
                        error: Box::new(error),
                    });
                }
            }
        }
        Ok(report)
    }
}

fn check_shutdown(report: &ShutdownReport) -> core::result::Result<(), DispatchError> {
    if let Some(&worker) = report.panicked_workers.first() {
        return Err(DispatchError::WorkerPanicked { worker });
    }
    if !report.abandoned_workers.is_empty() || report.undelivered > 0 {
        return Err(DispatchError::Stalled {
            workers: report.abandoned_workers.len(),
            undelivered: report.undelivered,
        });
    }
    Ok(())
}
