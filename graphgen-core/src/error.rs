//! Error types for the graphgen core library.
//!
//! Configuration problems are detected before any generation starts,
//! backend lifecycle problems are reported by the backend contract, and
//! dispatch problems describe the producer/worker protocol. Each family
//! carries a stable machine-readable code.

use std::{fmt, sync::Arc, time::Duration};

use thiserror::Error;

use crate::request::WriteRequest;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// A model, plan or vocabulary was rejected before generation started.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigurationError {
    /// Partition weights must be positive.
    #[error("vertex type `{vertex_type}` has weight 0; weights must be positive")]
    ZeroWeight {
        /// Vertex type the weight was supplied for.
        vertex_type: Arc<str>,
    },
    /// A positive vertex budget cannot be split across no vertex types.
    #[error("cannot allocate {total} vertices: the partitioner has no weights")]
    EmptyPartitioner {
        /// Requested vertex budget.
        total: u64,
    },
    /// Existence probabilities must be finite and within `[0, 1]`.
    #[error("existence probability for `{vertex_type}` must be within [0, 1] (got {value})")]
    InvalidProbability {
        /// Vertex type of the offending incidence.
        vertex_type: Arc<str>,
        /// Value supplied by the caller.
        value: f64,
    },
    /// A degree distribution parameter was malformed.
    #[error("degree distribution parameter `{parameter}` is invalid (got {value})")]
    InvalidDistribution {
        /// Name of the rejected parameter.
        parameter: &'static str,
        /// Value supplied by the caller.
        value: f64,
    },
    /// A property generator was configured with unusable parameters.
    #[error("property `{property}` is invalid: {reason}")]
    InvalidPropertyGenerator {
        /// Property key.
        property: Arc<str>,
        /// Human-readable reason.
        reason: &'static str,
    },
    /// A name did not resolve to an entity type in the vocabulary.
    #[error("`{name}` is not an entity type of vocabulary `{vocabulary}`")]
    UnresolvedEntityType {
        /// Name that failed to resolve.
        name: Arc<str>,
        /// Vocabulary searched.
        vocabulary: Arc<str>,
    },
    /// A name did not resolve to a relation type in the vocabulary.
    #[error("`{name}` is not a relation type of vocabulary `{vocabulary}`")]
    UnresolvedRelationType {
        /// Name that failed to resolve.
        name: Arc<str>,
        /// Vocabulary searched.
        vocabulary: Arc<str>,
    },
    /// An unqualified name matched several definitions.
    #[error("`{name}` is ambiguous; qualify it with a namespace")]
    AmbiguousName {
        /// The ambiguous unqualified name.
        name: Arc<str>,
    },
    /// An edge model endpoint does not fit the relation's declared endpoint.
    #[error("relation `{relation}` expects {side} of type `{expected}` but the model uses `{actual}`")]
    IncompatibleEndpoint {
        /// Relation whose endpoint mismatched.
        relation: Arc<str>,
        /// Either `"domain"` or `"range"`.
        side: &'static str,
        /// Type declared by the vocabulary.
        expected: Arc<str>,
        /// Type used by the edge model.
        actual: Arc<str>,
    },
    /// Two vocabulary definitions share a name.
    #[error("`{name}` is defined more than once")]
    DuplicateDefinition {
        /// The repeated name.
        name: Arc<str>,
    },
    /// Entity inheritance loops back on itself.
    #[error("entity type `{name}` inherits from itself")]
    InheritanceCycle {
        /// An entity on the cycle.
        name: Arc<str>,
    },
    /// At least one write worker is required.
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
    /// At least one partition is required.
    #[error("partition count must be at least 1")]
    ZeroPartitions,
    /// A partition index was not below the partition count.
    #[error("partition {partition} is out of range for {partition_count} partitions")]
    PartitionOutOfRange {
        /// Requested partition.
        partition: usize,
        /// Configured partition count.
        partition_count: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`ConfigurationError`] variants.
    enum ConfigurationErrorCode for ConfigurationError {
        /// Partition weights must be positive.
        ZeroWeight => ZeroWeight { .. } => "CONFIG_ZERO_WEIGHT",
        /// A positive vertex budget cannot be split across no vertex types.
        EmptyPartitioner => EmptyPartitioner { .. } => "CONFIG_EMPTY_PARTITIONER",
        /// Existence probabilities must be finite and within `[0, 1]`.
        InvalidProbability => InvalidProbability { .. } => "CONFIG_INVALID_PROBABILITY",
        /// A degree distribution parameter was malformed.
        InvalidDistribution => InvalidDistribution { .. } => "CONFIG_INVALID_DISTRIBUTION",
        /// A property generator was configured with unusable parameters.
        InvalidPropertyGenerator => InvalidPropertyGenerator { .. } => "CONFIG_INVALID_PROPERTY",
        /// A name did not resolve to an entity type.
        UnresolvedEntityType => UnresolvedEntityType { .. } => "CONFIG_UNRESOLVED_ENTITY_TYPE",
        /// A name did not resolve to a relation type.
        UnresolvedRelationType => UnresolvedRelationType { .. } => "CONFIG_UNRESOLVED_RELATION_TYPE",
        /// An unqualified name matched several definitions.
        AmbiguousName => AmbiguousName { .. } => "CONFIG_AMBIGUOUS_NAME",
        /// An edge model endpoint does not fit the relation.
        IncompatibleEndpoint => IncompatibleEndpoint { .. } => "CONFIG_INCOMPATIBLE_ENDPOINT",
        /// Two vocabulary definitions share a name.
        DuplicateDefinition => DuplicateDefinition { .. } => "CONFIG_DUPLICATE_DEFINITION",
        /// Entity inheritance loops back on itself.
        InheritanceCycle => InheritanceCycle { .. } => "CONFIG_INHERITANCE_CYCLE",
        /// At least one write worker is required.
        ZeroConcurrency => ZeroConcurrency => "CONFIG_ZERO_CONCURRENCY",
        /// At least one partition is required.
        ZeroPartitions => ZeroPartitions => "CONFIG_ZERO_PARTITIONS",
        /// A partition index was out of range.
        PartitionOutOfRange => PartitionOutOfRange { .. } => "CONFIG_PARTITION_OUT_OF_RANGE",
    }
}

/// A backend could not be created, configured, started or stopped.
///
/// Individual write failures are not errors; they are reported through
/// [`crate::Status::Error`] and counted by [`crate::Metrics`].
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum BackendError {
    /// No backend is registered under the requested name.
    #[error("unknown backend `{name}`; known backends: {known}")]
    Unknown {
        /// Requested backend name.
        name: Arc<str>,
        /// Comma-separated registered names.
        known: Arc<str>,
    },
    /// A lifecycle or configuration call failed.
    #[error("backend `{backend}` failed during {operation}: {message}")]
    Lifecycle {
        /// Backend that failed.
        backend: Arc<str>,
        /// Lifecycle operation, such as `init` or `cleanup`.
        operation: &'static str,
        /// Backend-provided detail.
        message: Arc<str>,
    },
}

define_error_codes! {
    /// Stable codes describing [`BackendError`] variants.
    enum BackendErrorCode for BackendError {
        /// No backend is registered under the requested name.
        Unknown => Unknown { .. } => "BACKEND_UNKNOWN",
        /// A lifecycle or configuration call failed.
        Lifecycle => Lifecycle { .. } => "BACKEND_LIFECYCLE",
    }
}

/// The write dispatch pipeline could not accept or process work.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum DispatchError {
    /// The pipeline no longer accepts submissions.
    #[error("the write pipeline is closed")]
    Closed,
    /// A bounded submission gave up waiting for queue space.
    #[error("no queue space became available within {waited:?}")]
    TimedOut {
        /// How long the producer waited.
        waited: Duration,
    },
    /// The operating system refused to start a worker thread.
    #[error("failed to spawn write worker {worker}: {message}")]
    SpawnFailed {
        /// Index of the worker that failed to start.
        worker: usize,
        /// Error reported by the operating system.
        message: Arc<str>,
    },
    /// A worker thread panicked while dispatching.
    #[error("write worker {worker} panicked")]
    WorkerPanicked {
        /// Index of the worker that panicked.
        worker: usize,
    },
    /// Shutdown gave up on workers that made no progress.
    #[error("{workers} write workers stalled; {undelivered} queued requests were not sent")]
    Stalled {
        /// Workers abandoned by shutdown.
        workers: usize,
        /// Requests discarded from the queue.
        undelivered: usize,
    },
    /// Every worker exited while requests were still outstanding.
    #[error("all write workers exited with {pending} requests outstanding")]
    WorkersExited {
        /// Requests submitted but not dispatched.
        pending: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`DispatchError`] variants.
    enum DispatchErrorCode for DispatchError {
        /// The pipeline no longer accepts submissions.
        Closed => Closed => "DISPATCH_CLOSED",
        /// A bounded submission gave up waiting for queue space.
        TimedOut => TimedOut { .. } => "DISPATCH_TIMED_OUT",
        /// A worker thread could not be started.
        SpawnFailed => SpawnFailed { .. } => "DISPATCH_SPAWN_FAILED",
        /// A worker thread panicked.
        WorkerPanicked => WorkerPanicked { .. } => "DISPATCH_WORKER_PANICKED",
        /// Shutdown gave up on stalled workers.
        Stalled => Stalled { .. } => "DISPATCH_STALLED",
        /// Every worker exited with requests outstanding.
        WorkersExited => WorkersExited { .. } => "DISPATCH_WORKERS_EXITED",
    }
}

/// A submission that the pipeline did not take ownership of.
///
/// The request travels back to the caller so nothing is silently dropped,
/// and the pipeline's pending counter has already been rolled back.
#[derive(Debug, Error)]
#[error("write request rejected: {reason}")]
pub struct Rejected {
    /// The request that was not enqueued.
    pub request: WriteRequest,
    /// Why the request was not enqueued.
    #[source]
    pub reason: DispatchError,
}

/// Error type produced when generating a graph.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GraphGenError {
    /// The model or plan was rejected.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// The backend failed a lifecycle call.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// The write pipeline failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// A single partition failed in partitioned mode.
    #[error("partition {partition} failed: {error}")]
    PartitionFailed {
        /// Index of the failed partition.
        partition: usize,
        /// Underlying failure.
        #[source]
        error: Box<GraphGenError>,
    },
}

/// Stable codes describing [`GraphGenError`] variants.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum GraphGenErrorCode {
    /// See [`ConfigurationError`].
    Configuration(ConfigurationErrorCode),
    /// See [`BackendError`].
    Backend(BackendErrorCode),
    /// See [`DispatchError`].
    Dispatch(DispatchErrorCode),
    /// A partition failed.
    PartitionFailed,
}

impl GraphGenErrorCode {
    /// Return the stable machine-readable representation of this error code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration(code) => code.as_str(),
            Self::Backend(code) => code.as_str(),
            Self::Dispatch(code) => code.as_str(),
            Self::PartitionFailed => "GRAPHGEN_PARTITION_FAILED",
        }
    }
}

impl fmt::Display for GraphGenErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl GraphGenError {
    /// Retrieve the stable [`GraphGenErrorCode`] for this error.
    #[must_use]
    pub const fn code(&self) -> GraphGenErrorCode {
        match self {
            Self::Configuration(error) => GraphGenErrorCode::Configuration(error.code()),
            Self::Backend(error) => GraphGenErrorCode::Backend(error.code()),
            Self::Dispatch(error) => GraphGenErrorCode::Dispatch(error.code()),
            Self::PartitionFailed { .. } => GraphGenErrorCode::PartitionFailed,
        }
    }

    /// Index of the failed partition, when the error came from partitioned mode.
    #[must_use]
    pub const fn partition(&self) -> Option<usize> {
        match self {
            Self::PartitionFailed { partition, .. } => Some(*partition),
            _ => None,
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, GraphGenError>;
