//! Graphgen core library.
//!
//! Builds synthetic property graphs from a declarative [`GraphModel`] and
//! streams the resulting vertex and edge writes to a pluggable [`Backend`]
//! through a bounded, multi-worker [`WriteDispatcher`].
#![cfg_attr(docsrs, feature(doc_cfg))]

mod backend;
mod canonical;
mod dispatch;
mod distribution;
mod error;
mod generator;
mod metrics;
mod model;
mod name;
mod partitioner;
mod property;
mod request;
mod vocabulary;

#[cfg(test)]
mod test_utils;

pub use crate::{
    backend::{
        Backend, BackendFactory, BackendRegistry, Status, Subgraph, SubgraphQuery,
        WorkloadProperties, with_lifecycle,
    },
    canonical::ContentHash,
    dispatch::{DispatchOptions, QUEUE_SLOTS_PER_WORKER, ShutdownReport, WriteDispatcher},
    distribution::{DegreeDistribution, LogNormal},
    error::{
        BackendError, BackendErrorCode, ConfigurationError, ConfigurationErrorCode,
        DispatchError, DispatchErrorCode, GraphGenError, GraphGenErrorCode, Rejected, Result,
    },
    generator::{
        DEFAULT_SEED, DistributedReport, GenerationPlan, GraphGenerator, PartitionExecutor,
        RayonExecutor, SequentialExecutor,
    },
    metrics::{Measurement, MeasurementSnapshot, Metrics, MetricsSnapshot, Operation},
    model::{EdgeModel, GraphModel, GraphModelBuilder, Incidence},
    name::QualifiedName,
    partitioner::Partitioner,
    property::{PropertyGenerator, PropertyModel, PropertyValue},
    request::{EdgeWrite, Properties, VertexRef, VertexWrite, WriteRequest},
    vocabulary::{EntityType, RelationType, Vocabulary, VocabularyBuilder},
};
