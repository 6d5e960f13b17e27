//! An in-memory backend that records every write.

use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use graphgen_core::{
    Backend, BackendError, EdgeWrite, Metrics, Operation, Properties, QualifiedName, Status,
    Subgraph, SubgraphQuery, VertexRef, VertexWrite, WorkloadProperties,
};
use tracing::debug;

/// Rejects edges whose endpoints were not written first.
pub const STRICT_KEY: &str = "memory.strict";
/// Caps the number of stored writes; later writes fail.
pub const CAPACITY_KEY: &str = "memory.capacity";

/// Everything a [`MemoryBackend`] has stored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryGraph {
    /// Vertices with their properties.
    pub vertices: BTreeMap<VertexRef, Properties>,
    /// Edges in arrival order.
    pub edges: Vec<EdgeWrite>,
}

impl MemoryGraph {
    fn writes(&self) -> usize {
        self.vertices.len() + self.edges.len()
    }
}

/// Stores the generated graph in memory.
///
/// Supports [`Backend::subgraph`] by breadth-first traversal of the stored
/// edges.
///
/// # Examples
/// ```
/// use graphgen_backends::MemoryBackend;
/// use graphgen_core::{Backend, QualifiedName, Status, VertexRef, VertexWrite};
///
/// let backend = MemoryBackend::default();
/// let vertex = VertexRef { vertex_type: QualifiedName::parse("zoo.Monkey"), id: 0 };
/// let write = VertexWrite { vertex, properties: Vec::new() };
/// assert_eq!(backend.write_vertex(&write), Status::Ok);
/// assert_eq!(backend.snapshot().vertices.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryBackend {
    graph: Mutex<MemoryGraph>,
    strict: bool,
    capacity: Option<usize>,
    metrics: Option<Arc<Metrics>>,
}

impl MemoryBackend {
    /// Registry name.
    pub const NAME: &'static str = "memory";

    /// A copy of everything stored so far.
    #[must_use]
    pub fn snapshot(&self) -> MemoryGraph {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryGraph> {
        self.graph.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn has_room(&self, graph: &MemoryGraph) -> bool {
        self.capacity.is_none_or(|capacity| graph.writes() < capacity)
    }

    fn traverse(&self, query: &SubgraphQuery, out: &mut Subgraph) -> Status {
        let graph = self.lock();
        if !graph.vertices.contains_key(&query.root) {
            return Status::Error;
        }
        let mut seen = BTreeSet::from([query.root.clone()]);
        let mut frontier = VecDeque::from([(query.root.clone(), 0_u32)]);
        out.vertices.push(query.root.clone());
        while let Some((vertex, hops)) = frontier.pop_front() {
            if hops >= query.depth {
                continue;
            }
            let outgoing = graph.edges.iter().filter(|edge| {
                edge.out_vertex == vertex
                    && query
                        .relation
                        .as_ref()
                        .is_none_or(|relation| &edge.relation == relation)
            });
            for edge in outgoing {
                out.edges.push((
                    edge.out_vertex.clone(),
                    edge.relation.clone(),
                    edge.in_vertex.clone(),
                ));
                if seen.insert(edge.in_vertex.clone()) {
                    out.vertices.push(edge.in_vertex.clone());
                    frontier.push_back((edge.in_vertex.clone(), hops + 1));
                }
            }
        }
        Status::Ok
    }
}

fn parse_setting<T: std::str::FromStr>(
    properties: &WorkloadProperties,
    key: &'static str,
) -> Result<Option<T>, BackendError> {
    properties
        .get(key)
        .map(|raw| {
            raw.trim().parse().map_err(|_| BackendError::Lifecycle {
                backend: Arc::from(MemoryBackend::NAME),
                operation: "set_properties",
                message: Arc::from(format!("`{key}` has unusable value `{raw}`")),
            })
        })
        .transpose()
}

impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn set_properties(&mut self, properties: &WorkloadProperties) -> Result<(), BackendError> {
        self.strict = parse_setting(properties, STRICT_KEY)?.unwrap_or(false);
        self.capacity = parse_setting(properties, CAPACITY_KEY)?;
        Ok(())
    }

    fn set_metrics(&mut self, metrics: Arc<Metrics>) {
        self.metrics = Some(metrics);
    }

    fn init(&self) -> Result<(), BackendError> {
        *self.lock() = MemoryGraph::default();
        debug!(strict = self.strict, capacity = ?self.capacity, "memory backend ready");
        Ok(())
    }

    fn write_vertex(&self, write: &VertexWrite) -> Status {
        let mut graph = self.lock();
        if !self.has_room(&graph) {
            return Status::Error;
        }
        graph
            .vertices
            .insert(write.vertex.clone(), write.properties.clone());
        Status::Ok
    }

    fn write_edge(&self, write: &EdgeWrite) -> Status {
        let mut graph = self.lock();
        let dangling = self.strict
            && !(graph.vertices.contains_key(&write.out_vertex)
                && graph.vertices.contains_key(&write.in_vertex));
        if dangling || !self.has_room(&graph) {
            return Status::Error;
        }
        graph.edges.push(write.clone());
        Status::Ok
    }

    fn subgraph(&self, query: &SubgraphQuery, out: &mut Subgraph) -> Status {
        out.clear();
        match &self.metrics {
            Some(metrics) => metrics
                .get(Operation::Subgraph)
                .measure(|| self.traverse(query, out)),
            None => self.traverse(query, out),
        }
    }
}

impl MemoryBackend {
    /// Number of stored edges of `relation`.
    #[must_use]
    pub fn edge_count(&self, relation: &QualifiedName) -> usize {
        self.lock()
            .edges
            .iter()
            .filter(|edge| &edge.relation == relation)
            .count()
    }
}
