//! Write requests produced by the generator and consumed by backends.

use std::fmt;

use crate::{PropertyValue, QualifiedName};

/// Property key/value pairs in key order.
pub type Properties = Vec<(QualifiedName, PropertyValue)>;

/// A vertex reference: its type plus its identifier within that type.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexRef {
    /// Vertex type label.
    pub vertex_type: QualifiedName,
    /// Identifier in `0..population`.
    pub id: u64,
}

impl fmt::Display for VertexRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.vertex_type, self.id)
    }
}

/// A request to create one vertex.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexWrite {
    /// The vertex being written.
    pub vertex: VertexRef,
    /// Generated properties.
    pub properties: Properties,
}

/// A request to create one directed edge.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeWrite {
    /// Relation type label.
    pub relation: QualifiedName,
    /// Tail vertex, from the relation's domain.
    pub out_vertex: VertexRef,
    /// Head vertex, from the relation's range.
    pub in_vertex: VertexRef,
    /// Generated properties.
    pub properties: Properties,
}

/// One unit of work for the write pipeline.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WriteRequest {
    /// Create a vertex.
    Vertex(VertexWrite),
    /// Create an edge.
    Edge(EdgeWrite),
}

impl WriteRequest {
    /// Returns whether this request writes a vertex.
    #[must_use]
    pub const fn is_vertex(&self) -> bool {
        matches!(self, Self::Vertex(_))
    }
}

impl From<VertexWrite> for WriteRequest {
    fn from(write: VertexWrite) -> Self {
        Self::Vertex(write)
    }
}

impl From<EdgeWrite> for WriteRequest {
    fn from(write: EdgeWrite) -> Self {
        Self::Edge(write)
    }
}

impl fmt::Display for WriteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex(write) => write!(f, "vertex {}", write.vertex),
            Self::Edge(write) => write!(
                f,
                "edge {} {} -> {}",
                write.relation, write.out_vertex, write.in_vertex
            ),
        }
    }
}
