//! The storage backend contract and the name-to-constructor registry.

use std::{
    collections::BTreeMap,
    fmt,
    sync::Arc,
};

use crate::{
    EdgeWrite, Metrics, QualifiedName, VertexWrite, Vocabulary, error::BackendError,
    request::VertexRef,
};

/// Outcome of a single backend call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    /// The call succeeded.
    Ok,
    /// The call failed; the backend is responsible for any detail.
    Error,
    /// The backend does not support the call.
    NotImplemented,
}

impl Status {
    /// Returns whether the call succeeded.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::NotImplemented => "not_implemented",
        })
    }
}

/// Ordered string settings handed to a backend before it starts.
///
/// # Examples
/// ```
/// use graphgen_core::WorkloadProperties;
///
/// let mut properties = WorkloadProperties::new();
/// properties.insert("write.seed", "7");
/// properties.overlay([("write.seed", "9"), ("host", "db")]);
/// assert_eq!(properties.get("write.seed"), Some("9"));
/// assert_eq!(properties.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkloadProperties {
    entries: BTreeMap<String, String>,
}

impl WorkloadProperties {
    /// Creates an empty property set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Returns the value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Sets every pair, replacing existing values.
    pub fn overlay<K, V>(&mut self, pairs: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in pairs {
            self.insert(key, value);
        }
    }

    /// Iterates pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no key is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A bounded neighbourhood read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubgraphQuery {
    /// Vertex the traversal starts from.
    pub root: VertexRef,
    /// Only follow edges of this relation, when set.
    pub relation: Option<QualifiedName>,
    /// Maximum number of hops from `root`.
    pub depth: u32,
}

/// Output buffer filled by [`Backend::subgraph`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Subgraph {
    /// Vertices reached, including the root.
    pub vertices: Vec<VertexRef>,
    /// Edges traversed, as `(out, relation, in)`.
    pub edges: Vec<(VertexRef, QualifiedName, VertexRef)>,
}

impl Subgraph {
    /// Empties the buffer for reuse.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.edges.clear();
    }
}

/// A storage system under benchmark.
///
/// Configuration calls happen on one thread before [`Backend::init`]. After
/// that the write calls are made concurrently from every pipeline worker, so
/// implementations must tolerate parallel `write_*` calls and edges that
/// arrive before their endpoint vertices.
///
/// # Examples
/// ```
/// use graphgen_core::{Backend, EdgeWrite, Status, VertexWrite};
///
/// struct Discard;
///
/// impl Backend for Discard {
///     fn name(&self) -> &str { "discard" }
///     fn write_vertex(&self, _: &VertexWrite) -> Status { Status::Ok }
///     fn write_edge(&self, _: &EdgeWrite) -> Status { Status::Ok }
/// }
///
/// let backend = Discard;
/// assert!(backend.init().is_ok());
/// ```
pub trait Backend: Send + Sync {
    /// Identifier used in logs and reports.
    fn name(&self) -> &str;

    /// Receives the workload settings.
    ///
    /// # Errors
    /// Returns [`BackendError::Lifecycle`] when a required setting is
    /// missing or malformed.
    fn set_properties(&mut self, _properties: &WorkloadProperties) -> Result<(), BackendError> {
        Ok(())
    }

    /// Receives the vocabulary the generated labels belong to.
    fn set_vocabulary(&mut self, _vocabulary: Arc<Vocabulary>) {}

    /// Receives the metrics sink that measures this backend's calls.
    fn set_metrics(&mut self, _metrics: Arc<Metrics>) {}

    /// Prepares the backend for writes.
    ///
    /// # Errors
    /// Returns [`BackendError::Lifecycle`] when the backend cannot start.
    fn init(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Releases resources after the last write.
    ///
    /// # Errors
    /// Returns [`BackendError::Lifecycle`] when teardown fails.
    fn cleanup(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Writes one vertex.
    fn write_vertex(&self, write: &VertexWrite) -> Status;

    /// Writes one edge.
    fn write_edge(&self, write: &EdgeWrite) -> Status;

    /// Reads the neighbourhood described by `query` into `out`.
    fn subgraph(&self, _query: &SubgraphQuery, _out: &mut Subgraph) -> Status {
        Status::NotImplemented
    }
}

/// Runs `body` between [`Backend::init`] and [`Backend::cleanup`].
///
/// Cleanup runs whenever init succeeded. An error from `body` takes
/// precedence over a cleanup error.
///
/// # Errors
/// Returns the first of: the init error, the body's error, the cleanup
/// error.
pub fn with_lifecycle<T>(
    backend: &dyn Backend,
    body: impl FnOnce() -> crate::Result<T>,
) -> crate::Result<T> {
    backend.init()?;
    let outcome = body();
    let cleaned = backend.cleanup();
    let value = outcome?;
    cleaned?;
    Ok(value)
}

/// Constructs a fresh backend.
pub type BackendFactory = fn() -> Box<dyn Backend>;

/// Maps backend identifiers to constructors.
///
/// # Examples
/// ```
/// use graphgen_core::{Backend, BackendRegistry, EdgeWrite, Status, VertexWrite};
///
/// struct Discard;
/// impl Backend for Discard {
///     fn name(&self) -> &str { "discard" }
///     fn write_vertex(&self, _: &VertexWrite) -> Status { Status::Ok }
///     fn write_edge(&self, _: &EdgeWrite) -> Status { Status::Ok }
/// }
///
/// let registry = BackendRegistry::new().with("discard", || Box::new(Discard));
/// assert_eq!(registry.create("discard")?.name(), "discard");
/// assert!(registry.create("missing").is_err());
/// # Ok::<(), graphgen_core::BackendError>(())
/// ```
#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: BTreeMap<&'static str, BackendFactory>,
}

impl BackendRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: &'static str, factory: BackendFactory) {
        self.factories.insert(name, factory);
    }

    /// Builder form of [`BackendRegistry::register`].
    #[must_use]
    pub fn with(mut self, name: &'static str, factory: BackendFactory) -> Self {
        self.register(name, factory);
        self
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    /// Constructs the backend registered as `name`.
    ///
    /// # Errors
    /// Returns [`BackendError::Unknown`] listing the registered names when
    /// `name` is not registered.
    pub fn create(&self, name: &str) -> Result<Box<dyn Backend>, BackendError> {
        let factory = self.factories.get(name).ok_or_else(|| BackendError::Unknown {
            name: Arc::from(name),
            known: Arc::from(self.names().collect::<Vec<_>>().join(", ")),
        })?;
        Ok(factory())
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingBackend;

    fn recording() -> Box<dyn Backend> {
        Box::new(RecordingBackend::default())
    }

    #[test]
    fn unknown_names_list_the_registered_backends() {
        let registry = BackendRegistry::new()
            .with("recording", recording)
            .with("also", recording);
        let err = registry.create("nope").err().expect("name is unknown");
        assert_eq!(
            err,
            BackendError::Unknown {
                name: Arc::from("nope"),
                known: Arc::from("also, recording"),
            }
        );
        assert_eq!(err.code().as_str(), "BACKEND_UNKNOWN");
    }

    #[test]
    fn subgraph_defaults_to_not_implemented() {
        let backend = recording();
        let query = SubgraphQuery {
            root: VertexRef {
                vertex_type: QualifiedName::parse("t.A"),
                id: 0,
            },
            relation: None,
            depth: 1,
        };
        let mut out = Subgraph::default();
        assert_eq!(backend.subgraph(&query, &mut out), Status::NotImplemented);
        assert!(out.vertices.is_empty());
    }

    #[test]
    fn lifecycle_cleans_up_after_a_failing_body() {
        let backend = RecordingBackend::default();
        let err = with_lifecycle(&backend, || {
            Err::<(), _>(crate::error::ConfigurationError::ZeroPartitions.into())
        })
        .expect_err("body fails");
        assert_eq!(err.code().as_str(), "CONFIG_ZERO_PARTITIONS");
        assert_eq!(backend.lifecycle(), ["init", "cleanup"]);
    }

    #[test]
    fn overlay_replaces_existing_keys() {
        let mut properties = WorkloadProperties::new();
        properties.insert("a", "1");
        properties.overlay([("a", "2"), ("b", "3")]);
        let pairs: Vec<_> = properties.iter().collect();
        assert_eq!(pairs, [("a", "2"), ("b", "3")]);
    }
}
