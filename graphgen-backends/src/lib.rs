//! Reference backends for the graphgen write pipeline.

mod logging;
mod memory;
mod noop;

pub use logging::LogBackend;
pub use memory::{MemoryBackend, MemoryGraph};
pub use noop::NoopBackend;

use graphgen_core::BackendRegistry;

/// Name of the backend used when none is selected.
pub const DEFAULT_BACKEND: &str = NoopBackend::NAME;

/// A registry holding every backend in this crate.
///
/// # Examples
/// ```
/// let registry = graphgen_backends::default_registry();
/// let names: Vec<_> = registry.names().collect();
/// assert_eq!(names, ["log", "memory", "noop"]);
/// ```
#[must_use]
pub fn default_registry() -> BackendRegistry {
    BackendRegistry::new()
        .with(NoopBackend::NAME, || Box::new(NoopBackend))
        .with(MemoryBackend::NAME, || Box::new(MemoryBackend::default()))
        .with(LogBackend::NAME, || Box::new(LogBackend::default()))
}
