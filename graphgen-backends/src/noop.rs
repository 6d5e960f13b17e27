use graphgen_core::{Backend, EdgeWrite, Status, VertexWrite};

/// Accepts every write and keeps nothing.
///
/// Measures the cost of generation and dispatch alone.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopBackend;

impl NoopBackend {
    /// Registry name.
    pub const NAME: &'static str = "noop";
}

impl Backend for NoopBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn write_vertex(&self, _write: &VertexWrite) -> Status {
        Status::Ok
    }

    fn write_edge(&self, _write: &EdgeWrite) -> Status {
        Status::Ok
    }
}
