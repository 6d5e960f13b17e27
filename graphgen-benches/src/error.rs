//! Benchmark setup error type.
//!
//! Setup functions propagate failures with `?` instead of using `.expect()`.

use graphgen_core::{ConfigurationError, GraphGenError};

/// Errors that may occur during benchmark setup.
#[derive(Debug, thiserror::Error)]
pub enum BenchSetupError {
    /// The synthetic model or plan was rejected.
    #[error("benchmark model is invalid: {0}")]
    Configuration(#[from] ConfigurationError),
    /// Generation or the write pipeline failed.
    #[error("generation failed: {0}")]
    Generation(#[from] GraphGenError),
    /// The write pipeline did not drain during a warm-up run.
    #[error("write pipeline left {undelivered} requests undelivered")]
    UncleanShutdown {
        /// Requests still queued at shutdown.
        undelivered: usize,
    },
    /// A zero value was passed where a non-zero integer was required.
    #[error("expected a non-zero value for {context}")]
    ZeroValue {
        /// A description of the parameter that was unexpectedly zero.
        context: &'static str,
    },
}
