//! A backend that reports each write as a `tracing` event.

use std::sync::Arc;

use graphgen_core::{
    Backend, BackendError, EdgeWrite, Status, VertexWrite, Vocabulary, WorkloadProperties,
};
use tracing::{Level, debug, info, trace};

/// Selects the level of the emitted events: `trace`, `debug` or `info`.
pub const LEVEL_KEY: &str = "log.level";

/// Emits every write as a structured event and accepts it.
#[derive(Clone, Debug)]
pub struct LogBackend {
    level: Level,
    vocabulary: Option<Arc<str>>,
}

impl Default for LogBackend {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            vocabulary: None,
        }
    }
}

impl LogBackend {
    /// Registry name.
    pub const NAME: &'static str = "log";

    /// Level events are emitted at.
    #[must_use]
    pub const fn level(&self) -> Level {
        self.level
    }

    fn vocabulary(&self) -> &str {
        self.vocabulary.as_deref().unwrap_or("")
    }
}

macro_rules! emit {
    ($level:expr, $($fields:tt)+) => {
        if $level == Level::TRACE {
            trace!($($fields)+);
        } else if $level == Level::DEBUG {
            debug!($($fields)+);
        } else {
            info!($($fields)+);
        }
    };
}

impl Backend for LogBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn set_properties(&mut self, properties: &WorkloadProperties) -> Result<(), BackendError> {
        let Some(raw) = properties.get(LEVEL_KEY) else {
            return Ok(());
        };
        self.level = match raw.trim().to_ascii_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            _ => {
                return Err(BackendError::Lifecycle {
                    backend: Arc::from(Self::NAME),
                    operation: "set_properties",
                    message: Arc::from(format!("`{LEVEL_KEY}` must be trace, debug or info, not `{raw}`")),
                });
            }
        };
        Ok(())
    }

    fn set_vocabulary(&mut self, vocabulary: Arc<Vocabulary>) {
        self.vocabulary = Some(Arc::from(vocabulary.name()));
    }

    fn init(&self) -> Result<(), BackendError> {
        info!(vocabulary = self.vocabulary(), level = %self.level, "log backend ready");
        Ok(())
    }

    fn cleanup(&self) -> Result<(), BackendError> {
        info!(vocabulary = self.vocabulary(), "log backend finished");
        Ok(())
    }

    fn write_vertex(&self, write: &VertexWrite) -> Status {
        emit!(
            self.level,
            vertex = %write.vertex,
            properties = write.properties.len(),
            "write vertex"
        );
        Status::Ok
    }

    fn write_edge(&self, write: &EdgeWrite) -> Status {
        emit!(
            self.level,
            relation = %write.relation,
            from = %write.out_vertex,
            to = %write.in_vertex,
            properties = write.properties.len(),
            "write edge"
        );
        Status::Ok
    }
}
