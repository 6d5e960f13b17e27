//! Structured logging for the graphgen CLI.
//!
//! One global `tracing` registry receives library spans (`generate.run`,
//! `dispatch.shutdown`, ...) and bridged `log` records. Output goes to
//! `stderr` in the format chosen by [`LOG_FORMAT_ENV`]; `RUST_LOG` filters
//! it and defaults to [`DEFAULT_FILTER`].

use std::{env, str::FromStr, sync::OnceLock};

use thiserror::Error;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, Layer, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Environment variable selecting `human` or `json` log output.
pub const LOG_FORMAT_ENV: &str = "GRAPHGEN_LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

static INSTALLED: OnceLock<Installation> = OnceLock::new();

/// Rendering of log records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Human,
    /// One JSON object per record, with the span list attached.
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            other => Err(LoggingError::UnsupportedFormat {
                provided: other.to_owned(),
            }),
        }
    }
}

impl LogFormat {
    /// Reads [`LOG_FORMAT_ENV`], defaulting to [`LogFormat::Human`].
    ///
    /// # Errors
    /// Returns [`LoggingError`] when the variable is not Unicode or names an
    /// unknown format.
    pub fn from_env() -> Result<Self, LoggingError> {
        match env::var(LOG_FORMAT_ENV) {
            Ok(raw) => raw.parse(),
            Err(env::VarError::NotPresent) => Ok(Self::default()),
            Err(source @ env::VarError::NotUnicode(_)) => Err(LoggingError::InvalidUnicode {
                name: LOG_FORMAT_ENV,
                source,
            }),
        }
    }
}

/// Who owns the global subscriber after [`init_logging`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Installation {
    /// This crate installed it.
    Installed(LogFormat),
    /// Another component got there first; its configuration is kept.
    External,
}

/// Errors raised while initialising structured logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// An environment variable was not valid Unicode.
    #[error("environment variable `{name}` contained invalid UTF-8: {source}")]
    InvalidUnicode {
        /// Name of the offending environment variable.
        name: &'static str,
        /// Underlying failure.
        #[source]
        source: env::VarError,
    },
    /// [`LOG_FORMAT_ENV`] named an unknown format.
    #[error("unsupported log format `{provided}`; expected `human` or `json`")]
    UnsupportedFormat {
        /// Raw value supplied by the user.
        provided: String,
    },
}

/// Installs the global subscriber once; later calls return the first
/// outcome.
///
/// # Errors
/// Returns [`LoggingError`] when [`LOG_FORMAT_ENV`] is unusable. Nothing is
/// installed in that case and a later call may retry.
pub fn init_logging() -> Result<Installation, LoggingError> {
    if let Some(&installation) = INSTALLED.get() {
        return Ok(installation);
    }
    let format = LogFormat::from_env()?;
    Ok(*INSTALLED.get_or_init(|| install(format)))
}

fn install(format: LogFormat) -> Installation {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let output = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    let output = match format {
        LogFormat::Human => output.boxed(),
        LogFormat::Json => output
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
    };

    // The bridge is optional: an existing `log` logger stays in charge.
    let _bridged = LogTracer::init();

    match tracing_subscriber::registry().with(filter).with(output).try_init() {
        Ok(()) => Installation::Installed(format),
        Err(_) => Installation::External,
    }
}
