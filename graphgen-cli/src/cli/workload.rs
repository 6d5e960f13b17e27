//! Workload properties: the `key=value` files that size a benchmark run.
//!
//! Values are layered: the workload file, then `env.properties` in the same
//! directory, then environment variables named `GRAPHGEN_` plus the key in
//! upper case with dots replaced by underscores (`write.seed` becomes
//! `GRAPHGEN_WRITE_SEED`).

use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use graphgen_core::WorkloadProperties;
use thiserror::Error;
use tracing::debug;

/// Partition count key.
pub const PARTITION_COUNT_KEY: &str = "graph.partition.count";
/// Total vertex budget key.
pub const VERTEX_COUNT_KEY: &str = "write.vertex.count";
/// Run seed key.
pub const SEED_KEY: &str = "write.seed";
/// Worker count key.
pub const THREAD_COUNT_KEY: &str = "write.thread.count";

const ENV_PREFIX: &str = "GRAPHGEN_";
const OVERLAY_FILE: &str = "env.properties";

/// Errors raised while loading workload properties.
#[derive(Debug, Error)]
pub enum WorkloadError {
    /// A properties file could not be read.
    #[error("failed to read `{path}`: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// A recognised key held something other than a non-negative integer.
    #[error("`{key}` must be a non-negative integer (got `{value}`)")]
    InvalidNumber {
        /// Offending key.
        key: &'static str,
        /// Raw value.
        value: String,
    },
}

/// The settings the driver reads from workload properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkloadSettings {
    /// Independent partitions to split generation into.
    pub partition_count: usize,
    /// Vertices to generate in total.
    pub vertex_count: u64,
    /// Run seed.
    pub seed: u64,
    /// Write workers, and producers in in-process mode.
    pub thread_count: usize,
}

impl Default for WorkloadSettings {
    fn default() -> Self {
        Self {
            partition_count: 16,
            vertex_count: 0,
            seed: graphgen_core::DEFAULT_SEED,
            thread_count: 16,
        }
    }
}

impl WorkloadSettings {
    /// Reads the recognised keys, keeping defaults for absent ones.
    ///
    /// # Errors
    /// Returns [`WorkloadError::InvalidNumber`] naming the first malformed
    /// key.
    pub fn from_properties(properties: &WorkloadProperties) -> Result<Self, WorkloadError> {
        let defaults = Self::default();
        Ok(Self {
            partition_count: read(properties, PARTITION_COUNT_KEY, defaults.partition_count)?,
            vertex_count: read(properties, VERTEX_COUNT_KEY, defaults.vertex_count)?,
            seed: read(properties, SEED_KEY, defaults.seed)?,
            thread_count: read(properties, THREAD_COUNT_KEY, defaults.thread_count)?,
        })
    }
}

fn read<T: std::str::FromStr>(
    properties: &WorkloadProperties,
    key: &'static str,
    default: T,
) -> Result<T, WorkloadError> {
    let Some(raw) = properties.get(key) else {
        return Ok(default);
    };
    raw.trim().parse().map_err(|_| WorkloadError::InvalidNumber {
        key,
        value: raw.to_owned(),
    })
}

/// Parses `key=value` lines.
///
/// Blank lines and lines starting with `#` or `!` are skipped; `:` is
/// accepted as a separator; keys and values are trimmed. A line without a
/// separator sets its key to the empty string.
///
/// # Examples
/// ```
/// use graphgen_cli::cli::parse_properties;
///
/// let properties = parse_properties("# run\nwrite.seed = 7\nhost: db\n");
/// assert_eq!(properties.get("write.seed"), Some("7"));
/// assert_eq!(properties.get("host"), Some("db"));
/// ```
#[must_use]
pub fn parse_properties(text: &str) -> WorkloadProperties {
    let mut properties = WorkloadProperties::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let (key, value) = line
            .split_once(['=', ':'])
            .map_or((line, ""), |(key, value)| (key.trim(), value.trim()));
        properties.insert(key, value);
    }
    properties
}

/// Environment variable that overrides `key`.
#[must_use]
pub fn environment_name(key: &str) -> String {
    let mut name = String::with_capacity(ENV_PREFIX.len() + key.len());
    name.push_str(ENV_PREFIX);
    name.extend(key.chars().map(|c| match c {
        '.' | '-' => '_',
        other => other.to_ascii_uppercase(),
    }));
    name
}

/// Overrides known keys and the recognised settings from `lookup`.
pub fn overlay_environment(
    properties: &mut WorkloadProperties,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let mut keys: Vec<String> = properties.iter().map(|(key, _)| key.to_owned()).collect();
    keys.extend(
        [PARTITION_COUNT_KEY, VERTEX_COUNT_KEY, SEED_KEY, THREAD_COUNT_KEY].map(str::to_owned),
    );
    for key in keys {
        if let Some(value) = lookup(&environment_name(&key)) {
            debug!(%key, "workload property overridden from the environment");
            properties.insert(key, value);
        }
    }
}

/// Loads `path`, its `env.properties` sibling and environment overrides.
///
/// # Errors
/// Returns [`WorkloadError::Io`] when `path` or an existing overlay file
/// cannot be read.
pub fn load_workload(path: &Path) -> Result<WorkloadProperties, WorkloadError> {
    let mut properties = parse_properties(&read_file(path)?);
    let overlay = path
        .parent()
        .map_or_else(|| PathBuf::from(OVERLAY_FILE), |dir| dir.join(OVERLAY_FILE));
    match fs::read_to_string(&overlay) {
        Ok(text) => properties.overlay(parse_properties(&text).iter()),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(source) => {
            return Err(WorkloadError::Io {
                path: overlay,
                source,
            });
        }
    }
    overlay_environment(&mut properties, |name| std::env::var(name).ok());
    Ok(properties)
}

fn read_file(path: &Path) -> Result<String, WorkloadError> {
    fs::read_to_string(path).map_err(|source| WorkloadError::Io {
        path: path.to_path_buf(),
        source,
    })
}
