//! Command implementations and argument parsing for the graphgen CLI.

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use clap::{Args, Parser, Subcommand};
use graphgen_backends::{DEFAULT_BACKEND, default_registry};
use graphgen_core::{
    Backend, BackendError, ContentHash, GenerationPlan, GraphGenError, GraphGenerator, GraphModel,
    RayonExecutor, WorkloadProperties, with_lifecycle,
};
use thiserror::Error;
use tracing::{Span, field, info, instrument};

use super::{
    model_file::load_model,
    report::{Outcome, PartitionFailure, RunMode, WriteSummary},
    workload::{WorkloadError, WorkloadSettings, load_workload},
};

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(name = "graphgen", about = "Generate synthetic property graphs into a backend.")]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Generate a graph and write it through a backend.
    Write(WriteCommand),
    /// Print the content hash of a model.
    Hash(HashCommand),
    /// List the registered backends.
    Backends,
}

/// Options accepted by the `write` command.
#[derive(Debug, Args, Clone)]
pub struct WriteCommand {
    /// JSON model file.
    #[arg(long)]
    pub model: PathBuf,

    /// Workload properties file.
    #[arg(long)]
    pub workload: PathBuf,

    /// Backend to write to.
    #[arg(long, default_value = DEFAULT_BACKEND)]
    pub backend: String,

    /// Run every partition independently, each against its own backend.
    #[arg(long)]
    pub partitioned: bool,
}

/// Options accepted by the `hash` command.
#[derive(Debug, Args, Clone)]
pub struct HashCommand {
    /// JSON model file.
    #[arg(long)]
    pub model: PathBuf,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// A model file could not be read.
    #[error("failed to open `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// A model file was not a valid document.
    #[error("invalid model file `{path}`: {source}")]
    ModelFile {
        /// Path of the document.
        path: PathBuf,
        /// Parse failure.
        #[source]
        source: serde_json::Error,
    },
    /// Workload properties could not be loaded.
    #[error(transparent)]
    Workload(#[from] WorkloadError),
    /// Model validation or generation failed.
    #[error(transparent)]
    Core(#[from] GraphGenError),
}

impl From<BackendError> for CliError {
    fn from(error: BackendError) -> Self {
        Self::Core(error.into())
    }
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when loading inputs or generation fails.
///
/// # Examples
/// ```
/// use graphgen_cli::cli::{Cli, Command, Outcome, run_cli};
///
/// let outcome = run_cli(Cli { command: Command::Backends })?;
/// assert_eq!(outcome, Outcome::Backends(vec!["log", "memory", "noop"]));
/// # Ok::<(), graphgen_cli::cli::CliError>(())
/// ```
#[instrument(
    name = "cli.run",
    err,
    skip(cli),
    fields(command = field::Empty),
)]
pub fn run_cli(cli: Cli) -> Result<Outcome, CliError> {
    let span = Span::current();
    match cli.command {
        Command::Write(write) => {
            span.record("command", field::display("write"));
            Ok(Outcome::Write(run_write(&write)?))
        }
        Command::Hash(hash) => {
            span.record("command", field::display("hash"));
            Ok(Outcome::Hash(model_hash(&hash.model)?))
        }
        Command::Backends => {
            span.record("command", field::display("backends"));
            Ok(Outcome::Backends(default_registry().names().collect()))
        }
    }
}

#[instrument(
    name = "cli.write",
    err,
    skip(command),
    fields(
        backend = %command.backend,
        partitioned = command.partitioned,
        model_hash = field::Empty,
    ),
)]
pub(super) fn run_write(command: &WriteCommand) -> Result<WriteSummary, CliError> {
    let model = Arc::new(load_model(&command.model)?);
    let model_hash = model.hash();
    Span::current().record("model_hash", field::display(model_hash));
    info!(path = %command.model.display(), "model loaded");

    let properties = load_workload(&command.workload)?;
    let settings = WorkloadSettings::from_properties(&properties)?;
    let plan = GenerationPlan::new(
        settings.vertex_count,
        settings.thread_count,
        settings.partition_count,
    )
    .map_err(GraphGenError::from)?;
    let generator = GraphGenerator::new(Arc::clone(&model)).with_seed(settings.seed);

    let started = Instant::now();
    let (mode, metrics, failures) = if command.partitioned {
        let report = generator.generate_distributed(&RayonExecutor, &plan, |_partition| {
            prepare_backend(&command.backend, &properties, &model)
        })?;
        let failures = report.failures.iter().map(describe_failure).collect();
        (RunMode::Partitioned, Arc::new(report.metrics), failures)
    } else {
        let backend = prepare_backend(&command.backend, &properties, &model)?;
        let metrics = with_lifecycle(backend.as_ref(), || {
            generator.generate(Arc::clone(&backend), &plan)
        })?;
        (RunMode::InProcess, metrics, Vec::new())
    };
    let elapsed = started.elapsed();

    info!(
        mode = mode.as_str(),
        writes = metrics.total_count(),
        failed_partitions = failures.len(),
        elapsed_ms = elapsed.as_millis(),
        "write completed"
    );
    Ok(WriteSummary {
        model_hash,
        backend: command.backend.clone(),
        mode,
        partitions: plan.partition_count(),
        metrics: metrics.snapshot(elapsed),
        failures,
    })
}

/// Creates and configures one backend instance.
fn prepare_backend(
    name: &str,
    properties: &WorkloadProperties,
    model: &GraphModel,
) -> Result<Arc<dyn Backend>, BackendError> {
    let mut backend = default_registry().create(name)?;
    backend.set_properties(properties)?;
    backend.set_vocabulary(Arc::clone(model.vocabulary()));
    Ok(Arc::from(backend))
}

fn describe_failure(error: &GraphGenError) -> PartitionFailure {
    let partition = error.partition().unwrap_or_default();
    let cause = match error {
        GraphGenError::PartitionFailed { error, .. } => error.as_ref(),
        other => other,
    };
    PartitionFailure {
        partition,
        code: cause.code().as_str(),
        message: cause.to_string(),
    }
}

/// Loads the model at `path` and returns its fingerprint.
///
/// # Errors
/// See [`load_model`].
pub fn model_hash(path: &Path) -> Result<ContentHash, CliError> {
    Ok(load_model(path)?.hash())
}
