//! Command-line interface orchestration for the graphgen driver.
//!
//! `write` loads a JSON model and a workload properties file, generates the
//! graph through a registered backend and reports the backend metrics.
//! `hash` prints a model fingerprint and `backends` lists backend names.

mod commands;
mod model_file;
mod report;
mod workload;

pub use commands::{Cli, CliError, Command, HashCommand, WriteCommand, model_hash, run_cli};
pub use model_file::{ModelFile, load_model};
pub use report::{Outcome, PartitionFailure, RunMode, WriteSummary, render_outcome};
pub use workload::{
    PARTITION_COUNT_KEY, SEED_KEY, THREAD_COUNT_KEY, VERTEX_COUNT_KEY, WorkloadError,
    WorkloadSettings, environment_name, load_workload, overlay_environment, parse_properties,
};

#[cfg(test)]
mod test_helpers;
#[cfg(test)]
mod tests;
