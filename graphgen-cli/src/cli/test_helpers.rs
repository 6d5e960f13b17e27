//! Small helpers shared across CLI tests.
//!
//! The CLI unit tests write model and workload files into a temporary
//! directory; these helpers keep the test cases concise.

use std::{fs, io, path::PathBuf};

use tempfile::TempDir;

use super::{Cli, CliError, Command, Outcome, WriteCommand, WriteSummary, run_cli};

/// A two-type model with one relation and vertex properties.
pub(super) const MODEL: &str = r#"{
    "vocabulary": {
        "name": "zoo",
        "entities": [{ "name": "Monkey" }, { "name": "Weasel" }],
        "relations": [{ "name": "chased", "from": "Monkey", "to": "Weasel" }]
    },
    "weights": { "Monkey": 3, "Weasel": 2 },
    "edges": {
        "chased": {
            "domain": { "type": "Monkey", "probability": 0.8, "degree": { "constant": 2 } },
            "range": { "type": "Weasel", "probability": 0.5, "degree": { "constant": 1 } }
        }
    },
    "vertex_properties": { "Monkey": { "age": { "uniform_integer": { "min": 1, "max": 40 } } } }
}"#;

pub(super) fn temp_dir() -> TempDir {
    match TempDir::new() {
        Ok(dir) => dir,
        Err(err) => panic!("failed to create temp dir: {err}"),
    }
}

pub(super) fn create_file(dir: &TempDir, name: &str, contents: &str) -> io::Result<PathBuf> {
    let path = dir.path().join(name);
    fs::write(&path, contents)?;
    Ok(path)
}

/// Writes [`MODEL`] and a workload built from `workload` into `dir`.
pub(super) fn write_command(
    dir: &TempDir,
    workload: &str,
    backend: &str,
    partitioned: bool,
) -> io::Result<WriteCommand> {
    Ok(WriteCommand {
        model: create_file(dir, "model.json", MODEL)?,
        workload: create_file(dir, "workload.properties", workload)?,
        backend: backend.to_owned(),
        partitioned,
    })
}

pub(super) fn run_write_expecting_summary(command: WriteCommand) -> WriteSummary {
    match run_cli(Cli {
        command: Command::Write(command),
    }) {
        Ok(Outcome::Write(summary)) => summary,
        Ok(other) => panic!("unexpected outcome: {other:?}"),
        Err(err) => panic!("write failed: {err}"),
    }
}

pub(super) fn run_cli_expecting_error(cli: Cli, panic_msg: &str) -> CliError {
    match run_cli(cli) {
        Ok(_) => panic!("{panic_msg}"),
        Err(err) => err,
    }
}
