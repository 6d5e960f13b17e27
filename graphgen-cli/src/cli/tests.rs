//! Unit tests for the CLI commands and input loading.

use super::test_helpers::{
    MODEL, create_file, run_cli_expecting_error, run_write_expecting_summary, temp_dir,
    write_command,
};
use super::{Cli, CliError, Command, HashCommand, Outcome, RunMode, WorkloadError, run_cli};

use clap::Parser;
use graphgen_core::{BackendErrorCode, GraphGenErrorCode, Operation};
use graphgen_test_support::tracing::RecordingLayer;
use rstest::rstest;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn clap_defaults_to_the_noop_backend_in_process() {
    let cli = Cli::try_parse_from([
        "graphgen",
        "write",
        "--model",
        "model.json",
        "--workload",
        "workload.properties",
    ])
    .expect("arguments are valid");
    let Command::Write(write) = cli.command else {
        panic!("expected the write command");
    };
    assert_eq!(write.backend, "noop");
    assert!(!write.partitioned);
}

#[rstest]
#[case(&["graphgen", "write", "--model", "m.json"])]
#[case(&["graphgen", "hash"])]
#[case(&["graphgen", "generate"])]
fn clap_rejects_incomplete_invocations(#[case] args: &[&str]) {
    assert!(Cli::try_parse_from(args).is_err());
}

#[rstest]
#[case::in_process(false, RunMode::InProcess)]
#[case::partitioned(true, RunMode::Partitioned)]
fn write_generates_the_configured_vertex_budget(
    #[case] partitioned: bool,
    #[case] mode: RunMode,
) -> TestResult {
    let dir = temp_dir();
    let command = write_command(
        &dir,
        "write.vertex.count=50\nwrite.thread.count=2\ngraph.partition.count=3\n",
        "noop",
        partitioned,
    )?;
    let summary = run_write_expecting_summary(command);
    assert_eq!(summary.mode, mode);
    assert_eq!(summary.partitions, 3);
    assert!(summary.is_complete());
    let vertices = summary.metrics.get(Operation::WriteVertex);
    assert_eq!((vertices.count, vertices.ok), (50, 50));
    assert!(summary.metrics.get(Operation::WriteEdge).count > 0);
    Ok(())
}

#[test]
fn both_modes_write_the_same_number_of_edges() -> TestResult {
    let dir = temp_dir();
    let workload = "write.vertex.count=80\nwrite.thread.count=3\ngraph.partition.count=4\n";
    let edges = |partitioned| -> Result<u64, std::io::Error> {
        let summary = run_write_expecting_summary(write_command(&dir, workload, "memory", partitioned)?);
        Ok(summary.metrics.get(Operation::WriteEdge).ok)
    };
    assert_eq!(edges(false)?, edges(true)?);
    Ok(())
}

#[test]
fn backend_settings_come_from_the_workload() -> TestResult {
    let dir = temp_dir();
    let command = write_command(
        &dir,
        "write.vertex.count=40\nwrite.thread.count=2\ngraph.partition.count=2\nmemory.capacity=10\n",
        "memory",
        false,
    )?;
    let summary = run_write_expecting_summary(command);
    let vertices = summary.metrics.get(Operation::WriteVertex);
    let edges = summary.metrics.get(Operation::WriteEdge);
    assert_eq!(vertices.ok + edges.ok, 10);
    assert_eq!(vertices.errors, 30);
    Ok(())
}

#[test]
fn env_properties_overlay_the_workload_file() -> TestResult {
    let dir = temp_dir();
    create_file(&dir, "env.properties", "write.vertex.count=25\n")?;
    let command = write_command(&dir, "write.vertex.count=5\ngraph.partition.count=1\n", "noop", false)?;
    let summary = run_write_expecting_summary(command);
    assert_eq!(summary.metrics.get(Operation::WriteVertex).count, 25);
    Ok(())
}

#[test]
fn invalid_backend_settings_fail_each_partition() -> TestResult {
    let dir = temp_dir();
    let command = write_command(
        &dir,
        "write.vertex.count=10\ngraph.partition.count=3\nmemory.strict=perhaps\n",
        "memory",
        true,
    )?;
    let summary = run_write_expecting_summary(command);
    assert!(!summary.is_complete());
    let partitions: Vec<_> = summary.failures.iter().map(|failure| failure.partition).collect();
    assert_eq!(partitions, [0, 1, 2]);
    assert!(summary
        .failures
        .iter()
        .all(|failure| failure.code == "BACKEND_LIFECYCLE" && failure.message.contains("memory.strict")));
    assert!(summary.metrics.measurements.iter().all(|row| row.count == 0));
    Ok(())
}

#[test]
fn unknown_backends_are_rejected() -> TestResult {
    let dir = temp_dir();
    let command = write_command(&dir, "write.vertex.count=10\n", "cassandra", false)?;
    let err = run_cli_expecting_error(
        Cli {
            command: Command::Write(command),
        },
        "unknown backend must fail",
    );
    let CliError::Core(core) = err else {
        panic!("expected a core error, got {err:?}");
    };
    assert_eq!(core.code(), GraphGenErrorCode::Backend(BackendErrorCode::Unknown));
    Ok(())
}

#[test]
fn malformed_workload_numbers_are_reported() -> TestResult {
    let dir = temp_dir();
    let command = write_command(&dir, "write.thread.count=many\n", "noop", false)?;
    let err = run_cli_expecting_error(
        Cli {
            command: Command::Write(command),
        },
        "malformed thread count must fail",
    );
    assert!(matches!(
        err,
        CliError::Workload(WorkloadError::InvalidNumber {
            key: "write.thread.count",
            ..
        })
    ));
    Ok(())
}

#[test]
fn zero_threads_are_a_configuration_error() -> TestResult {
    let dir = temp_dir();
    let command = write_command(&dir, "write.thread.count=0\n", "noop", false)?;
    let err = run_cli_expecting_error(
        Cli {
            command: Command::Write(command),
        },
        "zero threads must fail",
    );
    let CliError::Core(core) = err else {
        panic!("expected a core error, got {err:?}");
    };
    assert_eq!(core.code().as_str(), "CONFIG_ZERO_CONCURRENCY");
    Ok(())
}

#[test]
fn missing_model_files_report_their_path() {
    let dir = temp_dir();
    let path = dir.path().join("absent.json");
    let err = run_cli_expecting_error(
        Cli {
            command: Command::Hash(HashCommand { model: path.clone() }),
        },
        "missing model must fail",
    );
    match err {
        CliError::Io { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("expected an I/O error, got {other:?}"),
    }
}

#[test]
fn malformed_model_files_are_reported() -> TestResult {
    let dir = temp_dir();
    let path = create_file(&dir, "model.json", "{ \"vocabulary\": ")?;
    let err = run_cli_expecting_error(
        Cli {
            command: Command::Hash(HashCommand { model: path }),
        },
        "truncated model must fail",
    );
    assert!(matches!(err, CliError::ModelFile { .. }));
    Ok(())
}

#[test]
fn hashes_ignore_declaration_order() -> TestResult {
    let dir = temp_dir();
    let original = create_file(&dir, "a.json", MODEL)?;
    let reordered = MODEL.replace(
        r#"[{ "name": "Monkey" }, { "name": "Weasel" }]"#,
        r#"[{ "name": "Weasel" }, { "name": "Monkey" }]"#,
    );
    assert_ne!(reordered, MODEL);
    let reordered = create_file(&dir, "b.json", &reordered)?;
    let hash = |model| run_cli(Cli {
        command: Command::Hash(HashCommand { model }),
    });
    assert_eq!(hash(original)?, hash(reordered)?);
    Ok(())
}

#[test]
fn backends_are_listed_by_name() -> TestResult {
    let outcome = run_cli(Cli {
        command: Command::Backends,
    })?;
    assert_eq!(outcome, Outcome::Backends(vec!["log", "memory", "noop"]));
    Ok(())
}

#[test]
fn write_emits_tracing_fields() -> TestResult {
    let dir = temp_dir();
    let command = write_command(&dir, "write.vertex.count=20\ngraph.partition.count=2\n", "noop", false)?;
    let layer = RecordingLayer::default();
    let summary = layer.capture(|| run_write_expecting_summary(command));

    let run = layer.span("cli.run").expect("cli.run span must exist");
    assert_eq!(run.fields.get("command"), Some(&"write".to_owned()));

    let write = layer.span("cli.write").expect("cli.write span must exist");
    assert_eq!(write.fields.get("backend"), Some(&"noop".to_owned()));
    assert_eq!(write.fields.get("partitioned"), Some(&"false".to_owned()));
    assert_eq!(
        write.fields.get("model_hash"),
        Some(&summary.model_hash.to_string())
    );

    let completed = layer.events_with_message("write completed");
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].fields["mode"], "in-process");
    let writes: u64 = summary.metrics.measurements.iter().map(|row| row.count).sum();
    assert_eq!(completed[0].fields["writes"], writes.to_string());
    Ok(())
}
