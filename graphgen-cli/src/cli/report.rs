//! Plain-text rendering of command outcomes.

use std::{
    io::{self, Write},
    time::Duration,
};

use graphgen_core::{ContentHash, MeasurementSnapshot, MetricsSnapshot};

/// How a `write` run executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// One process, one shared write pipeline.
    InProcess,
    /// Independent partitions, each with its own backend and pipeline.
    Partitioned,
}

impl RunMode {
    /// Label used in logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InProcess => "in-process",
            Self::Partitioned => "partitioned",
        }
    }
}

/// A partition that did not complete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionFailure {
    /// Partition index.
    pub partition: usize,
    /// Stable error code.
    pub code: &'static str,
    /// Human-readable cause.
    pub message: String,
}

/// Result of a `write` run.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteSummary {
    /// Fingerprint of the model that was generated.
    pub model_hash: ContentHash,
    /// Backend the writes went to.
    pub backend: String,
    /// Execution mode.
    pub mode: RunMode,
    /// Partitions the run was split into.
    pub partitions: usize,
    /// Measurements of successful partitions.
    pub metrics: MetricsSnapshot,
    /// Partitions that failed.
    pub failures: Vec<PartitionFailure>,
}

impl WriteSummary {
    /// Whether every partition completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of any CLI command.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// `write` finished.
    Write(WriteSummary),
    /// `hash` computed a fingerprint.
    Hash(ContentHash),
    /// `backends` listed registered names.
    Backends(Vec<&'static str>),
}

/// Writes `outcome` to `writer`.
///
/// # Errors
/// Returns [`io::Error`] if writing fails.
///
/// # Examples
/// ```
/// use graphgen_cli::cli::{Outcome, render_outcome};
///
/// let mut out = Vec::new();
/// render_outcome(&Outcome::Backends(vec!["memory", "noop"]), &mut out)?;
/// assert_eq!(String::from_utf8_lossy(&out), "memory\nnoop\n");
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn render_outcome(outcome: &Outcome, mut writer: impl Write) -> io::Result<()> {
    match outcome {
        Outcome::Write(summary) => render_summary(summary, writer),
        Outcome::Hash(hash) => writeln!(writer, "{hash}"),
        Outcome::Backends(names) => {
            for name in names {
                writeln!(writer, "{name}")?;
            }
            Ok(())
        }
    }
}

fn render_summary(summary: &WriteSummary, mut writer: impl Write) -> io::Result<()> {
    writeln!(writer, "model: {}", summary.model_hash)?;
    writeln!(
        writer,
        "backend: {} ({}, {} partitions)",
        summary.backend,
        summary.mode.as_str(),
        summary.partitions
    )?;
    writeln!(writer, "elapsed: {:.3}s", summary.metrics.elapsed.as_secs_f64())?;
    writeln!(
        writer,
        "{:<13}{:>10}{:>10}{:>8}{:>8}{:>12}{:>12}{:>12}{:>12}",
        "operation", "count", "ok", "error", "n/i", "mean_us", "min_us", "max_us", "ops/s"
    )?;
    for row in &summary.metrics.measurements {
        render_row(row, &mut writer)?;
    }
    for failure in &summary.failures {
        writeln!(
            writer,
            "partition {} failed [{}]: {}",
            failure.partition, failure.code, failure.message
        )?;
    }
    Ok(())
}

fn render_row(row: &MeasurementSnapshot, writer: &mut impl Write) -> io::Result<()> {
    writeln!(
        writer,
        "{:<13}{:>10}{:>10}{:>8}{:>8}{:>12}{:>12}{:>12}{:>12}",
        row.operation.as_str(),
        row.count,
        row.ok,
        row.errors,
        row.not_implemented,
        micros(row.mean_latency),
        micros(row.min_latency),
        micros(row.max_latency),
        row.throughput
            .map_or_else(|| "-".to_owned(), |rate| format!("{rate:.1}")),
    )
}

fn micros(latency: Option<Duration>) -> String {
    latency.map_or_else(|| "-".to_owned(), |value| value.as_micros().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphgen_core::{Metrics, Operation, Status};

    fn summary(failures: Vec<PartitionFailure>) -> WriteSummary {
        let metrics = Metrics::new();
        metrics
            .get(Operation::WriteVertex)
            .record(Status::Ok, Duration::from_micros(40));
        metrics
            .get(Operation::WriteVertex)
            .record(Status::Error, Duration::from_micros(60));
        WriteSummary {
            model_hash: ContentHash::from_bytes([1; 32]),
            backend: "noop".into(),
            mode: RunMode::Partitioned,
            partitions: 4,
            metrics: metrics.snapshot(Duration::from_secs(2)),
            failures,
        }
    }

    fn render(outcome: &Outcome) -> String {
        let mut out = Vec::new();
        render_outcome(outcome, &mut out).expect("writing to a Vec cannot fail");
        String::from_utf8(out).expect("report is UTF-8")
    }

    #[test]
    fn write_reports_list_every_operation() {
        let text = render(&Outcome::Write(summary(Vec::new())));
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], format!("model: {}", "01".repeat(32)));
        assert_eq!(lines[1], "backend: noop (partitioned, 4 partitions)");
        assert_eq!(lines[2], "elapsed: 2.000s");
        assert_eq!(lines.len(), 4 + Operation::ALL.len());
        let vertex_row: Vec<_> = lines[4].split_whitespace().collect();
        assert_eq!(
            vertex_row,
            ["write_vertex", "2", "1", "1", "0", "50", "40", "60", "1.0"]
        );
        let subgraph_row: Vec<_> = lines[6].split_whitespace().collect();
        assert_eq!(
            subgraph_row,
            ["subgraph", "0", "0", "0", "0", "-", "-", "-", "0.0"]
        );
    }

    #[test]
    fn failed_partitions_are_listed_after_the_table() {
        let summary = summary(vec![PartitionFailure {
            partition: 3,
            code: "BACKEND_LIFECYCLE",
            message: "refused".into(),
        }]);
        assert!(!summary.is_complete());
        let text = render(&Outcome::Write(summary));
        assert_eq!(
            text.lines().last(),
            Some("partition 3 failed [BACKEND_LIFECYCLE]: refused")
        );
    }

    #[test]
    fn hashes_render_as_hex() {
        let text = render(&Outcome::Hash(ContentHash::from_bytes([0xff; 32])));
        assert_eq!(text, format!("{}\n", "ff".repeat(32)));
    }
}
