//! Benchmark parameter types.
//!
//! Each struct renders as the Criterion benchmark identifier.

use std::fmt;

/// Parameters for a generation benchmark run.
#[derive(Clone, Debug)]
pub struct GenerationBenchParams {
    /// Total vertex budget.
    pub vertex_count: u64,
    /// Producer threads and write workers.
    pub concurrency: usize,
}

impl fmt::Display for GenerationBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={},c={}", self.vertex_count, self.concurrency)
    }
}

/// Parameters for a write pipeline benchmark run.
#[derive(Clone, Debug)]
pub struct DispatchBenchParams {
    /// Requests submitted per iteration.
    pub request_count: usize,
    /// Write workers.
    pub workers: usize,
}

impl fmt::Display for DispatchBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={},w={}", self.request_count, self.workers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_compact() {
        let generation = GenerationBenchParams {
            vertex_count: 10_000,
            concurrency: 4,
        };
        let dispatch = DispatchBenchParams {
            request_count: 500,
            workers: 8,
        };
        assert_eq!(generation.to_string(), "n=10000,c=4");
        assert_eq!(dispatch.to_string(), "n=500,w=8");
    }
}
