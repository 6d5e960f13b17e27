//! Benchmark support crate for graphgen.
//!
//! Provides synthetic models, request batches and parameter types used by
//! the Criterion benchmarks for the two hot paths: request enumeration by
//! the generator and delivery through the write pipeline.

pub mod error;
pub mod fixtures;
pub mod params;
