//! Benchmark harness comparing the wgpu forward pass with the sequential reference.

pub mod harness;
pub mod summary;

pub use harness::{report_failure, time_engine, BenchmarkHarness, BenchmarkRun, EngineRun};
pub use summary::{export_summary_json, load_config_json, BenchmarkSummary};
