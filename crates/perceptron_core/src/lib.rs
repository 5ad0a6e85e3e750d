//! Core forward-pass domain logic that stays independent of GPU backends.
//!
//! This crate hosts:
//! - the batch containers staged to every engine
//! - seeded input generation and the benchmark configuration
//! - the sequential reference engine used as the correctness oracle
//! - helpers for comparing engine outputs

pub mod batch;
pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod metrics;
pub mod reference;

/// Convenience re-export for the scalar type used across the benchmark.
pub type Scalar = f32;

pub use batch::{FeatureBatch, OutputBatch, ParameterVector};
pub use config::BenchmarkConfig;
pub use engine::{EngineKind, ExecutionReport, ForwardEngine};
pub use error::EngineError;
pub use reference::ReferenceEngine;
