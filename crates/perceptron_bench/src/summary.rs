//! Machine-readable benchmark summary and JSON config loading.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use perceptron_core::{metrics, BenchmarkConfig, ExecutionReport};
use serde::{Deserialize, Serialize};

use crate::BenchmarkRun;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSummary {
    pub config: BenchmarkConfig,
    pub seed: u64,
    pub reports: Vec<ExecutionReport>,
    pub speedup: f64,
    pub agreement: metrics::Agreement,
    pub parallel_checksum: f64,
    pub reference_checksum: f64,
}

impl BenchmarkSummary {
    pub fn from_run(config: &BenchmarkConfig, run: &BenchmarkRun) -> Self {
        Self {
            config: config.clone(),
            seed: run.seed,
            reports: run.reports().to_vec(),
            speedup: run.speedup(),
            agreement: run.agreement(),
            parallel_checksum: metrics::checksum(run.parallel.outputs.as_slice()),
            reference_checksum: metrics::checksum(run.reference.outputs.as_slice()),
        }
    }
}

/// Writes `summary` as pretty-printed JSON.
pub fn export_summary_json<P: AsRef<Path>>(summary: &BenchmarkSummary, path: P) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("failed to encode summary")?;
    fs::write(&path, json)
        .with_context(|| format!("failed to write summary to {}", path.as_ref().display()))?;
    Ok(())
}

/// Reads a [`BenchmarkConfig`] from JSON; absent keys keep their defaults.
pub fn load_config_json<P: AsRef<Path>>(path: P) -> Result<BenchmarkConfig> {
    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.as_ref().display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid config JSON in {}", path.as_ref().display()))
}
