//! Benchmark configuration shared between the harness and the CLI.

use serde::{Deserialize, Serialize};

use crate::{
    generator::{self, DEFAULT_BIAS, DEFAULT_WEIGHTS},
    EngineError, ParameterVector, Scalar,
};

/// Workload description for one benchmark invocation.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Number of feature vectors in the batch.
    pub record_count: usize,
    /// Features per record.
    pub feature_count: usize,
    /// Per-feature coefficients. When absent the reference weights are used for
    /// two features and seeded random weights otherwise.
    pub weights: Option<Vec<Scalar>>,
    /// Scalar offset; follows the same fallback as `weights` when absent.
    pub bias: Option<Scalar>,
    /// Input generation seed; a fresh one is drawn per run when absent.
    pub seed: Option<u64>,
    /// Largest per-record disagreement tolerated between the two engines.
    pub tolerance: Scalar,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            record_count: 10_000_000,
            feature_count: DEFAULT_WEIGHTS.len(),
            weights: None,
            bias: None,
            seed: None,
            tolerance: 1e-5,
        }
    }
}

impl BenchmarkConfig {
    /// Rejects empty workloads and weights that disagree with `feature_count`.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.record_count == 0 {
            return Err(EngineError::shape("record count", 1, 0));
        }
        if self.feature_count == 0 {
            return Err(EngineError::shape("feature count", 1, 0));
        }
        if let Some(weights) = &self.weights {
            if weights.len() != self.feature_count {
                return Err(EngineError::shape(
                    "weights",
                    self.feature_count,
                    weights.len(),
                ));
            }
        }
        Ok(())
    }

    /// Resolves the parameters the run will use. `seed` only matters when the
    /// weights have to be generated.
    pub fn parameters(&self, seed: u64) -> Result<ParameterVector, EngineError> {
        self.validate()?;
        let generated = match (&self.weights, self.feature_count == DEFAULT_WEIGHTS.len()) {
            (Some(_), _) | (None, true) => None,
            (None, false) => Some(generator::generate_parameters(self.feature_count, seed)?),
        };
        let weights = match (&self.weights, &generated) {
            (Some(weights), _) => weights.clone(),
            (None, Some(params)) => params.weights().to_vec(),
            (None, None) => DEFAULT_WEIGHTS.to_vec(),
        };
        let bias = self.bias.unwrap_or_else(|| {
            generated
                .as_ref()
                .map(ParameterVector::bias)
                .unwrap_or(DEFAULT_BIAS)
        });
        ParameterVector::new(weights, bias)
    }
}
