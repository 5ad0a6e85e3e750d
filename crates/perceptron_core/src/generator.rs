//! Deterministic input generation for benchmark runs.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{EngineError, FeatureBatch, ParameterVector, Scalar};

/// Weights of the reference workload (two features).
pub const DEFAULT_WEIGHTS: [Scalar; 2] = [0.5, -0.5];
/// Bias of the reference workload.
pub const DEFAULT_BIAS: Scalar = 0.1;

/// Draws a fresh seed for runs that did not pin one.
pub fn random_seed() -> u64 {
    rand::random()
}

/// Fills `records × features` values uniformly in `[0, 1)`.
pub fn generate_batch(
    records: usize,
    features: usize,
    seed: u64,
) -> Result<FeatureBatch, EngineError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let len = records
        .checked_mul(features)
        .ok_or_else(|| EngineError::shape("feature batch", usize::MAX, records))?;
    let values: Vec<Scalar> = (0..len).map(|_| rng.gen::<Scalar>()).collect();
    FeatureBatch::new(features, values)
}

/// Random weights and bias in `[-1, 1]`, for workloads wider than the defaults.
pub fn generate_parameters(features: usize, seed: u64) -> Result<ParameterVector, EngineError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x9E37_79B9_7F4A_7C15);
    let weights = (0..features).map(|_| rng.gen_range(-1.0..=1.0)).collect();
    let bias = rng.gen_range(-1.0..=1.0);
    ParameterVector::new(weights, bias)
}
