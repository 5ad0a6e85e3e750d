//! Sequential forward pass used as the correctness oracle and the host baseline.

use tracing::debug;

use crate::{
    EngineError, EngineKind, FeatureBatch, ForwardEngine, OutputBatch, ParameterVector, Scalar,
};

/// Smallest activation ever stored (smallest normal `f32`).
pub const ACTIVATION_FLOOR: Scalar = Scalar::MIN_POSITIVE;
/// Largest activation ever stored (largest `f32` below one).
pub const ACTIVATION_CEIL: Scalar = 1.0 - Scalar::EPSILON / 2.0;

/// Logistic function evaluated without overflowing `exp` for either sign of `z`.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Narrows an activation to `f32`, keeping it strictly inside `(0, 1)`.
pub fn store_activation(value: f64) -> Scalar {
    (value as Scalar).clamp(ACTIVATION_FLOOR, ACTIVATION_CEIL)
}

/// Pre-activation `dot(record, weights) + bias`, accumulated in `f64`.
pub fn pre_activation(record: &[Scalar], params: &ParameterVector) -> f64 {
    let dot: f64 = record
        .iter()
        .zip(params.weights())
        .map(|(&x, &w)| f64::from(x) * f64::from(w))
        .sum();
    dot + f64::from(params.bias())
}

/// Runs the forward pass over every record in order.
pub fn forward(batch: &FeatureBatch, params: &ParameterVector) -> Result<OutputBatch, EngineError> {
    params.check_compatible(batch)?;
    let outputs: Vec<Scalar> = batch
        .records()
        .map(|record| store_activation(sigmoid(pre_activation(record, params))))
        .collect();
    Ok(OutputBatch::from(outputs))
}

/// Single-threaded engine; holds no state between calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceEngine;

impl ReferenceEngine {
    pub fn new() -> Self {
        Self
    }
}

impl ForwardEngine for ReferenceEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Reference
    }

    fn compute(
        &mut self,
        batch: &FeatureBatch,
        params: &ParameterVector,
    ) -> Result<OutputBatch, EngineError> {
        debug!(
            records = batch.record_count(),
            features = batch.feature_count(),
            "running reference forward pass"
        );
        forward(batch, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_is_symmetric_and_centered() {
        assert_eq!(sigmoid(0.0), 0.5);
        for z in [0.1, 1.0, 4.0, 30.0] {
            assert!((sigmoid(z) + sigmoid(-z) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn sigmoid_saturates_without_nan() {
        assert_eq!(sigmoid(1e6), 1.0);
        assert_eq!(sigmoid(-1e6), 0.0);
        assert!(!sigmoid(f64::MAX).is_nan());
        assert!(!sigmoid(f64::MIN).is_nan());
    }

    #[test]
    fn stored_activation_stays_open_interval() {
        assert_eq!(store_activation(1.0), ACTIVATION_CEIL);
        assert_eq!(store_activation(0.0), ACTIVATION_FLOOR);
        assert!(ACTIVATION_CEIL < 1.0);
        assert!(ACTIVATION_FLOOR > 0.0);
        assert_eq!(store_activation(0.25), 0.25);
    }

    #[test]
    fn forward_rejects_mismatched_weights() {
        let batch = FeatureBatch::new(2, vec![0.0; 4]).unwrap();
        let params = ParameterVector::new(vec![1.0], 0.0).unwrap();
        assert!(matches!(
            forward(&batch, &params),
            Err(EngineError::Shape { .. })
        ));
    }

    #[test]
    fn pre_activation_adds_bias() {
        let params = ParameterVector::new(vec![0.5, -0.5], 0.1).unwrap();
        let z = pre_activation(&[1.0, 0.0], &params);
        assert!((z - 0.6).abs() < 1e-7);
    }
}
