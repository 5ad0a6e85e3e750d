use perceptron_core::{
    generator::{generate_batch, generate_parameters},
    reference::{forward, sigmoid},
    FeatureBatch, ForwardEngine, ParameterVector, ReferenceEngine,
};

#[test]
fn two_feature_scenario_matches_hand_computed_values() {
    let batch =
        FeatureBatch::from_records(&[[0.0f32, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]).unwrap();
    let params = ParameterVector::new(vec![0.5, -0.5], 0.1).unwrap();
    let outputs = ReferenceEngine::new().compute(&batch, &params).unwrap();

    let expected = [0.5250, 0.6457, 0.4013, 0.5250];
    assert_eq!(outputs.len(), expected.len());
    for (got, want) in outputs.iter().zip(expected) {
        assert!((got - want).abs() <= 1e-3, "got {got}, want {want}");
    }
}

#[test]
fn reference_is_bit_deterministic() {
    let batch = generate_batch(10_000, 2, 0xA11CE).unwrap();
    let params = ParameterVector::default();
    let first = forward(&batch, &params).unwrap();
    let second = forward(&batch, &params).unwrap();
    assert!(first
        .iter()
        .zip(second.iter())
        .all(|(a, b)| a.to_bits() == b.to_bits()));
}

#[test]
fn outputs_stay_inside_open_unit_interval() {
    for features in [1usize, 2, 16] {
        let batch = generate_batch(4096, features, 17 + features as u64).unwrap();
        let params = generate_parameters(features, 3).unwrap();
        let outputs = forward(&batch, &params).unwrap();
        assert_eq!(outputs.len(), 4096);
        assert!(outputs.iter().all(|&v| v > 0.0 && v < 1.0));
    }
}

#[test]
fn extreme_pre_activations_saturate() {
    let batch = FeatureBatch::from_records(&[[1.0f32], [-2.0], [f32::MAX], [-f32::MAX]]).unwrap();
    let params = ParameterVector::new(vec![1.0e30], 1.0e30).unwrap();
    let outputs = forward(&batch, &params).unwrap();

    assert!((outputs[0] - 1.0).abs() <= 1e-5);
    assert!(outputs[1] <= 1e-5);
    assert!((outputs[2] - 1.0).abs() <= 1e-5);
    assert!(outputs[3] <= 1e-5);
    assert!(outputs.iter().all(|&v| v.is_finite() && v > 0.0 && v < 1.0));
}

#[test]
fn opposing_products_beyond_f32_range_cancel() {
    let batch = FeatureBatch::from_records(&[[1.0e20f32, 1.0e20], [0.5, 0.5]]).unwrap();
    let params = ParameterVector::new(vec![1.0e20, -1.0e20], 0.1).unwrap();
    let outputs = forward(&batch, &params).unwrap();

    assert_eq!(outputs[0], outputs[1]);
    assert!((f64::from(outputs[0]) - sigmoid(f64::from(0.1f32))).abs() <= 1e-7);
}

#[test]
fn single_record_batch_is_supported() {
    let batch = FeatureBatch::new(2, vec![0.25, 0.75]).unwrap();
    let params = ParameterVector::default();
    let outputs = forward(&batch, &params).unwrap();
    let z = 0.25 * 0.5 - 0.75 * 0.5 + f64::from(0.1f32);
    assert_eq!(outputs.len(), 1);
    assert!((f64::from(outputs[0]) - sigmoid(z)).abs() <= 1e-7);
}
