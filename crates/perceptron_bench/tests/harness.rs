use std::{env, fs, path::PathBuf, time::Duration};

use perceptron_bench::{
    export_summary_json, load_config_json, report_failure, time_engine, BenchmarkHarness,
    BenchmarkSummary,
};
use perceptron_core::{
    BenchmarkConfig, EngineError, EngineKind, FeatureBatch, ForwardEngine, OutputBatch,
    ParameterVector, ReferenceEngine,
};

/// Stands in for the device engine: reference arithmetic, parallel identity.
struct HostParallel {
    calls: usize,
}

impl ForwardEngine for HostParallel {
    fn kind(&self) -> EngineKind {
        EngineKind::Parallel
    }

    fn compute(
        &mut self,
        batch: &FeatureBatch,
        params: &ParameterVector,
    ) -> Result<OutputBatch, EngineError> {
        self.calls += 1;
        perceptron_core::reference::forward(batch, params)
    }
}

struct UnavailableDevice;

impl ForwardEngine for UnavailableDevice {
    fn kind(&self) -> EngineKind {
        EngineKind::Parallel
    }

    fn compute(
        &mut self,
        _: &FeatureBatch,
        _: &ParameterVector,
    ) -> Result<OutputBatch, EngineError> {
        Err(EngineError::DeviceUnavailable("no adapter".into()))
    }
}

struct ShortEngine;

impl ForwardEngine for ShortEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Parallel
    }

    fn compute(
        &mut self,
        _: &FeatureBatch,
        _: &ParameterVector,
    ) -> Result<OutputBatch, EngineError> {
        Ok(OutputBatch::from(vec![0.5]))
    }
}

fn small_config() -> BenchmarkConfig {
    BenchmarkConfig {
        record_count: 2048,
        seed: Some(0xA11CE),
        ..Default::default()
    }
}

#[test]
fn harness_reports_both_engines_in_order() {
    let mut harness = BenchmarkHarness::new(HostParallel { calls: 0 }, ReferenceEngine::new());
    let run = harness.run(&small_config()).unwrap();

    let [first, second] = run.reports();
    assert_eq!(first.engine, EngineKind::Parallel);
    assert_eq!(second.engine, EngineKind::Reference);
    assert_eq!(run.seed, 0xA11CE);
    assert_eq!(run.batch.record_count(), 2048);
    assert_eq!(run.parallel.outputs.len(), 2048);
    assert_eq!(run.reference.outputs.len(), 2048);
    assert_eq!(run.parallel.outputs, run.reference.outputs);
    assert!(run.agreement().within(1e-5));

    let (parallel, _) = harness.into_engines();
    assert_eq!(parallel.calls, 1);
}

#[test]
fn seeded_runs_reuse_identical_inputs() {
    let mut harness = BenchmarkHarness::new(HostParallel { calls: 0 }, ReferenceEngine::new());
    let a = harness.run(&small_config()).unwrap();
    let b = harness.run(&small_config()).unwrap();
    assert_eq!(a.batch, b.batch);
    assert_eq!(a.reference.outputs, b.reference.outputs);
}

#[test]
fn device_failure_aborts_without_fallback() {
    let mut harness = BenchmarkHarness::new(UnavailableDevice, ReferenceEngine::new());
    let err = harness.run(&small_config()).unwrap_err();
    assert!(matches!(err, EngineError::DeviceUnavailable(_)));
}

#[test]
fn failures_are_headlined_by_scope() {
    let device = report_failure(EngineError::DeviceUnavailable("no adapter".into()));
    assert_eq!(device.to_string(), "GPU path unavailable");
    assert!(matches!(
        device.downcast_ref::<EngineError>(),
        Some(EngineError::DeviceUnavailable(_))
    ));

    let run = report_failure(EngineError::Readback("map failed".into()));
    assert_eq!(run.to_string(), "benchmark run failed");
    assert!(format!("{run:#}").contains("map failed"));
}

#[test]
fn short_output_is_rejected() {
    let batch = FeatureBatch::new(2, vec![0.0; 8]).unwrap();
    let err = time_engine(&mut ShortEngine, &batch, &ParameterVector::default()).unwrap_err();
    assert_eq!(err, EngineError::shape("engine outputs", 4, 1));
}

#[test]
fn invalid_config_is_rejected_before_generation() {
    let config = BenchmarkConfig {
        feature_count: 3,
        weights: Some(vec![1.0]),
        ..small_config()
    };
    let mut harness = BenchmarkHarness::new(HostParallel { calls: 0 }, ReferenceEngine::new());
    assert!(matches!(
        harness.run(&config),
        Err(EngineError::Shape { .. })
    ));
    let (parallel, _) = harness.into_engines();
    assert_eq!(parallel.calls, 0);
}

#[test]
fn summary_round_trips_through_json() {
    let config = small_config();
    let mut harness = BenchmarkHarness::new(HostParallel { calls: 0 }, ReferenceEngine::new());
    let run = harness.run(&config).unwrap();
    let summary = BenchmarkSummary::from_run(&config, &run);
    assert_eq!(summary.reports.len(), 2);
    assert_eq!(summary.parallel_checksum, summary.reference_checksum);

    let path = temp_file_path("summary");
    export_summary_json(&summary, &path).expect("failed to export summary");
    let text = fs::read_to_string(&path).unwrap();
    fs::remove_file(&path).ok();
    let restored: BenchmarkSummary = serde_json::from_str(&text).unwrap();
    assert_eq!(restored.seed, summary.seed);
    assert_eq!(restored.config, summary.config);
    assert_eq!(restored.agreement, summary.agreement);
}

#[test]
fn config_json_overrides_defaults() {
    let path = temp_file_path("config");
    fs::write(
        &path,
        r#"{"record_count": 64, "feature_count": 3, "weights": [0.1, 0.2, 0.3], "bias": -0.5}"#,
    )
    .unwrap();
    let config = load_config_json(&path).expect("failed to load config");
    fs::remove_file(&path).ok();

    assert_eq!(config.record_count, 64);
    assert_eq!(config.feature_count, 3);
    let params = config.parameters(0).unwrap();
    assert_eq!(params.weights(), &[0.1, 0.2, 0.3]);
    assert_eq!(params.bias(), -0.5);
}

#[test]
fn missing_config_file_is_an_error() {
    let path = temp_file_path("missing");
    assert!(load_config_json(&path).is_err());
}

#[test]
fn speedup_divides_reference_by_parallel() {
    let mut harness = BenchmarkHarness::new(HostParallel { calls: 0 }, ReferenceEngine::new());
    let mut run = harness.run(&small_config()).unwrap();
    run.parallel.report.elapsed = Duration::from_millis(100);
    run.reference.report.elapsed = Duration::from_millis(400);
    assert!((run.speedup() - 4.0).abs() < 1e-9);
}

fn temp_file_path(tag: &str) -> PathBuf {
    let mut path = env::temp_dir();
    let unique = format!(
        "perceptron_bench_{tag}_{}_{}.json",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    );
    path.push(unique);
    path
}
