//! Runs both engines over one generated batch and times each `compute` call.

use std::time::Instant;

use perceptron_core::{
    generator, metrics, BenchmarkConfig, EngineError, ExecutionReport, FeatureBatch,
    ForwardEngine, OutputBatch, ParameterVector,
};
use tracing::{debug, info};

/// Output and timing of one engine over the benchmark batch.
#[derive(Debug, Clone)]
pub struct EngineRun {
    pub report: ExecutionReport,
    pub outputs: OutputBatch,
}

/// Everything one benchmark invocation produced.
///
/// The harness itself never judges agreement; callers use [`BenchmarkRun::agreement`].
#[derive(Debug, Clone)]
pub struct BenchmarkRun {
    pub seed: u64,
    pub batch: FeatureBatch,
    pub params: ParameterVector,
    pub parallel: EngineRun,
    pub reference: EngineRun,
}

impl BenchmarkRun {
    pub fn reports(&self) -> [ExecutionReport; 2] {
        [self.parallel.report, self.reference.report]
    }

    /// Reference time divided by parallel time.
    pub fn speedup(&self) -> f64 {
        let parallel = self.parallel.report.seconds();
        if parallel > 0.0 {
            self.reference.report.seconds() / parallel
        } else {
            f64::INFINITY
        }
    }

    pub fn agreement(&self) -> metrics::Agreement {
        metrics::compare(
            self.parallel.outputs.as_slice(),
            self.reference.outputs.as_slice(),
        )
    }
}

/// Pairs a data-parallel engine with the reference engine it is measured against.
pub struct BenchmarkHarness<P, R> {
    parallel: P,
    reference: R,
}

impl<P: ForwardEngine, R: ForwardEngine> BenchmarkHarness<P, R> {
    pub fn new(parallel: P, reference: R) -> Self {
        Self {
            parallel,
            reference,
        }
    }

    /// Generates the batch described by `config` and runs both engines over it.
    ///
    /// Generation is not part of either measurement.
    pub fn run(&mut self, config: &BenchmarkConfig) -> Result<BenchmarkRun, EngineError> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(generator::random_seed);
        let params = config.parameters(seed)?;
        info!(
            records = config.record_count,
            features = config.feature_count,
            seed,
            "generating benchmark inputs"
        );
        let batch = generator::generate_batch(config.record_count, config.feature_count, seed)?;
        self.run_batch(seed, batch, params)
    }

    /// Runs both engines, one after the other, over an existing batch.
    pub fn run_batch(
        &mut self,
        seed: u64,
        batch: FeatureBatch,
        params: ParameterVector,
    ) -> Result<BenchmarkRun, EngineError> {
        params.check_compatible(&batch)?;
        let parallel = time_engine(&mut self.parallel, &batch, &params)?;
        let reference = time_engine(&mut self.reference, &batch, &params)?;
        Ok(BenchmarkRun {
            seed,
            batch,
            params,
            parallel,
            reference,
        })
    }

    pub fn into_engines(self) -> (P, R) {
        (self.parallel, self.reference)
    }
}

/// Times a single `compute` call.
pub fn time_engine<E: ForwardEngine + ?Sized>(
    engine: &mut E,
    batch: &FeatureBatch,
    params: &ParameterVector,
) -> Result<EngineRun, EngineError> {
    let kind = engine.kind();
    debug!(engine = %kind, "starting timed run");
    let start = Instant::now();
    let outputs = engine.compute(batch, params)?;
    let report = ExecutionReport::new(kind, start.elapsed());
    if outputs.len() != batch.record_count() {
        return Err(EngineError::shape(
            "engine outputs",
            batch.record_count(),
            outputs.len(),
        ));
    }
    info!(engine = %kind, seconds = report.seconds(), "engine finished");
    Ok(EngineRun { report, outputs })
}

/// Wraps an engine failure for the command line, separating a missing or
/// broken device from a failure of one run.
pub fn report_failure(err: EngineError) -> anyhow::Error {
    let headline = if err.is_device_fatal() {
        "GPU path unavailable"
    } else {
        "benchmark run failed"
    };
    anyhow::Error::new(err).context(headline)
}
