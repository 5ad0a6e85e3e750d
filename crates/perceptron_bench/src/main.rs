//! Command-line shell: runs the forward pass on the GPU and on the CPU and
//! prints how long each took.

use std::{env, path::PathBuf};

use anyhow::{bail, Context, Result};
use perceptron_bench::{
    export_summary_json, load_config_json, report_failure, BenchmarkHarness, BenchmarkRun,
    BenchmarkSummary,
};
use perceptron_core::{BenchmarkConfig, ReferenceEngine, Scalar};
use perceptron_gpu::ParallelEngine;
use tracer::init_tracing;
use tracing::info;

#[derive(Default)]
struct CliOptions {
    config_json: Option<PathBuf>,
    export_json: Option<PathBuf>,
    records: Option<usize>,
    features: Option<usize>,
    weights: Option<Vec<Scalar>>,
    bias: Option<Scalar>,
    seed: Option<u64>,
    tolerance: Option<Scalar>,
    show: usize,
}

fn main() -> Result<()> {
    init_tracing();

    let options = parse_options()?;
    let config = build_config(&options)?;

    let parallel = ParallelEngine::new().map_err(report_failure)?;
    let adapter = parallel.context().adapter_info();
    info!(adapter = %adapter.name, backend = ?adapter.backend, "benchmarking forward pass");
    let mut harness = BenchmarkHarness::new(parallel, ReferenceEngine::new());
    let run = harness.run(&config).map_err(report_failure)?;

    print_samples(&run, options.show);
    for report in run.reports() {
        println!("{report}");
    }
    println!("Speedup (CPU / GPU): {:.2}x", run.speedup());

    let agreement = run.agreement();
    println!(
        "Agreement over {} records: max |Δ|={:.3e}, max rel={:.3e}, worst index={:?}",
        agreement.compared, agreement.max_abs_error, agreement.max_rel_error, agreement.worst_index
    );

    if let Some(ref path) = options.export_json {
        let summary = BenchmarkSummary::from_run(&config, &run);
        export_summary_json(&summary, path)?;
        println!("Exported summary to {}", path.display());
    }

    if !agreement.within(config.tolerance) {
        bail!(
            "GPU results diverged beyond tolerance {} (max |Δ|={:.3e})",
            config.tolerance,
            agreement.max_abs_error
        );
    }

    Ok(())
}

fn parse_options() -> Result<CliOptions> {
    let mut opts = CliOptions::default();

    for arg in env::args().skip(1) {
        if let Some(value) = arg.strip_prefix("--records=") {
            opts.records = Some(value.parse().context("invalid --records value")?);
        } else if let Some(value) = arg.strip_prefix("--features=") {
            opts.features = Some(value.parse().context("invalid --features value")?);
        } else if let Some(value) = arg.strip_prefix("--weights=") {
            opts.weights = Some(parse_weights(value).context("invalid --weights value")?);
        } else if let Some(value) = arg.strip_prefix("--bias=") {
            opts.bias = Some(value.parse().context("invalid --bias value")?);
        } else if let Some(value) = arg.strip_prefix("--seed=") {
            opts.seed = Some(parse_seed(value).context("invalid --seed value")?);
        } else if let Some(value) = arg.strip_prefix("--tolerance=") {
            opts.tolerance = Some(value.parse().context("invalid --tolerance value")?);
        } else if let Some(value) = arg.strip_prefix("--show=") {
            opts.show = value.parse().context("invalid --show value")?;
        } else if let Some(value) = arg.strip_prefix("--config=") {
            opts.config_json = Some(PathBuf::from(value));
        } else if let Some(value) = arg.strip_prefix("--export-json=") {
            opts.export_json = Some(PathBuf::from(value));
        } else {
            bail!("unrecognized argument: {arg}");
        }
    }

    Ok(opts)
}

/// Config file first, then command-line overrides.
fn build_config(options: &CliOptions) -> Result<BenchmarkConfig> {
    let mut config = match options.config_json {
        Some(ref path) => load_config_json(path)?,
        None => BenchmarkConfig::default(),
    };
    if let Some(records) = options.records {
        config.record_count = records;
    }
    if let Some(ref weights) = options.weights {
        config.feature_count = weights.len();
        config.weights = Some(weights.clone());
    }
    if let Some(features) = options.features {
        config.feature_count = features;
    }
    if let Some(bias) = options.bias {
        config.bias = Some(bias);
    }
    if let Some(seed) = options.seed {
        config.seed = Some(seed);
    }
    if let Some(tolerance) = options.tolerance {
        config.tolerance = tolerance;
    }
    config.validate().context("invalid benchmark configuration")?;
    Ok(config)
}

fn print_samples(run: &BenchmarkRun, count: usize) {
    let gpu = run.parallel.outputs.as_slice();
    let cpu = run.reference.outputs.as_slice();
    for (i, (g, c)) in gpu.iter().zip(cpu).take(count).enumerate() {
        let input = run.batch.record(i).unwrap_or_default();
        println!("Input[{i}] = {input:?}, GPU Output[{i}] = {g}, CPU Output[{i}] = {c}");
    }
}

fn parse_weights(value: &str) -> Result<Vec<Scalar>> {
    value
        .split(',')
        .map(|w| w.trim().parse::<Scalar>().context("expected a float"))
        .collect()
}

fn parse_seed(value: &str) -> Result<u64> {
    if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).context("expected hex literal")
    } else {
        value.parse().context("expected integer seed")
    }
}

mod tracer {
    use tracing_subscriber::EnvFilter;

    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }
}
