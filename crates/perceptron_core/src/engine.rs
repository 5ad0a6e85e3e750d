//! Engine abstraction and per-run timing reports.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{EngineError, FeatureBatch, OutputBatch, ParameterVector};

/// Identity of the backend that produced an [`OutputBatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Data-parallel compute device.
    Parallel,
    /// Sequential host loop used as the correctness oracle.
    Reference,
}

impl EngineKind {
    pub fn label(self) -> &'static str {
        match self {
            EngineKind::Parallel => "GPU",
            EngineKind::Reference => "CPU",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A backend able to run the single-layer forward pass over a whole batch.
///
/// `compute` takes `&mut self` so an engine never serves two batches at once;
/// any scratch state it owns belongs to the current call.
pub trait ForwardEngine {
    fn kind(&self) -> EngineKind;

    fn compute(
        &mut self,
        batch: &FeatureBatch,
        params: &ParameterVector,
    ) -> Result<OutputBatch, EngineError>;
}

impl<E: ForwardEngine + ?Sized> ForwardEngine for Box<E> {
    fn kind(&self) -> EngineKind {
        (**self).kind()
    }

    fn compute(
        &mut self,
        batch: &FeatureBatch,
        params: &ParameterVector,
    ) -> Result<OutputBatch, EngineError> {
        (**self).compute(batch, params)
    }
}

/// Wall-clock time spent inside one engine's `compute` call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub engine: EngineKind,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl ExecutionReport {
    pub fn new(engine: EngineKind, elapsed: Duration) -> Self {
        Self { engine, elapsed }
    }

    pub fn seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

impl fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Execution Time: {} seconds", self.engine, self.seconds())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
