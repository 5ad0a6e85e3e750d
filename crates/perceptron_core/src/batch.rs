//! Batch containers shared between the host engines and the device staging code.
//!
//! All three containers keep their values in one contiguous `Vec<Scalar>` so the
//! device path can upload them without repacking.

use crate::{
    generator::{DEFAULT_BIAS, DEFAULT_WEIGHTS},
    EngineError, Scalar,
};

/// `N` records of `F` features each, stored row-major (`N×F` values).
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBatch {
    feature_count: usize,
    values: Vec<Scalar>,
}

impl FeatureBatch {
    /// Wraps row-major `values`; the length must be a non-zero multiple of `feature_count`.
    pub fn new(feature_count: usize, values: Vec<Scalar>) -> Result<Self, EngineError> {
        if feature_count == 0 {
            return Err(EngineError::shape("feature count", 1, 0));
        }
        if values.is_empty() || values.len() % feature_count != 0 {
            let records = values.len() / feature_count;
            return Err(EngineError::shape(
                "feature batch",
                (records.max(1)) * feature_count,
                values.len(),
            ));
        }
        Ok(Self {
            feature_count,
            values,
        })
    }

    /// Builds a batch from per-record rows, all of which must have the same length.
    pub fn from_records<R: AsRef<[Scalar]>>(records: &[R]) -> Result<Self, EngineError> {
        let feature_count = records.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut values = Vec::with_capacity(records.len() * feature_count);
        for record in records {
            let record = record.as_ref();
            if record.len() != feature_count {
                return Err(EngineError::shape("record", feature_count, record.len()));
            }
            values.extend_from_slice(record);
        }
        Self::new(feature_count, values)
    }

    pub fn record_count(&self) -> usize {
        self.values.len() / self.feature_count
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    /// Row `index`, or `None` past the last record.
    pub fn record(&self, index: usize) -> Option<&[Scalar]> {
        let start = index.checked_mul(self.feature_count)?;
        self.values.get(start..start.checked_add(self.feature_count)?)
    }

    pub fn records(&self) -> impl ExactSizeIterator<Item = &[Scalar]> + '_ {
        self.values.chunks_exact(self.feature_count)
    }

    /// Flat row-major view, `record_count() * feature_count()` long.
    pub fn as_slice(&self) -> &[Scalar] {
        &self.values
    }
}

/// Per-feature weights and the scalar bias of the affine transform.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterVector {
    weights: Vec<Scalar>,
    bias: Scalar,
}

impl ParameterVector {
    pub fn new(weights: Vec<Scalar>, bias: Scalar) -> Result<Self, EngineError> {
        if weights.is_empty() {
            return Err(EngineError::shape("weights", 1, 0));
        }
        Ok(Self { weights, bias })
    }

    pub fn weights(&self) -> &[Scalar] {
        &self.weights
    }

    pub fn bias(&self) -> Scalar {
        self.bias
    }

    pub fn feature_count(&self) -> usize {
        self.weights.len()
    }

    /// Fails unless the weights line up with the batch's feature count.
    pub fn check_compatible(&self, batch: &FeatureBatch) -> Result<(), EngineError> {
        if self.weights.len() != batch.feature_count() {
            return Err(EngineError::shape(
                "weights",
                batch.feature_count(),
                self.weights.len(),
            ));
        }
        Ok(())
    }
}

impl Default for ParameterVector {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS.to_vec(),
            bias: DEFAULT_BIAS,
        }
    }
}

/// One activation per input record, index-aligned with the [`FeatureBatch`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputBatch {
    values: Vec<Scalar>,
}

impl OutputBatch {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[Scalar] {
        &self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Scalar> {
        self.values.iter()
    }
}

impl From<Vec<Scalar>> for OutputBatch {
    fn from(values: Vec<Scalar>) -> Self {
        Self { values }
    }
}

impl std::ops::Index<usize> for OutputBatch {
    type Output = Scalar;

    fn index(&self, index: usize) -> &Scalar {
        &self.values[index]
    }
}
