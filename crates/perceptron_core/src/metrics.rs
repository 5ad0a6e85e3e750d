//! Numeric helpers for comparing engine outputs.

use serde::{Deserialize, Serialize};

use crate::Scalar;

/// Computes a simple checksum over activations, accumulated in `f64`.
pub fn checksum(values: &[Scalar]) -> f64 {
    values.iter().map(|&v| f64::from(v)).sum()
}

/// Worst-case disagreement between two index-aligned output batches.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Agreement {
    pub compared: usize,
    pub max_abs_error: Scalar,
    pub max_rel_error: Scalar,
    /// Record index of the largest absolute error, if any record differs.
    pub worst_index: Option<usize>,
    /// Number of entries that are NaN or infinite in either batch.
    pub non_finite: usize,
}

impl Agreement {
    /// True when every compared value is finite and differs by at most
    /// `tolerance`, absolutely or relative to the reference value.
    pub fn within(&self, tolerance: Scalar) -> bool {
        self.non_finite == 0
            && (self.max_abs_error <= tolerance || self.max_rel_error <= tolerance)
    }
}

/// Compares `candidate` against `reference` element by element.
///
/// Only the common prefix is compared; callers check lengths separately.
pub fn compare(candidate: &[Scalar], reference: &[Scalar]) -> Agreement {
    let mut agreement = Agreement {
        compared: candidate.len().min(reference.len()),
        ..Default::default()
    };
    for (idx, (&c, &r)) in candidate.iter().zip(reference).enumerate() {
        if !c.is_finite() || !r.is_finite() {
            agreement.non_finite += 1;
            continue;
        }
        let abs = (c - r).abs();
        if abs > agreement.max_abs_error {
            agreement.max_abs_error = abs;
            agreement.worst_index = Some(idx);
        }
        let rel = abs / r.abs().max(Scalar::MIN_POSITIVE);
        agreement.max_rel_error = agreement.max_rel_error.max(rel);
    }
    agreement
}
