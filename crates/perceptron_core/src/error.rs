//! Failure taxonomy shared by every forward-pass engine.

use thiserror::Error;

/// Errors that abort an engine run. None of them are retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// No compatible adapter, device or queue could be created.
    #[error("compute device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The named kernel entry point is missing or its pipeline failed to build.
    #[error("failed to resolve kernel '{entry_point}': {reason}")]
    KernelResolution {
        entry_point: String,
        reason: String,
    },

    /// A staging, output or readback buffer could not be allocated, or the
    /// dispatch grid cannot cover the batch.
    #[error("failed to allocate '{label}' ({bytes} bytes): {reason}")]
    Allocation {
        label: String,
        bytes: u64,
        reason: String,
    },

    /// A buffer or slice does not have the length its role requires.
    #[error("{what}: expected {expected} values, got {actual}")]
    Shape {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The result buffer could not be mapped back to host memory.
    #[error("failed to read back results: {0}")]
    Readback(String),
}

impl EngineError {
    pub fn shape(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::Shape {
            what,
            expected,
            actual,
        }
    }

    /// True for conditions that make the device path unusable for every run,
    /// as opposed to failures tied to one batch.
    pub fn is_device_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::DeviceUnavailable(_) | EngineError::KernelResolution { .. }
        )
    }
}
