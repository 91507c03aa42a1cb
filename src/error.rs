//! Error taxonomy for the spmm surface.
//!
//! Every fallible entry point validates its inputs before allocating
//! outputs or touching a kernel; on failure the whole call aborts with one
//! of the variants below and nothing is published to the caller.

use crate::backend::Device;
use thiserror::Error;

/// Result type alias using the crate's error.
pub type Result<T> = std::result::Result<T, SpmmError>;

/// Errors reported at the call boundary.
#[derive(Error, Debug)]
pub enum SpmmError {
    /// An input resides outside the CPU execution domain.
    #[error("device mismatch: `{tensor}` resides on {found:?}, kernels only run on the CPU")]
    DeviceMismatch {
        /// Name of the offending input.
        tensor: &'static str,
        /// Where that input reports residing.
        found: Device,
    },

    /// An input's dimensionality or batch arithmetic is off.
    #[error("shape mismatch: `{tensor}` {reason}")]
    ShapeMismatch {
        /// Name of the offending input.
        tensor: &'static str,
        /// What was expected of it.
        reason: String,
    },

    /// The reduction selector is not one of the recognized tokens.
    #[error(r#"unknown reduction {0:?} (expected "sum", "add", "mean", "min" or "max")"#)]
    UnknownReduction(String),
}
