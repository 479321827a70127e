//! Error types for the operator catalog

use thiserror::Error;

use crate::kind::OpKind;

/// Errors raised while validating or measuring operators
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Tensors are restricted to rank 3 and 4
    #[error("tensors must have 3 or 4 dimensions, got {ndim}")]
    InvalidRank { ndim: usize },

    /// Wrong number of input tensors for the operator kind
    #[error("{kind} expects {expected} input(s), got {actual}")]
    ArityMismatch {
        kind: OpKind,
        expected: usize,
        actual: usize,
    },

    /// The attribute record does not belong to the operator kind
    #[error("attribute record does not match operator kind {kind}")]
    AttrKindMismatch { kind: OpKind },

    /// Attributes are self-inconsistent (zero stride, empty split, ...)
    #[error("invalid attributes for {kind}: {reason}")]
    InvalidAttrs { kind: OpKind, reason: String },

    /// Input shapes cannot be combined by this operator
    #[error("incompatible inputs for {kind}: {reason}")]
    IncompatibleInputs { kind: OpKind, reason: String },

    /// The cost oracle could not execute the operator
    #[error("measurement failed for {kind}: {reason}")]
    MeasurementFailed { kind: OpKind, reason: String },
}

impl CoreError {
    /// Create an incompatible-inputs error
    pub fn incompatible(kind: OpKind, reason: impl Into<String>) -> Self {
        Self::IncompatibleInputs {
            kind,
            reason: reason.into(),
        }
    }

    /// Create an invalid-attributes error
    pub fn invalid_attrs(kind: OpKind, reason: impl Into<String>) -> Self {
        Self::InvalidAttrs {
            kind,
            reason: reason.into(),
        }
    }
}

/// Convenience alias for catalog results
pub type CoreResult<T> = Result<T, CoreError>;
