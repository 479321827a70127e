//! Operator kind tags and activation modes
//!
//! The operator vocabulary is a closed set: pattern matching and the cost
//! model both dispatch on these tags, so no open extension point is needed.

use serde::{Deserialize, Serialize};

/// The closed set of operator kinds.
///
/// `ConvBatch`, `ConvRelu` and `MatmulActi` are fused variants: graph builders
/// never produce them directly, they only arise from rewrites.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OpKind {
    /// Identity pass-through; also used for graph input nodes
    NoOp,
    /// 2D convolution
    Conv2d,
    /// Convolution with a folded batch-normalization
    ConvBatch,
    /// Convolution with a fused ReLU
    ConvRelu,
    /// Matrix multiplication over a rank-3 input
    Matmul,
    /// Matrix multiplication with a fused activation
    MatmulActi,
    /// 2D max pooling
    Pool2dMax,
    /// 2D average pooling
    Pool2dAvg,
    /// Element-wise activation function
    Activation,
    /// Batch normalization
    BatchNorm,
    /// Channel-dimension concatenation
    Concat,
    /// Channel-dimension split
    Split,
    /// Element-wise addition of two tensors
    ElementAdd,
}

impl OpKind {
    /// Stable integer code, exposed through the `OpType` parameter query
    pub const fn code(self) -> i64 {
        match self {
            OpKind::NoOp => 0,
            OpKind::Conv2d => 1,
            OpKind::ConvBatch => 2,
            OpKind::ConvRelu => 3,
            OpKind::Matmul => 4,
            OpKind::MatmulActi => 5,
            OpKind::Pool2dMax => 6,
            OpKind::Pool2dAvg => 7,
            OpKind::Activation => 8,
            OpKind::BatchNorm => 9,
            OpKind::Concat => 10,
            OpKind::Split => 11,
            OpKind::ElementAdd => 12,
        }
    }
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OpKind::NoOp => "NoOp",
            OpKind::Conv2d => "Conv2d",
            OpKind::ConvBatch => "ConvBatch",
            OpKind::ConvRelu => "ConvRelu",
            OpKind::Matmul => "Matmul",
            OpKind::MatmulActi => "MatmulActi",
            OpKind::Pool2dMax => "Pool2dMax",
            OpKind::Pool2dAvg => "Pool2dAvg",
            OpKind::Activation => "Activation",
            OpKind::BatchNorm => "BatchNorm",
            OpKind::Concat => "Concat",
            OpKind::Split => "Split",
            OpKind::ElementAdd => "ElementAdd",
        };
        write!(f, "{}", name)
    }
}

/// Activation mode carried by convolution, matmul, and activation operators
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActiMode {
    /// No activation
    None,
    Relu,
    Sigmoid,
    Tanh,
}

impl ActiMode {
    /// Stable integer code, exposed through the `ActiMode` parameter query
    pub const fn code(self) -> i64 {
        match self {
            ActiMode::None => 0,
            ActiMode::Relu => 1,
            ActiMode::Sigmoid => 2,
            ActiMode::Tanh => 3,
        }
    }

    /// Inverse of [`ActiMode::code`]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ActiMode::None),
            1 => Some(ActiMode::Relu),
            2 => Some(ActiMode::Sigmoid),
            3 => Some(ActiMode::Tanh),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes_are_distinct() {
        let kinds = [
            OpKind::NoOp,
            OpKind::Conv2d,
            OpKind::ConvBatch,
            OpKind::ConvRelu,
            OpKind::Matmul,
            OpKind::MatmulActi,
            OpKind::Pool2dMax,
            OpKind::Pool2dAvg,
            OpKind::Activation,
            OpKind::BatchNorm,
            OpKind::Concat,
            OpKind::Split,
            OpKind::ElementAdd,
        ];
        let mut codes: Vec<i64> = kinds.iter().map(|k| k.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_acti_mode_code_roundtrip() {
        for mode in [
            ActiMode::None,
            ActiMode::Relu,
            ActiMode::Sigmoid,
            ActiMode::Tanh,
        ] {
            assert_eq!(ActiMode::from_code(mode.code()), Some(mode));
        }
        assert_eq!(ActiMode::from_code(99), None);
    }
}
