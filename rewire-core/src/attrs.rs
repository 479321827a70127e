//! Kind-specific operator attribute records
//!
//! Attributes are the semantic payload of an operator: together with the kind
//! tag and the input shapes they fully determine the output shapes and the
//! measurement key used by the cost oracle. All attribute values are integers
//! or closed enums so records can be hashed and compared exactly.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::kind::{ActiMode, OpKind};

/// Attributes of the convolution family (`Conv2d`, `ConvBatch`, `ConvRelu`)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Conv2dAttrs {
    /// Number of output channels
    pub out_channels: usize,
    /// Kernel size (height, width)
    pub kernel: (usize, usize),
    /// Stride (height, width)
    pub stride: (usize, usize),
    /// Zero padding (height, width)
    pub padding: (usize, usize),
    /// Fused activation applied to the output
    pub acti: ActiMode,
}

/// Attributes of the matmul family (`Matmul`, `MatmulActi`)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatmulAttrs {
    /// Output channel count (the last dimension of the rank-3 result)
    pub out_dim: usize,
    /// Fused activation applied to the output
    pub acti: ActiMode,
}

/// Attributes of the pooling family (`Pool2dMax`, `Pool2dAvg`)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pool2dAttrs {
    /// Window size (height, width)
    pub kernel: (usize, usize),
    /// Stride (height, width)
    pub stride: (usize, usize),
    /// Zero padding (height, width)
    pub padding: (usize, usize),
}

/// Attributes of `Concat`
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConcatAttrs {
    /// Number of tensors joined along the channel dimension
    pub num_inputs: usize,
}

/// Attributes of `Split`
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SplitAttrs {
    /// Channel count of each output, in output-port order
    pub channels: Vec<usize>,
}

/// Tagged attribute record; the tag must agree with the operator kind.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpAttrs {
    /// Kinds with no attributes: `NoOp`, `BatchNorm`, `ElementAdd`
    None,
    Conv2d(Conv2dAttrs),
    Matmul(MatmulAttrs),
    Pool2d(Pool2dAttrs),
    Activation(ActiMode),
    Concat(ConcatAttrs),
    Split(SplitAttrs),
}

impl OpAttrs {
    /// Check that this record is the right shape for `kind`
    pub fn matches_kind(&self, kind: OpKind) -> bool {
        matches!(
            (kind, self),
            (OpKind::NoOp, OpAttrs::None)
                | (OpKind::BatchNorm, OpAttrs::None)
                | (OpKind::ElementAdd, OpAttrs::None)
                | (OpKind::Conv2d, OpAttrs::Conv2d(_))
                | (OpKind::ConvBatch, OpAttrs::Conv2d(_))
                | (OpKind::ConvRelu, OpAttrs::Conv2d(_))
                | (OpKind::Matmul, OpAttrs::Matmul(_))
                | (OpKind::MatmulActi, OpAttrs::Matmul(_))
                | (OpKind::Pool2dMax, OpAttrs::Pool2d(_))
                | (OpKind::Pool2dAvg, OpAttrs::Pool2d(_))
                | (OpKind::Activation, OpAttrs::Activation(_))
                | (OpKind::Concat, OpAttrs::Concat(_))
                | (OpKind::Split, OpAttrs::Split(_))
        )
    }

    /// Validate internal consistency (strides, window sizes, arity)
    pub fn validate(&self, kind: OpKind) -> Result<(), CoreError> {
        if !self.matches_kind(kind) {
            return Err(CoreError::AttrKindMismatch { kind });
        }
        match self {
            OpAttrs::Conv2d(a) => {
                if a.out_channels == 0 {
                    return Err(CoreError::invalid_attrs(kind, "zero output channels"));
                }
                if a.kernel.0 == 0 || a.kernel.1 == 0 {
                    return Err(CoreError::invalid_attrs(kind, "zero kernel size"));
                }
                if a.stride.0 == 0 || a.stride.1 == 0 {
                    return Err(CoreError::invalid_attrs(kind, "zero stride"));
                }
            }
            OpAttrs::Matmul(a) => {
                if a.out_dim == 0 {
                    return Err(CoreError::invalid_attrs(kind, "zero output dimension"));
                }
            }
            OpAttrs::Pool2d(a) => {
                if a.kernel.0 == 0 || a.kernel.1 == 0 {
                    return Err(CoreError::invalid_attrs(kind, "zero window size"));
                }
                if a.stride.0 == 0 || a.stride.1 == 0 {
                    return Err(CoreError::invalid_attrs(kind, "zero stride"));
                }
            }
            OpAttrs::Concat(a) => {
                if a.num_inputs < 2 {
                    return Err(CoreError::invalid_attrs(kind, "fewer than two inputs"));
                }
            }
            OpAttrs::Split(a) => {
                if a.channels.len() < 2 {
                    return Err(CoreError::invalid_attrs(kind, "fewer than two outputs"));
                }
                if a.channels.iter().any(|&c| c == 0) {
                    return Err(CoreError::invalid_attrs(kind, "zero-channel output"));
                }
            }
            OpAttrs::None | OpAttrs::Activation(_) => {}
        }
        Ok(())
    }
}
