//! Tensor shape descriptors
//!
//! Tensors in Rewire are descriptors, not data: a shape plus the identity of
//! the operator output that produces it. The optimizer never touches tensor
//! contents.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::op::Op;

/// Maximum number of tensor dimensions
pub const MAX_DIMS: usize = 4;

/// The shape of a tensor: 3 or 4 dimensions with per-dimension sizes.
///
/// 4-dimensional tensors are laid out NCHW (batch, channels, height, width);
/// 3-dimensional tensors are (sequence, batch, channels) as produced by
/// matrix-multiplication operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorDims {
    ndim: usize,
    dim: [usize; MAX_DIMS],
}

impl TensorDims {
    /// Create a shape from a slice of dimension sizes.
    ///
    /// Only rank-3 and rank-4 tensors are supported.
    pub fn new(dims: &[usize]) -> Result<Self, CoreError> {
        if dims.len() < 3 || dims.len() > MAX_DIMS {
            return Err(CoreError::InvalidRank { ndim: dims.len() });
        }
        let mut dim = [0; MAX_DIMS];
        dim[..dims.len()].copy_from_slice(dims);
        Ok(Self {
            ndim: dims.len(),
            dim,
        })
    }

    /// Create a rank-3 shape (sequence, batch, channels)
    pub const fn d3(x: usize, n: usize, c: usize) -> Self {
        Self {
            ndim: 3,
            dim: [x, n, c, 0],
        }
    }

    /// Create a rank-4 shape (batch, channels, height, width)
    pub const fn d4(n: usize, c: usize, h: usize, w: usize) -> Self {
        Self {
            ndim: 4,
            dim: [n, c, h, w],
        }
    }

    /// Number of dimensions (3 or 4)
    pub const fn ndim(&self) -> usize {
        self.ndim
    }

    /// Dimension sizes as a slice
    pub fn as_slice(&self) -> &[usize] {
        &self.dim[..self.ndim]
    }

    /// Size of dimension `index`
    pub fn get(&self, index: usize) -> usize {
        self.dim[index]
    }

    /// Total number of elements
    pub fn volume(&self) -> usize {
        self.as_slice().iter().product()
    }

    /// Index of the channel dimension: dim 1 for NCHW, the last dim for rank 3
    pub const fn channel_axis(&self) -> usize {
        if self.ndim == 4 {
            1
        } else {
            2
        }
    }

    /// Size of the channel dimension
    pub fn channels(&self) -> usize {
        self.dim[self.channel_axis()]
    }

    /// A copy of this shape with the channel dimension replaced
    pub fn with_channels(&self, channels: usize) -> Self {
        let mut out = *self;
        out.dim[out.channel_axis()] = channels;
        out
    }
}

impl std::fmt::Display for TensorDims {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for d in self.as_slice() {
            if !first {
                write!(f, "x")?;
            }
            write!(f, "{}", d)?;
            first = false;
        }
        Ok(())
    }
}

/// An output-port descriptor: a shape, the producing operator, and the index
/// of the output port that carries it.
///
/// Two tensors are equal iff all three fields match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tensor {
    /// Shape of the value carried on this port
    pub dims: TensorDims,
    /// Operator that produces the value
    pub op: Op,
    /// Output-port index on the producing operator
    pub idx: usize,
}
