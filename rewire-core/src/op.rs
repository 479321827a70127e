//! Operator definitions and instances
//!
//! An [`OpDef`] is an interned, immutable description of an operator: kind,
//! attributes, input and output shapes, and the measured runtime. An [`Op`] is
//! an instance of a definition inside a graph, distinguished by its guid.
//! Many graphs in a search share the same definitions; each graph refers to
//! them through its own `Op` handles.

use std::sync::Arc;

use crate::attrs::OpAttrs;
use crate::error::CoreError;
use crate::guid::Guid;
use crate::kind::{ActiMode, OpKind};
use crate::tensor::TensorDims;

/// Queryable operator parameters.
///
/// Substitution constraints compare these values across matched operators, so
/// every parameter is a pure function of the operator's kind, attributes, and
/// arity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Param {
    OpType,
    NumInputs,
    NumOutputs,
    KernelH,
    KernelW,
    StrideH,
    StrideW,
    PadH,
    PadW,
    ActiMode,
    OutChannels,
}

/// Immutable, interned operator definition.
///
/// Definitions are created through the model catalog, which measures the
/// runtime exactly once per distinct (kind, attrs, input shapes) key.
#[derive(Debug)]
pub struct OpDef {
    pub kind: OpKind,
    pub attrs: OpAttrs,
    /// Expected input shapes, in input-port order
    pub inputs: Vec<TensorDims>,
    /// Produced output shapes, in output-port order
    pub outputs: Vec<TensorDims>,
    /// Measured runtime in milliseconds
    pub runtime_ms: f64,
}

impl OpDef {
    /// Query a parameter value.
    ///
    /// Returns `None` when the parameter is not supported by this kind.
    pub fn parameter(&self, param: Param) -> Option<i64> {
        match param {
            Param::OpType => return Some(self.kind.code()),
            Param::NumInputs => return Some(self.inputs.len() as i64),
            Param::NumOutputs => return Some(self.outputs.len() as i64),
            _ => {}
        }
        match (&self.attrs, param) {
            (OpAttrs::Conv2d(a), Param::KernelH) => Some(a.kernel.0 as i64),
            (OpAttrs::Conv2d(a), Param::KernelW) => Some(a.kernel.1 as i64),
            (OpAttrs::Conv2d(a), Param::StrideH) => Some(a.stride.0 as i64),
            (OpAttrs::Conv2d(a), Param::StrideW) => Some(a.stride.1 as i64),
            (OpAttrs::Conv2d(a), Param::PadH) => Some(a.padding.0 as i64),
            (OpAttrs::Conv2d(a), Param::PadW) => Some(a.padding.1 as i64),
            (OpAttrs::Conv2d(a), Param::ActiMode) => Some(a.acti.code()),
            (OpAttrs::Conv2d(a), Param::OutChannels) => Some(a.out_channels as i64),
            (OpAttrs::Matmul(a), Param::ActiMode) => Some(a.acti.code()),
            (OpAttrs::Matmul(a), Param::OutChannels) => Some(a.out_dim as i64),
            (OpAttrs::Pool2d(a), Param::KernelH) => Some(a.kernel.0 as i64),
            (OpAttrs::Pool2d(a), Param::KernelW) => Some(a.kernel.1 as i64),
            (OpAttrs::Pool2d(a), Param::StrideH) => Some(a.stride.0 as i64),
            (OpAttrs::Pool2d(a), Param::StrideW) => Some(a.stride.1 as i64),
            (OpAttrs::Pool2d(a), Param::PadH) => Some(a.padding.0 as i64),
            (OpAttrs::Pool2d(a), Param::PadW) => Some(a.padding.1 as i64),
            (OpAttrs::Activation(mode), Param::ActiMode) => Some(mode.code()),
            _ => None,
        }
    }

    /// Fused activation mode, if the kind carries one
    pub fn acti(&self) -> Option<ActiMode> {
        match &self.attrs {
            OpAttrs::Conv2d(a) => Some(a.acti),
            OpAttrs::Matmul(a) => Some(a.acti),
            OpAttrs::Activation(mode) => Some(*mode),
            _ => None,
        }
    }
}

/// Number of inputs `kind` consumes, given its attribute record
pub fn expected_arity(kind: OpKind, attrs: &OpAttrs) -> usize {
    match (kind, attrs) {
        (OpKind::Concat, OpAttrs::Concat(a)) => a.num_inputs,
        (OpKind::ElementAdd, _) => 2,
        _ => 1,
    }
}

/// Compute the output shapes produced by `kind` with `attrs` on `inputs`.
///
/// This is the single source of truth for shape semantics: the model catalog
/// calls it when interning a definition, and graph import relies on it to
/// re-derive shapes from serialized structure.
pub fn infer_output_dims(
    kind: OpKind,
    attrs: &OpAttrs,
    inputs: &[TensorDims],
) -> Result<Vec<TensorDims>, CoreError> {
    attrs.validate(kind)?;
    let expected = expected_arity(kind, attrs);
    if inputs.len() != expected {
        return Err(CoreError::ArityMismatch {
            kind,
            expected,
            actual: inputs.len(),
        });
    }

    match (kind, attrs) {
        (OpKind::NoOp, _) | (OpKind::Activation, _) => Ok(vec![inputs[0]]),

        (OpKind::BatchNorm, _) => {
            if inputs[0].ndim() != 4 {
                return Err(CoreError::incompatible(kind, "input must be rank 4"));
            }
            Ok(vec![inputs[0]])
        }

        (OpKind::Conv2d | OpKind::ConvBatch | OpKind::ConvRelu, OpAttrs::Conv2d(a)) => {
            let input = &inputs[0];
            if input.ndim() != 4 {
                return Err(CoreError::incompatible(kind, "input must be rank 4"));
            }
            let (oh, ow) = window_output(
                kind,
                (input.get(2), input.get(3)),
                a.kernel,
                a.stride,
                a.padding,
            )?;
            Ok(vec![TensorDims::d4(input.get(0), a.out_channels, oh, ow)])
        }

        (OpKind::Pool2dMax | OpKind::Pool2dAvg, OpAttrs::Pool2d(a)) => {
            let input = &inputs[0];
            if input.ndim() != 4 {
                return Err(CoreError::incompatible(kind, "input must be rank 4"));
            }
            let (oh, ow) = window_output(
                kind,
                (input.get(2), input.get(3)),
                a.kernel,
                a.stride,
                a.padding,
            )?;
            Ok(vec![TensorDims::d4(input.get(0), input.get(1), oh, ow)])
        }

        (OpKind::Matmul | OpKind::MatmulActi, OpAttrs::Matmul(a)) => {
            let input = &inputs[0];
            if input.ndim() != 3 {
                return Err(CoreError::incompatible(kind, "input must be rank 3"));
            }
            Ok(vec![TensorDims::d3(input.get(0), input.get(1), a.out_dim)])
        }

        (OpKind::Concat, OpAttrs::Concat(_)) => {
            let first = &inputs[0];
            let axis = first.channel_axis();
            let mut channels = 0;
            for input in inputs {
                if input.ndim() != first.ndim() {
                    return Err(CoreError::incompatible(kind, "mixed input ranks"));
                }
                for d in 0..input.ndim() {
                    if d != axis && input.get(d) != first.get(d) {
                        return Err(CoreError::incompatible(
                            kind,
                            format!("non-channel dimension {} differs", d),
                        ));
                    }
                }
                channels += input.channels();
            }
            Ok(vec![first.with_channels(channels)])
        }

        (OpKind::Split, OpAttrs::Split(a)) => {
            let input = &inputs[0];
            let total: usize = a.channels.iter().sum();
            if total != input.channels() {
                return Err(CoreError::incompatible(
                    kind,
                    format!(
                        "split channels sum to {}, input has {}",
                        total,
                        input.channels()
                    ),
                ));
            }
            Ok(a.channels
                .iter()
                .map(|&c| input.with_channels(c))
                .collect())
        }

        (OpKind::ElementAdd, _) => {
            if inputs[0] != inputs[1] {
                return Err(CoreError::incompatible(
                    kind,
                    format!("operand shapes {} and {} differ", inputs[0], inputs[1]),
                ));
            }
            Ok(vec![inputs[0]])
        }

        // attrs.validate(kind) above guarantees the record matches the kind
        _ => Err(CoreError::AttrKindMismatch { kind }),
    }
}

fn window_output(
    kind: OpKind,
    input: (usize, usize),
    kernel: (usize, usize),
    stride: (usize, usize),
    padding: (usize, usize),
) -> Result<(usize, usize), CoreError> {
    let padded_h = input.0 + 2 * padding.0;
    let padded_w = input.1 + 2 * padding.1;
    if padded_h < kernel.0 || padded_w < kernel.1 {
        return Err(CoreError::incompatible(
            kind,
            format!(
                "window {}x{} larger than padded input {}x{}",
                kernel.0, kernel.1, padded_h, padded_w
            ),
        ));
    }
    Ok((
        (padded_h - kernel.0) / stride.0 + 1,
        (padded_w - kernel.1) / stride.1 + 1,
    ))
}

/// An operator instance: a guid plus a shared definition.
///
/// Identity (equality, ordering, hashing) is by guid alone, which makes
/// enumeration order deterministic wherever operators are kept in ordered
/// containers. The definition is shared across every graph that contains the
/// instance.
#[derive(Clone, Debug)]
pub struct Op {
    guid: Guid,
    def: Arc<OpDef>,
}

impl Op {
    /// Create an instance handle; callers normally go through the catalog
    pub fn new(guid: Guid, def: Arc<OpDef>) -> Self {
        Self { guid, def }
    }

    pub fn guid(&self) -> Guid {
        self.guid
    }

    pub fn def(&self) -> &OpDef {
        &self.def
    }

    /// Shared handle to the interned definition
    pub fn def_arc(&self) -> Arc<OpDef> {
        Arc::clone(&self.def)
    }

    pub fn kind(&self) -> OpKind {
        self.def.kind
    }

    /// Query a parameter value on the underlying definition
    pub fn parameter(&self, param: Param) -> Option<i64> {
        self.def.parameter(param)
    }

    pub fn runtime_ms(&self) -> f64 {
        self.def.runtime_ms
    }

    pub fn num_inputs(&self) -> usize {
        self.def.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.def.outputs.len()
    }
}

impl PartialEq for Op {
    fn eq(&self, other: &Self) -> bool {
        self.guid == other.guid
    }
}

impl Eq for Op {}

impl PartialOrd for Op {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Op {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.guid.cmp(&other.guid)
    }
}

impl std::hash::Hash for Op {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.guid.hash(state);
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.def.kind, self.guid)
    }
}
