//! The standard substitution library
//!
//! Each function declares one rewrite rule through the [`XferBuilder`] API:
//! fusions that fold adjacent operators into a single kernel, merges that
//! batch parallel operators sharing an input, and the split/concat
//! cancellation. [`standard_xfers`] returns the full set in registration
//! order.

use rewire_core::{
    ActiMode, Conv2dAttrs, CoreError, MatmulAttrs, OpAttrs, OpKind, Param, SplitAttrs,
};
use rewire_graph::{GraphError, Model};

use crate::error::SearchResult;
use crate::matcher::Binding;
use crate::xfer::{Compare, Xfer, XferBuilder};

/// All standard substitutions, in registration order
pub fn standard_xfers() -> SearchResult<Vec<Xfer>> {
    Ok(vec![
        fuse_conv_batch()?,
        fuse_conv_batch_acti()?,
        fuse_conv_relu()?,
        fuse_mm_acti()?,
        merge_matmul()?,
        merge_conv()?,
        exclusive_concat()?,
    ])
}

fn conv_attrs(binding: &Binding, index: usize) -> Result<Conv2dAttrs, GraphError> {
    match &binding.op(index).def().attrs {
        OpAttrs::Conv2d(attrs) => Ok(attrs.clone()),
        _ => Err(GraphError::Core(CoreError::AttrKindMismatch {
            kind: binding.op(index).kind(),
        })),
    }
}

fn matmul_attrs(binding: &Binding, index: usize) -> Result<MatmulAttrs, GraphError> {
    match &binding.op(index).def().attrs {
        OpAttrs::Matmul(attrs) => Ok(attrs.clone()),
        _ => Err(GraphError::Core(CoreError::AttrKindMismatch {
            kind: binding.op(index).kind(),
        })),
    }
}

fn acti_mode(binding: &Binding, index: usize) -> Result<ActiMode, GraphError> {
    binding
        .param(index, Param::ActiMode)
        .and_then(ActiMode::from_code)
        .ok_or(GraphError::Core(CoreError::AttrKindMismatch {
            kind: binding.op(index).kind(),
        }))
}

/// Fold a batch-normalization into the preceding convolution.
///
/// `Conv2d -> BatchNorm  =>  ConvBatch`
pub fn fuse_conv_batch() -> SearchResult<Xfer> {
    let mut b = XferBuilder::new("fuse_conv_batch");
    let conv = b.src_op(OpKind::Conv2d);
    let bn = b.src_op(OpKind::BatchNorm);
    b.src_edge(conv, 0, bn, 0);

    let fused = b.dst_op(OpKind::ConvBatch, move |m, model| {
        let attrs = conv_attrs(m, conv)?;
        model.get_or_create(
            OpKind::ConvBatch,
            OpAttrs::Conv2d(attrs),
            m.op(conv).def().inputs.clone(),
        )
    });
    b.map_input(conv, fused);
    b.map_output(bn, fused, 0);
    b.build()
}

/// Fuse an activation into a folded conv+batchnorm kernel.
///
/// `ConvBatch(acti=None) -> Activation  =>  ConvBatch(acti)`
pub fn fuse_conv_batch_acti() -> SearchResult<Xfer> {
    let mut b = XferBuilder::new("fuse_conv_batch_acti");
    let conv = b.src_op(OpKind::ConvBatch);
    b.src_constraint(conv, Param::ActiMode, Compare::Eq, ActiMode::None.code());
    let act = b.src_op(OpKind::Activation);
    b.src_edge(conv, 0, act, 0);

    let fused = b.dst_op(OpKind::ConvBatch, move |m, model| {
        let mut attrs = conv_attrs(m, conv)?;
        attrs.acti = acti_mode(m, act)?;
        model.get_or_create(
            OpKind::ConvBatch,
            OpAttrs::Conv2d(attrs),
            m.op(conv).def().inputs.clone(),
        )
    });
    b.map_input(conv, fused);
    b.map_output(act, fused, 0);
    b.build()
}

/// Fuse a ReLU into the preceding convolution.
///
/// `Conv2d(acti=None) -> Activation(Relu)  =>  ConvRelu`
pub fn fuse_conv_relu() -> SearchResult<Xfer> {
    let mut b = XferBuilder::new("fuse_conv_relu");
    let conv = b.src_op(OpKind::Conv2d);
    b.src_constraint(conv, Param::ActiMode, Compare::Eq, ActiMode::None.code());
    let act = b.src_op(OpKind::Activation);
    b.src_constraint(act, Param::ActiMode, Compare::Eq, ActiMode::Relu.code());
    b.src_edge(conv, 0, act, 0);

    let fused = b.dst_op(OpKind::ConvRelu, move |m, model| {
        let mut attrs = conv_attrs(m, conv)?;
        attrs.acti = ActiMode::Relu;
        model.get_or_create(
            OpKind::ConvRelu,
            OpAttrs::Conv2d(attrs),
            m.op(conv).def().inputs.clone(),
        )
    });
    b.map_input(conv, fused);
    b.map_output(act, fused, 0);
    b.build()
}

/// Fuse any activation into the preceding matmul.
///
/// `Matmul(acti=None) -> Activation  =>  MatmulActi`
pub fn fuse_mm_acti() -> SearchResult<Xfer> {
    let mut b = XferBuilder::new("fuse_mm_acti");
    let mm = b.src_op(OpKind::Matmul);
    b.src_constraint(mm, Param::ActiMode, Compare::Eq, ActiMode::None.code());
    let act = b.src_op(OpKind::Activation);
    b.src_edge(mm, 0, act, 0);

    let fused = b.dst_op(OpKind::MatmulActi, move |m, model| {
        let mut attrs = matmul_attrs(m, mm)?;
        attrs.acti = acti_mode(m, act)?;
        model.get_or_create(
            OpKind::MatmulActi,
            OpAttrs::Matmul(attrs),
            m.op(mm).def().inputs.clone(),
        )
    });
    b.map_input(mm, fused);
    b.map_output(act, fused, 0);
    b.build()
}

/// Merge two matmuls that consume the same tensor into one wider matmul
/// followed by a split. The shared producer stays in place.
pub fn merge_matmul() -> SearchResult<Xfer> {
    let mut b = XferBuilder::new("merge_matmul");
    let prod = b.src_any();
    b.src_constraint(prod, Param::NumOutputs, Compare::Eq, 1);
    let mm1 = b.src_op(OpKind::Matmul);
    let mm2 = b.src_op(OpKind::Matmul);
    b.src_edge(prod, 0, mm1, 0);
    b.src_edge(prod, 0, mm2, 0);
    b.pair_constraint(mm1, Param::ActiMode, Compare::Eq, mm2, Param::ActiMode);

    let keep = b.dst_reuse(prod);
    let merged = b.dst_op(OpKind::Matmul, move |m, model| {
        let first = matmul_attrs(m, mm1)?;
        let second = matmul_attrs(m, mm2)?;
        model.get_or_create(
            OpKind::Matmul,
            OpAttrs::Matmul(MatmulAttrs {
                out_dim: first.out_dim + second.out_dim,
                acti: first.acti,
            }),
            m.op(mm1).def().inputs.clone(),
        )
    });
    let split = b.dst_op(OpKind::Split, move |m, model| {
        let first = matmul_attrs(m, mm1)?;
        let second = matmul_attrs(m, mm2)?;
        let merged_out = m.op(mm1).def().outputs[0].with_channels(first.out_dim + second.out_dim);
        model.get_or_create(
            OpKind::Split,
            OpAttrs::Split(SplitAttrs {
                channels: vec![first.out_dim, second.out_dim],
            }),
            vec![merged_out],
        )
    });
    b.dst_edge(keep, 0, merged, 0);
    b.dst_edge(merged, 0, split, 0);
    b.map_input(prod, keep);
    b.map_output(prod, keep, 0);
    b.map_output(mm1, split, 0);
    b.map_output(mm2, split, 1);
    b.build()
}

/// Merge two convolutions with identical geometry that consume the same
/// tensor into one wider convolution followed by a split.
pub fn merge_conv() -> SearchResult<Xfer> {
    let mut b = XferBuilder::new("merge_conv");
    let prod = b.src_any();
    b.src_constraint(prod, Param::NumOutputs, Compare::Eq, 1);
    let conv1 = b.src_op(OpKind::Conv2d);
    let conv2 = b.src_op(OpKind::Conv2d);
    b.src_edge(prod, 0, conv1, 0);
    b.src_edge(prod, 0, conv2, 0);
    for param in [
        Param::KernelH,
        Param::KernelW,
        Param::StrideH,
        Param::StrideW,
        Param::PadH,
        Param::PadW,
        Param::ActiMode,
    ] {
        b.pair_constraint(conv1, param, Compare::Eq, conv2, param);
    }

    let keep = b.dst_reuse(prod);
    let merged = b.dst_op(OpKind::Conv2d, move |m, model| {
        let first = conv_attrs(m, conv1)?;
        let second = conv_attrs(m, conv2)?;
        let mut attrs = first.clone();
        attrs.out_channels = first.out_channels + second.out_channels;
        model.get_or_create(
            OpKind::Conv2d,
            OpAttrs::Conv2d(attrs),
            m.op(conv1).def().inputs.clone(),
        )
    });
    let split = b.dst_op(OpKind::Split, move |m, model| {
        let first = conv_attrs(m, conv1)?;
        let second = conv_attrs(m, conv2)?;
        let merged_out = m.op(conv1).def().outputs[0]
            .with_channels(first.out_channels + second.out_channels);
        model.get_or_create(
            OpKind::Split,
            OpAttrs::Split(SplitAttrs {
                channels: vec![first.out_channels, second.out_channels],
            }),
            vec![merged_out],
        )
    });
    b.dst_edge(keep, 0, merged, 0);
    b.dst_edge(merged, 0, split, 0);
    b.map_input(prod, keep);
    b.map_output(prod, keep, 0);
    b.map_output(conv1, split, 0);
    b.map_output(conv2, split, 1);
    b.build()
}

/// Cancel a split whose two outputs are immediately re-joined, in order, by a
/// concat. The pair collapses to an identity pass-through.
pub fn exclusive_concat() -> SearchResult<Xfer> {
    let mut b = XferBuilder::new("exclusive_concat");
    let split = b.src_op(OpKind::Split);
    b.src_constraint(split, Param::NumOutputs, Compare::Eq, 2);
    let cat = b.src_op(OpKind::Concat);
    b.src_constraint(cat, Param::NumInputs, Compare::Eq, 2);
    b.src_edge(split, 0, cat, 0);
    b.src_edge(split, 1, cat, 1);

    let passthrough = b.dst_op(OpKind::NoOp, move |m, model| {
        model.get_or_create(
            OpKind::NoOp,
            OpAttrs::None,
            m.op(split).def().inputs.clone(),
        )
    });
    b.map_input(split, passthrough);
    b.map_output(cat, passthrough, 0);
    b.build()
}
