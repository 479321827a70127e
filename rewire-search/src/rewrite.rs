//! Graph replacement
//!
//! Given a validated match binding, the rewriter derives a child graph with
//! the matched subgraph replaced by the substitution's destination pattern
//! and rewired to the surrounding context.
//!
//! Rewrites whose spliced edges are shape-incompatible are not errors: the
//! child is quietly discarded and the search continues. A substitution that
//! produces a cyclic graph, or that references ports which do not exist, is a
//! bug in the substitution itself and surfaces as an error.

use tracing::debug;

use rewire_core::CoreError;
use rewire_graph::{Graph, GraphError, Model};

use crate::error::{SearchError, SearchResult};
use crate::matcher::Binding;
use crate::xfer::{DstOp, Xfer};

/// Outcome of splicing one edge into the child graph
enum Splice {
    Done,
    Rejected,
}

/// Apply a substitution at a match, producing the rewritten child graph.
///
/// Returns `Ok(None)` when the rewrite is rejected for shape reasons.
pub fn apply(
    xfer: &Xfer,
    binding: &Binding,
    parent: &Graph,
    model: &mut Model,
) -> SearchResult<Option<Graph>> {
    // 1. Materialize the destination operators in declaration order.
    let mut built = Vec::with_capacity(xfer.dst_ops.len());
    for dst in &xfer.dst_ops {
        match dst {
            DstOp::Reuse { src } => built.push(binding.op(*src).clone()),
            DstOp::Build { kind, build } => match build(binding, model) {
                Ok(op) => {
                    if op.kind() != *kind {
                        return Err(SearchError::malformed(
                            xfer.name(),
                            format!(
                                "constructor declared {} but produced {}",
                                kind,
                                op.kind()
                            ),
                        ));
                    }
                    built.push(op);
                }
                // measurement failures abort the search; anything else the
                // constructor refuses just rejects this rewrite
                Err(err @ GraphError::Core(CoreError::MeasurementFailed { .. })) => {
                    return Err(err.into());
                }
                Err(err) => {
                    debug!(xfer = xfer.name(), %err, "rewrite rejected by constructor");
                    return Ok(None);
                }
            },
        }
    }

    // 2. Start from a structural copy of the parent and cut out the match.
    let matched = binding.guids();
    let mut child = parent.clone();
    for op in binding.ops() {
        child.remove_node(op);
    }

    // 3. Destination nodes and internal edges.
    for op in &built {
        child.add_node(op);
    }
    for edge in &xfer.dst_edges {
        match splice(&mut child, xfer, |c| {
            c.add_edge(&built[edge.src], edge.src_idx, &built[edge.dst], edge.dst_idx)
        })? {
            Splice::Done => {}
            Splice::Rejected => return Ok(None),
        }
    }

    // 4. Boundary rewiring: external producers feed the mapped destination
    //    nodes at the original ports.
    for &(src, dst) in &xfer.input_map {
        for edge in parent.in_edges(binding.op(src)) {
            if matched.contains(&edge.src.guid()) {
                continue;
            }
            match splice(&mut child, xfer, |c| {
                c.add_edge(&edge.src, edge.src_idx, &built[dst], edge.dst_idx)
            })? {
                Splice::Done => {}
                Splice::Rejected => return Ok(None),
            }
        }
    }

    // 5. External consumers read from the mapped destination output ports.
    for &(src, dst, dst_port) in &xfer.output_map {
        for edge in parent.out_edges(binding.op(src)) {
            if matched.contains(&edge.dst.guid()) {
                continue;
            }
            match splice(&mut child, xfer, |c| {
                c.add_edge(&built[dst], dst_port, &edge.dst, edge.dst_idx)
            })? {
                Splice::Done => {}
                Splice::Rejected => return Ok(None),
            }
        }
    }

    // 6. A substitution must never introduce a cycle.
    if child.topo_order().is_err() {
        return Err(SearchError::CyclicRewrite {
            xfer: xfer.name().to_string(),
        });
    }

    Ok(Some(child))
}

fn splice(
    child: &mut Graph,
    xfer: &Xfer,
    connect: impl FnOnce(&mut Graph) -> Result<(), GraphError>,
) -> SearchResult<Splice> {
    match connect(child) {
        Ok(()) => Ok(Splice::Done),
        Err(err @ GraphError::ShapeMismatch { .. }) => {
            debug!(xfer = xfer.name(), %err, "rewrite rejected");
            Ok(Splice::Rejected)
        }
        Err(err @ (GraphError::PortOutOfBounds { .. } | GraphError::DuplicateInputEdge { .. })) => {
            Err(SearchError::malformed(xfer.name(), err.to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library;
    use crate::matcher::enumerate_matches;
    use crate::xfer::XferBuilder;
    use rewire_core::{ActiMode, AnalyticOracle, Guid, OpAttrs, OpKind, TensorDims};
    use std::collections::BTreeSet;

    fn model() -> Model {
        Model::new(Box::new(AnalyticOracle::default()))
    }

    /// input -> conv -> relu -> noop, so the matched pair has an external
    /// producer and an external consumer
    fn bracketed_chain(model: &mut Model) -> Graph {
        let mut graph = Graph::new();
        let input = graph.input(model, TensorDims::d4(1, 32, 28, 28)).unwrap();
        let conv = graph
            .conv2d(model, &input, 64, (3, 3), (1, 1), (1, 1), ActiMode::None)
            .unwrap();
        let relu = graph.relu(model, &conv).unwrap();
        graph.noop(model, &relu).unwrap();
        graph
    }

    #[test]
    fn test_fuse_replaces_pair_and_preserves_boundary() {
        let mut model = model();
        let parent = bracketed_chain(&mut model);
        let xfer = library::fuse_conv_relu().unwrap();
        let matches = enumerate_matches(&xfer, &parent);
        assert_eq!(matches.len(), 1);

        let matched: BTreeSet<Guid> = matches[0].guids();
        let boundary_producers: BTreeSet<(Guid, usize)> = parent
            .nodes()
            .filter(|op| matched.contains(&op.guid()))
            .flat_map(|op| parent.in_edges(op))
            .filter(|e| !matched.contains(&e.src.guid()))
            .map(|e| (e.src.guid(), e.src_idx))
            .collect();
        let boundary_consumers: BTreeSet<(Guid, usize)> = parent
            .nodes()
            .filter(|op| matched.contains(&op.guid()))
            .flat_map(|op| parent.out_edges(op))
            .filter(|e| !matched.contains(&e.dst.guid()))
            .map(|e| (e.dst.guid(), e.dst_idx))
            .collect();

        let child = apply(&xfer, &matches[0], &parent, &mut model)
            .unwrap()
            .expect("fusion applies");

        // conv and relu are gone, one fused node replaces them
        assert_eq!(child.node_count(), parent.node_count() - 1);
        let fused: Vec<_> = child
            .nodes()
            .filter(|op| op.kind() == OpKind::ConvRelu)
            .cloned()
            .collect();
        assert_eq!(fused.len(), 1);
        assert_eq!(
            fused[0].parameter(rewire_core::Param::ActiMode),
            Some(ActiMode::Relu.code())
        );

        // the fused node sees exactly the old external producers and consumers
        let new_producers: BTreeSet<(Guid, usize)> = child
            .in_edges(&fused[0])
            .map(|e| (e.src.guid(), e.src_idx))
            .collect();
        let new_consumers: BTreeSet<(Guid, usize)> = child
            .out_edges(&fused[0])
            .map(|e| (e.dst.guid(), e.dst_idx))
            .collect();
        assert_eq!(new_producers, boundary_producers);
        assert_eq!(new_consumers, boundary_consumers);

        assert!(child.topo_order().is_ok());
        assert!(child.total_cost() < parent.total_cost());
    }

    #[test]
    fn test_shape_incompatible_rewrite_is_rejected_silently() {
        let mut model = model();
        let parent = bracketed_chain(&mut model);

        // replace the conv with a wider one: the downstream consumer expects
        // 64 channels, so the spliced output edge cannot typecheck
        let mut b = XferBuilder::new("widen_conv");
        let conv = b.src_op(OpKind::Conv2d);
        let wide = b.dst_op(OpKind::Conv2d, move |m, model| {
            let def = m.op(conv).def();
            let OpAttrs::Conv2d(attrs) = &def.attrs else {
                unreachable!("kind-constrained match")
            };
            let mut attrs = attrs.clone();
            attrs.out_channels += 1;
            model.get_or_create(OpKind::Conv2d, OpAttrs::Conv2d(attrs), def.inputs.clone())
        });
        b.map_input(conv, wide);
        b.map_output(conv, wide, 0);
        let xfer = b.build().unwrap();

        let matches = enumerate_matches(&xfer, &parent);
        assert_eq!(matches.len(), 1);
        let outcome = apply(&xfer, &matches[0], &parent, &mut model).unwrap();
        assert!(outcome.is_none());
    }

    #[test]
    fn test_cyclic_rewrite_is_a_structural_error() {
        let mut model = model();
        let dims = TensorDims::d4(1, 8, 4, 4);
        let mut parent = Graph::new();
        let a = parent.input(&mut model, dims).unwrap();
        let b = parent.noop(&mut model, &a).unwrap();
        let c = parent.noop(&mut model, &b).unwrap();

        // replace {a, c} with d2 -> d1 while d1 still feeds b and b feeds d2:
        // the spliced graph contains the cycle d2 -> d1 -> b -> d2
        let mut builder = XferBuilder::new("twist");
        let first = builder.src_op(OpKind::NoOp);
        let last = builder.src_op(OpKind::NoOp);
        let d1 = builder.dst_op(OpKind::NoOp, move |_, model| {
            model.get_or_create(OpKind::NoOp, OpAttrs::None, vec![dims])
        });
        let d2 = builder.dst_op(OpKind::NoOp, move |_, model| {
            model.get_or_create(OpKind::NoOp, OpAttrs::None, vec![dims])
        });
        builder.dst_edge(d2, 0, d1, 0);
        builder.map_output(first, d1, 0);
        builder.map_input(last, d2);
        let xfer = builder.build().unwrap();

        let binding = Binding::new(vec![a.op.clone(), c.op.clone()]);
        let result = apply(&xfer, &binding, &parent, &mut model);
        assert!(matches!(result, Err(SearchError::CyclicRewrite { .. })));
    }

    #[test]
    fn test_merge_matmul_reuses_producer() {
        let mut model = model();
        let mut parent = Graph::new();
        let input = parent.input(&mut model, TensorDims::d3(2, 4, 16)).unwrap();
        parent.matmul(&mut model, &input, 8, ActiMode::None).unwrap();
        parent.matmul(&mut model, &input, 4, ActiMode::None).unwrap();

        let xfer = library::merge_matmul().unwrap();
        let matches = enumerate_matches(&xfer, &parent);
        assert_eq!(matches.len(), 2, "symmetric bindings");

        let child = apply(&xfer, &matches[0], &parent, &mut model)
            .unwrap()
            .expect("merge applies");

        let kinds: Vec<OpKind> = child.topo_order().unwrap().iter().map(|op| op.kind()).collect();
        assert_eq!(kinds, vec![OpKind::NoOp, OpKind::Matmul, OpKind::Split]);

        // the input node survived the rewrite in place
        assert!(child.contains(&input.op));

        // merged matmul covers both original output widths
        let merged = child
            .nodes()
            .find(|op| op.kind() == OpKind::Matmul)
            .unwrap();
        assert_eq!(merged.def().outputs[0], TensorDims::d3(2, 4, 12));

        // one kernel launch instead of two makes the child cheaper
        assert!(child.total_cost() < parent.total_cost());
    }

    #[test]
    fn test_wrong_constructor_kind_is_malformed() {
        let mut model = model();
        let parent = bracketed_chain(&mut model);

        let mut b = XferBuilder::new("liar");
        let conv = b.src_op(OpKind::Conv2d);
        let d = b.dst_op(OpKind::ConvRelu, move |m, model| {
            // claims ConvRelu, builds a plain conv
            let def = m.op(conv).def();
            model.get_or_create(OpKind::Conv2d, def.attrs.clone(), def.inputs.clone())
        });
        b.map_input(conv, d);
        b.map_output(conv, d, 0);
        let xfer = b.build().unwrap();

        let matches = enumerate_matches(&xfer, &parent);
        let result = apply(&xfer, &matches[0], &parent, &mut model);
        assert!(matches!(result, Err(SearchError::MalformedPattern { .. })));
    }
}
