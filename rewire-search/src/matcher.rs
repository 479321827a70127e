//! Pattern matching over graphs
//!
//! Depth-first backtracking in source-pattern order: at depth `d` every
//! operator of the graph is tried as a binding for pattern node `d`, filtered
//! by kind, one-op constraints, edge consistency with already-bound pattern
//! nodes, and injectivity. Completed bindings are checked against the two-op
//! constraints and the external-edge safety rule before they are yielded.
//!
//! Candidates are enumerated in guid-ascending order, so for a given graph
//! and substitution the match list is always the same.

use std::collections::BTreeSet;

use rewire_core::{Guid, Op, Param};
use rewire_graph::Graph;

use crate::xfer::{SrcOp, Xfer};

/// An injective assignment of source pattern nodes to graph operators
#[derive(Clone, Debug)]
pub struct Binding {
    ops: Vec<Op>,
}

impl Binding {
    pub(crate) fn new(ops: Vec<Op>) -> Self {
        Self { ops }
    }

    /// Operator bound to source pattern node `index`
    pub fn op(&self, index: usize) -> &Op {
        &self.ops[index]
    }

    /// All bound operators, in pattern order
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Parameter of the operator bound to pattern node `index`
    pub fn param(&self, index: usize, param: Param) -> Option<i64> {
        self.ops[index].parameter(param)
    }

    /// Guids of all bound operators
    pub(crate) fn guids(&self) -> BTreeSet<Guid> {
        self.ops.iter().map(|op| op.guid()).collect()
    }
}

/// Enumerate every valid binding of `xfer`'s source pattern in `graph`.
///
/// Bindings are produced in deterministic order: depth-first over pattern
/// nodes with candidates tried in guid-ascending order.
pub fn enumerate_matches(xfer: &Xfer, graph: &Graph) -> Vec<Binding> {
    let mut results = Vec::new();
    let mut bound: Vec<Op> = Vec::with_capacity(xfer.pattern_size());
    descend(xfer, graph, &mut bound, &mut results);
    results
}

fn descend(xfer: &Xfer, graph: &Graph, bound: &mut Vec<Op>, results: &mut Vec<Binding>) {
    let depth = bound.len();
    if depth == xfer.src_ops.len() {
        if pair_constraints_hold(xfer, bound) && no_external_leak(xfer, graph, bound) {
            results.push(Binding::new(bound.clone()));
        }
        return;
    }

    let pattern = &xfer.src_ops[depth];
    for op in graph.nodes() {
        if !candidate_ok(xfer, graph, pattern, depth, bound, op) {
            continue;
        }
        bound.push(op.clone());
        descend(xfer, graph, bound, results);
        bound.pop();
    }
}

fn candidate_ok(
    xfer: &Xfer,
    graph: &Graph,
    pattern: &SrcOp,
    depth: usize,
    bound: &[Op],
    op: &Op,
) -> bool {
    if let Some(kind) = pattern.kind {
        if op.kind() != kind {
            return false;
        }
    }
    // injectivity: one graph operator per pattern node
    if bound.contains(op) {
        return false;
    }
    for constraint in &pattern.constraints {
        match op.parameter(constraint.param) {
            Some(value) if constraint.comp.holds(value, constraint.value) => {}
            _ => return false,
        }
    }
    // every pattern edge whose endpoints are both bound must exist in the graph
    for edge in &xfer.src_edges {
        if edge.src == depth && edge.dst < depth {
            if !graph.has_edge(op, edge.src_idx, &bound[edge.dst], edge.dst_idx) {
                return false;
            }
        } else if edge.dst == depth && edge.src < depth {
            if !graph.has_edge(&bound[edge.src], edge.src_idx, op, edge.dst_idx) {
                return false;
            }
        }
    }
    true
}

fn pair_constraints_hold(xfer: &Xfer, bound: &[Op]) -> bool {
    xfer.pair_constraints.iter().all(|c| {
        match (
            bound[c.left].parameter(c.left_param),
            bound[c.right].parameter(c.right_param),
        ) {
            (Some(lhs), Some(rhs)) => c.comp.holds(lhs, rhs),
            _ => false,
        }
    })
}

/// External-edge safety: a matched operator without an output mapping must
/// not be consumed outside the matched set, otherwise the rewrite would
/// orphan that consumer.
fn no_external_leak(xfer: &Xfer, graph: &Graph, bound: &[Op]) -> bool {
    let matched: BTreeSet<Guid> = bound.iter().map(|op| op.guid()).collect();
    bound.iter().enumerate().all(|(index, op)| {
        xfer.exposes_output(index)
            || graph
                .out_edges(op)
                .all(|edge| matched.contains(&edge.dst.guid()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library;
    use rewire_core::{ActiMode, AnalyticOracle, OpKind, TensorDims};
    use rewire_graph::Model;

    fn model() -> Model {
        Model::new(Box::new(AnalyticOracle::default()))
    }

    fn conv_relu_chain(model: &mut Model) -> Graph {
        let mut graph = Graph::new();
        let input = graph.input(model, TensorDims::d4(1, 32, 28, 28)).unwrap();
        let conv = graph
            .conv2d(model, &input, 64, (3, 3), (1, 1), (1, 1), ActiMode::None)
            .unwrap();
        graph.relu(model, &conv).unwrap();
        graph
    }

    #[test]
    fn test_fuse_pattern_matches_chain() {
        let mut model = model();
        let graph = conv_relu_chain(&mut model);
        let xfer = library::fuse_conv_relu().unwrap();

        let matches = enumerate_matches(&xfer, &graph);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].op(0).kind(), OpKind::Conv2d);
        assert_eq!(matches[0].op(1).kind(), OpKind::Activation);
    }

    #[test]
    fn test_one_op_constraint_filters() {
        let mut model = model();
        let mut graph = Graph::new();
        let input = graph.input(&mut model, TensorDims::d4(1, 32, 28, 28)).unwrap();
        // conv already carries a fused activation, so the pattern's
        // acti == None constraint must reject it
        let conv = graph
            .conv2d(&mut model, &input, 64, (3, 3), (1, 1), (1, 1), ActiMode::Relu)
            .unwrap();
        graph.relu(&mut model, &conv).unwrap();

        let xfer = library::fuse_conv_relu().unwrap();
        assert!(enumerate_matches(&xfer, &graph).is_empty());
    }

    #[test]
    fn test_external_consumer_rejects_match() {
        let mut model = model();
        let mut graph = Graph::new();
        let input = graph.input(&mut model, TensorDims::d4(1, 32, 28, 28)).unwrap();
        let conv = graph
            .conv2d(&mut model, &input, 64, (3, 3), (1, 1), (1, 1), ActiMode::None)
            .unwrap();
        graph.relu(&mut model, &conv).unwrap();
        // second consumer of the conv output, outside the would-be match
        graph.activation(&mut model, &conv, ActiMode::Sigmoid).unwrap();

        let xfer = library::fuse_conv_relu().unwrap();
        assert!(enumerate_matches(&xfer, &graph).is_empty());
    }

    #[test]
    fn test_enumeration_order_is_deterministic() {
        let mut model = model();
        let mut graph = Graph::new();
        // two independent conv -> relu chains in one graph
        for _ in 0..2 {
            let input = graph.input(&mut model, TensorDims::d4(1, 32, 28, 28)).unwrap();
            let conv = graph
                .conv2d(&mut model, &input, 64, (3, 3), (1, 1), (1, 1), ActiMode::None)
                .unwrap();
            graph.relu(&mut model, &conv).unwrap();
        }

        let xfer = library::fuse_conv_relu().unwrap();
        let matches = enumerate_matches(&xfer, &graph);
        assert_eq!(matches.len(), 2);
        // matches come back ordered by the guid of the first pattern node
        assert!(matches[0].op(0).guid() < matches[1].op(0).guid());
    }

    #[test]
    fn test_pair_constraints_gate_merge() {
        let mut model = model();
        let mut graph = Graph::new();
        let input = graph.input(&mut model, TensorDims::d4(1, 32, 28, 28)).unwrap();
        graph
            .conv2d(&mut model, &input, 64, (3, 3), (1, 1), (1, 1), ActiMode::None)
            .unwrap();
        graph
            .conv2d(&mut model, &input, 32, (1, 1), (1, 1), (0, 0), ActiMode::None)
            .unwrap();

        // kernels differ: the merge pattern must not match
        let xfer = library::merge_conv().unwrap();
        assert!(enumerate_matches(&xfer, &graph).is_empty());

        // equal kernels on a fresh graph: two symmetric bindings
        let mut graph = Graph::new();
        let input = graph.input(&mut model, TensorDims::d4(1, 32, 28, 28)).unwrap();
        graph
            .conv2d(&mut model, &input, 64, (3, 3), (1, 1), (1, 1), ActiMode::None)
            .unwrap();
        graph
            .conv2d(&mut model, &input, 32, (3, 3), (1, 1), (1, 1), ActiMode::None)
            .unwrap();
        assert_eq!(enumerate_matches(&xfer, &graph).len(), 2);
    }
}
