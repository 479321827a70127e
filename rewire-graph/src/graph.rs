//! The dataflow graph
//!
//! A [`Graph`] is a DAG of operator instances connected by tensor edges. It
//! owns only its edge maps; operator definitions are shared through the
//! [`Model`](crate::model::Model) catalog, so deriving a rewritten copy is a
//! cheap structural clone.
//!
//! Both edge maps are ordered containers keyed by guid, which makes every
//! enumeration in the optimizer deterministic.

use std::cell::Cell;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use thiserror::Error;

use rewire_core::{
    ActiMode, ConcatAttrs, Conv2dAttrs, CoreError, Guid, MatmulAttrs, Op, OpAttrs, OpKind,
    Pool2dAttrs, SplitAttrs, Tensor, TensorDims,
};

use crate::model::Model;

/// A directed connection between two operator ports.
///
/// `src_idx` names an output port of `src`; `dst_idx` an input port of `dst`.
/// Edges are identified by the full 4-tuple.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Edge {
    pub src: Op,
    pub src_idx: usize,
    pub dst: Op,
    pub dst_idx: usize,
}

/// Errors raised by graph construction and queries
#[derive(Error, Debug)]
pub enum GraphError {
    /// Operator is not part of this graph
    #[error("operator {guid} not found in graph")]
    NodeNotFound { guid: Guid },

    /// Port index outside the operator's arity
    #[error("{port} port {index} out of bounds on {op} ({available} available)")]
    PortOutOfBounds {
        op: String,
        port: &'static str,
        index: usize,
        available: usize,
    },

    /// Producer output shape differs from the consumer's expected input shape
    #[error("shape mismatch on edge {src}:{src_idx} -> {dst}:{dst_idx}: {produced} vs {expected}")]
    ShapeMismatch {
        src: String,
        src_idx: usize,
        dst: String,
        dst_idx: usize,
        produced: TensorDims,
        expected: TensorDims,
    },

    /// An input port already has a producer
    #[error("input port {index} of {op} already has an incoming edge")]
    DuplicateInputEdge { op: String, index: usize },

    /// The edge set contains a cycle
    #[error("cycle detected involving {count} node(s)")]
    CycleDetected { count: usize },

    /// Catalog-level failure (shape inference, measurement)
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// The operator graph
pub struct Graph {
    in_edges: BTreeMap<Op, BTreeSet<Edge>>,
    out_edges: BTreeMap<Op, BTreeSet<Edge>>,
    /// Structural digest, computed lazily and dropped on any mutation
    hash_cache: Cell<Option<u64>>,
    /// Cost sum, computed lazily and dropped on any mutation
    cost_cache: Cell<Option<f64>>,
}

impl Clone for Graph {
    fn clone(&self) -> Self {
        Self {
            in_edges: self.in_edges.clone(),
            out_edges: self.out_edges.clone(),
            hash_cache: self.hash_cache.clone(),
            cost_cache: self.cost_cache.clone(),
        }
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            in_edges: BTreeMap::new(),
            out_edges: BTreeMap::new(),
            hash_cache: Cell::new(None),
            cost_cache: Cell::new(None),
        }
    }

    fn invalidate(&mut self) {
        self.hash_cache.set(None);
        self.cost_cache.set(None);
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Add an operator with no edges. Adding an operator twice is a no-op.
    pub fn add_node(&mut self, op: &Op) {
        self.in_edges.entry(op.clone()).or_default();
        self.out_edges.entry(op.clone()).or_default();
        self.invalidate();
    }

    /// Whether the operator is part of this graph
    pub fn contains(&self, op: &Op) -> bool {
        self.in_edges.contains_key(op)
    }

    /// Connect an output port of `src` to an input port of `dst`.
    ///
    /// Both operators are added to the graph if not already present. The
    /// connection is validated: port indices must be in range, the produced
    /// shape must equal the expected input shape, and the input port must not
    /// already have a producer.
    pub fn add_edge(
        &mut self,
        src: &Op,
        src_idx: usize,
        dst: &Op,
        dst_idx: usize,
    ) -> Result<(), GraphError> {
        if src_idx >= src.num_outputs() {
            return Err(GraphError::PortOutOfBounds {
                op: src.to_string(),
                port: "output",
                index: src_idx,
                available: src.num_outputs(),
            });
        }
        if dst_idx >= dst.num_inputs() {
            return Err(GraphError::PortOutOfBounds {
                op: dst.to_string(),
                port: "input",
                index: dst_idx,
                available: dst.num_inputs(),
            });
        }
        let produced = src.def().outputs[src_idx];
        let expected = dst.def().inputs[dst_idx];
        if produced != expected {
            return Err(GraphError::ShapeMismatch {
                src: src.to_string(),
                src_idx,
                dst: dst.to_string(),
                dst_idx,
                produced,
                expected,
            });
        }
        if self
            .in_edges
            .get(dst)
            .is_some_and(|edges| edges.iter().any(|e| e.dst_idx == dst_idx))
        {
            return Err(GraphError::DuplicateInputEdge {
                op: dst.to_string(),
                index: dst_idx,
            });
        }

        let edge = Edge {
            src: src.clone(),
            src_idx,
            dst: dst.clone(),
            dst_idx,
        };
        self.in_edges.entry(src.clone()).or_default();
        self.out_edges.entry(dst.clone()).or_default();
        self.in_edges.entry(dst.clone()).or_default().insert(edge.clone());
        self.out_edges.entry(src.clone()).or_default().insert(edge);
        self.invalidate();
        Ok(())
    }

    /// Remove an operator and every edge incident to it.
    ///
    /// Used by the rewriter when deriving a child graph; removing an operator
    /// that is not present is a no-op.
    pub fn remove_node(&mut self, op: &Op) {
        let incoming = self.in_edges.remove(op).unwrap_or_default();
        let outgoing = self.out_edges.remove(op).unwrap_or_default();
        for edge in incoming {
            if let Some(peer) = self.out_edges.get_mut(&edge.src) {
                peer.remove(&edge);
            }
        }
        for edge in outgoing {
            if let Some(peer) = self.in_edges.get_mut(&edge.dst) {
                peer.remove(&edge);
            }
        }
        self.invalidate();
    }

    /// Operators in guid order
    pub fn nodes(&self) -> impl Iterator<Item = &Op> {
        self.in_edges.keys()
    }

    pub fn node_count(&self) -> usize {
        self.in_edges.len()
    }

    /// Incoming edges of an operator, ordered by source
    pub fn in_edges(&self, op: &Op) -> impl Iterator<Item = &Edge> {
        self.in_edges.get(op).into_iter().flatten()
    }

    /// Outgoing edges of an operator, ordered by destination
    pub fn out_edges(&self, op: &Op) -> impl Iterator<Item = &Edge> {
        self.out_edges.get(op).into_iter().flatten()
    }

    /// Whether the exact edge 4-tuple exists
    pub fn has_edge(&self, src: &Op, src_idx: usize, dst: &Op, dst_idx: usize) -> bool {
        self.out_edges.get(src).is_some_and(|edges| {
            edges
                .iter()
                .any(|e| e.src_idx == src_idx && &e.dst == dst && e.dst_idx == dst_idx)
        })
    }

    pub fn edge_count(&self) -> usize {
        self.in_edges.values().map(|s| s.len()).sum()
    }

    /// Operators in dependency order.
    ///
    /// Deterministic: among ready operators, lower guids come first.
    pub fn topo_order(&self) -> Result<Vec<Op>, GraphError> {
        let mut remaining: Vec<Op> = self.in_edges.keys().cloned().collect();
        let mut order = Vec::with_capacity(remaining.len());
        let mut placed: BTreeSet<Guid> = BTreeSet::new();
        let mut made_progress = true;

        while !remaining.is_empty() && made_progress {
            made_progress = false;
            remaining.retain(|op| {
                let ready = self
                    .in_edges
                    .get(op)
                    .map(|edges| edges.iter().all(|e| placed.contains(&e.src.guid())))
                    .unwrap_or(true);
                if ready {
                    placed.insert(op.guid());
                    order.push(op.clone());
                    made_progress = true;
                    false
                } else {
                    true
                }
            });
        }

        if !remaining.is_empty() {
            return Err(GraphError::CycleDetected {
                count: remaining.len(),
            });
        }
        Ok(order)
    }

    // =========================================================================
    // Digest and cost
    // =========================================================================

    /// Structural 64-bit digest.
    ///
    /// Computed bottom-up over the topological order: each operator's digest
    /// covers its kind, attributes, and the sorted digests of its incoming
    /// edges; the graph digest is the order-independent combination of all
    /// node digests. Guids never contribute, so two structurally-isomorphic
    /// graphs with equal attributes hash equal.
    pub fn hash(&self) -> Result<u64, GraphError> {
        if let Some(hash) = self.hash_cache.get() {
            return Ok(hash);
        }
        let order = self.topo_order()?;
        let mut node_digest: BTreeMap<Guid, u64> = BTreeMap::new();
        let mut total: u64 = 0;
        for op in order {
            let mut hasher = DefaultHasher::new();
            op.kind().hash(&mut hasher);
            op.def().attrs.hash(&mut hasher);
            let mut incoming: Vec<(u64, usize, usize)> = self
                .in_edges(&op)
                .map(|e| (node_digest[&e.src.guid()], e.src_idx, e.dst_idx))
                .collect();
            incoming.sort_unstable();
            incoming.hash(&mut hasher);
            let digest = hasher.finish();
            node_digest.insert(op.guid(), digest);
            total = total.wrapping_add(digest);
        }
        self.hash_cache.set(Some(total));
        Ok(total)
    }

    /// Sum of the measured runtimes of all operators, in milliseconds.
    ///
    /// This is the objective the search minimizes; unlike [`Graph::run`] it
    /// never touches the oracle.
    pub fn total_cost(&self) -> f64 {
        if let Some(cost) = self.cost_cache.get() {
            return cost;
        }
        let cost = self.nodes().map(|op| op.runtime_ms()).sum();
        self.cost_cache.set(Some(cost));
        cost
    }

    /// Execute the graph end-to-end through the oracle and return the total
    /// runtime in milliseconds.
    ///
    /// Used for reporting baseline and final graphs only; the search loop
    /// uses [`Graph::total_cost`].
    pub fn run(&self, model: &mut Model) -> Result<f64, GraphError> {
        let mut total = 0.0;
        for op in self.topo_order()? {
            total += model.measure_def(op.def())?;
        }
        Ok(total)
    }

    /// Per-kind operator counts and cost totals, ordered by kind
    pub fn cost_breakdown(&self) -> Vec<(OpKind, usize, f64)> {
        let mut by_kind: BTreeMap<OpKind, (usize, f64)> = BTreeMap::new();
        for op in self.nodes() {
            let entry = by_kind.entry(op.kind()).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += op.runtime_ms();
        }
        by_kind
            .into_iter()
            .map(|(kind, (count, cost))| (kind, count, cost))
            .collect()
    }

    // =========================================================================
    // Builder operations
    // =========================================================================

    fn wire(&mut self, op: Op, inputs: &[&Tensor]) -> Result<Op, GraphError> {
        self.add_node(&op);
        for (index, tensor) in inputs.iter().enumerate() {
            self.add_edge(&tensor.op, tensor.idx, &op, index)?;
        }
        Ok(op)
    }

    fn output(op: &Op, idx: usize) -> Tensor {
        Tensor {
            dims: op.def().outputs[idx],
            op: op.clone(),
            idx,
        }
    }

    /// Create a graph input: a `NoOp` source node carrying `dims`
    pub fn input(&mut self, model: &mut Model, dims: TensorDims) -> Result<Tensor, GraphError> {
        let op = model.get_or_create(OpKind::NoOp, OpAttrs::None, vec![dims])?;
        self.add_node(&op);
        Ok(Self::output(&op, 0))
    }

    /// Identity pass-through of an existing tensor
    pub fn noop(&mut self, model: &mut Model, input: &Tensor) -> Result<Tensor, GraphError> {
        let op = model.get_or_create(OpKind::NoOp, OpAttrs::None, vec![input.dims])?;
        let op = self.wire(op, &[input])?;
        Ok(Self::output(&op, 0))
    }

    /// 2D convolution
    #[allow(clippy::too_many_arguments)]
    pub fn conv2d(
        &mut self,
        model: &mut Model,
        input: &Tensor,
        out_channels: usize,
        kernel: (usize, usize),
        stride: (usize, usize),
        padding: (usize, usize),
        acti: ActiMode,
    ) -> Result<Tensor, GraphError> {
        let attrs = OpAttrs::Conv2d(Conv2dAttrs {
            out_channels,
            kernel,
            stride,
            padding,
            acti,
        });
        let op = model.get_or_create(OpKind::Conv2d, attrs, vec![input.dims])?;
        let op = self.wire(op, &[input])?;
        Ok(Self::output(&op, 0))
    }

    /// Matrix multiplication over a rank-3 input
    pub fn matmul(
        &mut self,
        model: &mut Model,
        input: &Tensor,
        out_dim: usize,
        acti: ActiMode,
    ) -> Result<Tensor, GraphError> {
        let attrs = OpAttrs::Matmul(MatmulAttrs { out_dim, acti });
        let op = model.get_or_create(OpKind::Matmul, attrs, vec![input.dims])?;
        let op = self.wire(op, &[input])?;
        Ok(Self::output(&op, 0))
    }

    /// 2D max pooling
    pub fn pool2d_max(
        &mut self,
        model: &mut Model,
        input: &Tensor,
        kernel: (usize, usize),
        stride: (usize, usize),
        padding: (usize, usize),
    ) -> Result<Tensor, GraphError> {
        self.pool2d(model, OpKind::Pool2dMax, input, kernel, stride, padding)
    }

    /// 2D average pooling
    pub fn pool2d_avg(
        &mut self,
        model: &mut Model,
        input: &Tensor,
        kernel: (usize, usize),
        stride: (usize, usize),
        padding: (usize, usize),
    ) -> Result<Tensor, GraphError> {
        self.pool2d(model, OpKind::Pool2dAvg, input, kernel, stride, padding)
    }

    fn pool2d(
        &mut self,
        model: &mut Model,
        kind: OpKind,
        input: &Tensor,
        kernel: (usize, usize),
        stride: (usize, usize),
        padding: (usize, usize),
    ) -> Result<Tensor, GraphError> {
        let attrs = OpAttrs::Pool2d(Pool2dAttrs {
            kernel,
            stride,
            padding,
        });
        let op = model.get_or_create(kind, attrs, vec![input.dims])?;
        let op = self.wire(op, &[input])?;
        Ok(Self::output(&op, 0))
    }

    /// Channel-dimension concatenation
    pub fn concat(&mut self, model: &mut Model, inputs: &[&Tensor]) -> Result<Tensor, GraphError> {
        let attrs = OpAttrs::Concat(ConcatAttrs {
            num_inputs: inputs.len(),
        });
        let dims: Vec<TensorDims> = inputs.iter().map(|t| t.dims).collect();
        let op = model.get_or_create(OpKind::Concat, attrs, dims)?;
        let op = self.wire(op, inputs)?;
        Ok(Self::output(&op, 0))
    }

    /// Channel-dimension split; returns one tensor per requested channel count
    pub fn split(
        &mut self,
        model: &mut Model,
        input: &Tensor,
        channels: &[usize],
    ) -> Result<Vec<Tensor>, GraphError> {
        let attrs = OpAttrs::Split(SplitAttrs {
            channels: channels.to_vec(),
        });
        let op = model.get_or_create(OpKind::Split, attrs, vec![input.dims])?;
        let op = self.wire(op, &[input])?;
        Ok((0..op.num_outputs())
            .map(|idx| Self::output(&op, idx))
            .collect())
    }

    /// Element-wise addition
    pub fn add(
        &mut self,
        model: &mut Model,
        lhs: &Tensor,
        rhs: &Tensor,
    ) -> Result<Tensor, GraphError> {
        let op = model.get_or_create(OpKind::ElementAdd, OpAttrs::None, vec![lhs.dims, rhs.dims])?;
        let op = self.wire(op, &[lhs, rhs])?;
        Ok(Self::output(&op, 0))
    }

    /// Element-wise activation
    pub fn activation(
        &mut self,
        model: &mut Model,
        input: &Tensor,
        mode: ActiMode,
    ) -> Result<Tensor, GraphError> {
        let op = model.get_or_create(OpKind::Activation, OpAttrs::Activation(mode), vec![input.dims])?;
        let op = self.wire(op, &[input])?;
        Ok(Self::output(&op, 0))
    }

    /// Shorthand for a ReLU activation
    pub fn relu(&mut self, model: &mut Model, input: &Tensor) -> Result<Tensor, GraphError> {
        self.activation(model, input, ActiMode::Relu)
    }

    /// Batch normalization
    pub fn batchnorm(&mut self, model: &mut Model, input: &Tensor) -> Result<Tensor, GraphError> {
        let op = model.get_or_create(OpKind::BatchNorm, OpAttrs::None, vec![input.dims])?;
        let op = self.wire(op, &[input])?;
        Ok(Self::output(&op, 0))
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rewire_core::AnalyticOracle;

    fn model() -> Model {
        Model::new(Box::new(AnalyticOracle::default()))
    }

    /// input -> conv -> relu chain used by several tests
    fn conv_relu_chain(model: &mut Model) -> (Graph, Tensor) {
        let mut graph = Graph::new();
        let input = graph.input(model, TensorDims::d4(1, 32, 28, 28)).unwrap();
        let conv = graph
            .conv2d(model, &input, 64, (3, 3), (1, 1), (1, 1), ActiMode::None)
            .unwrap();
        let out = graph.relu(model, &conv).unwrap();
        (graph, out)
    }

    #[test]
    fn test_builder_wires_edges() {
        let mut model = model();
        let (graph, out) = conv_relu_chain(&mut model);

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(out.dims, TensorDims::d4(1, 64, 28, 28));

        // the activation has exactly one producer: the conv
        let relu_in: Vec<&Edge> = graph.in_edges(&out.op).collect();
        assert_eq!(relu_in.len(), 1);
        assert_eq!(relu_in[0].src.kind(), OpKind::Conv2d);
    }

    #[test]
    fn test_add_edge_rejects_shape_mismatch() {
        let mut model = model();
        let mut graph = Graph::new();
        let a = graph.input(&mut model, TensorDims::d4(1, 32, 28, 28)).unwrap();
        let b = model
            .get_or_create(
                OpKind::NoOp,
                OpAttrs::None,
                vec![TensorDims::d4(1, 64, 28, 28)],
            )
            .unwrap();
        graph.add_node(&b);

        let result = graph.add_edge(&a.op, 0, &b, 0);
        assert!(matches!(result, Err(GraphError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_add_edge_rejects_second_producer() {
        let mut model = model();
        let mut graph = Graph::new();
        let dims = TensorDims::d4(1, 32, 28, 28);
        let a = graph.input(&mut model, dims).unwrap();
        let b = graph.input(&mut model, dims).unwrap();
        let sink = model
            .get_or_create(OpKind::NoOp, OpAttrs::None, vec![dims])
            .unwrap();

        graph.add_edge(&a.op, 0, &sink, 0).unwrap();
        let result = graph.add_edge(&b.op, 0, &sink, 0);
        assert!(matches!(result, Err(GraphError::DuplicateInputEdge { .. })));
    }

    #[test]
    fn test_add_edge_rejects_bad_port() {
        let mut model = model();
        let mut graph = Graph::new();
        let dims = TensorDims::d4(1, 32, 28, 28);
        let a = graph.input(&mut model, dims).unwrap();
        let sink = model
            .get_or_create(OpKind::NoOp, OpAttrs::None, vec![dims])
            .unwrap();

        let result = graph.add_edge(&a.op, 1, &sink, 0);
        assert!(matches!(result, Err(GraphError::PortOutOfBounds { .. })));
    }

    #[test]
    fn test_remove_node_drops_incident_edges() {
        let mut model = model();
        let (mut graph, out) = conv_relu_chain(&mut model);
        let conv = graph.in_edges(&out.op).next().unwrap().src.clone();

        graph.remove_node(&conv);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
        assert!(!graph.contains(&conv));
    }

    #[test]
    fn test_topo_order_is_dependency_sorted() {
        let mut model = model();
        let (graph, _) = conv_relu_chain(&mut model);
        let order = graph.topo_order().unwrap();
        assert_eq!(order.len(), 3);
        assert_eq!(order[0].kind(), OpKind::NoOp);
        assert_eq!(order[1].kind(), OpKind::Conv2d);
        assert_eq!(order[2].kind(), OpKind::Activation);
    }

    #[test]
    fn test_cycle_is_detected() {
        let mut model = model();
        let mut graph = Graph::new();
        let dims = TensorDims::d4(1, 8, 4, 4);
        let a = model
            .get_or_create(OpKind::NoOp, OpAttrs::None, vec![dims])
            .unwrap();
        let b = model
            .get_or_create(OpKind::NoOp, OpAttrs::None, vec![dims])
            .unwrap();
        graph.add_edge(&a, 0, &b, 0).unwrap();
        graph.add_edge(&b, 0, &a, 0).unwrap();

        assert!(matches!(
            graph.topo_order(),
            Err(GraphError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_hash_ignores_guids() {
        let mut model = model();
        let (first, _) = conv_relu_chain(&mut model);
        // same structure, freshly created operators with different guids
        let (second, _) = conv_relu_chain(&mut model);

        assert_eq!(first.hash().unwrap(), second.hash().unwrap());
    }

    #[test]
    fn test_hash_sees_attribute_changes() {
        let mut model = model();
        let (first, _) = conv_relu_chain(&mut model);

        let mut second = Graph::new();
        let input = second
            .input(&mut model, TensorDims::d4(1, 32, 28, 28))
            .unwrap();
        let conv = second
            .conv2d(&mut model, &input, 64, (3, 3), (1, 1), (1, 1), ActiMode::None)
            .unwrap();
        second.activation(&mut model, &conv, ActiMode::Tanh).unwrap();

        assert_ne!(first.hash().unwrap(), second.hash().unwrap());
    }

    #[test]
    fn test_hash_invalidated_by_mutation() {
        let mut model = model();
        let (mut graph, out) = conv_relu_chain(&mut model);
        let before = graph.hash().unwrap();

        graph.relu(&mut model, &out).unwrap();
        assert_ne!(graph.hash().unwrap(), before);
    }

    #[test]
    fn test_total_cost_sums_runtimes() {
        let mut model = model();
        let (graph, _) = conv_relu_chain(&mut model);
        let expected: f64 = graph.nodes().map(|op| op.runtime_ms()).sum();
        assert_relative_eq!(graph.total_cost(), expected);
        // cached value agrees
        assert_relative_eq!(graph.total_cost(), expected);
    }

    #[test]
    fn test_run_matches_total_cost_for_analytic_oracle() {
        let mut model = model();
        let (graph, _) = conv_relu_chain(&mut model);
        let end_to_end = graph.run(&mut model).unwrap();
        assert_relative_eq!(end_to_end, graph.total_cost());
    }

    #[test]
    fn test_cost_breakdown() {
        let mut model = model();
        let (graph, _) = conv_relu_chain(&mut model);
        let breakdown = graph.cost_breakdown();
        let kinds: Vec<OpKind> = breakdown.iter().map(|(k, _, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![OpKind::NoOp, OpKind::Conv2d, OpKind::Activation]
        );
        let total: f64 = breakdown.iter().map(|(_, _, cost)| cost).sum();
        assert_relative_eq!(total, graph.total_cost());
    }

    #[test]
    fn test_split_concat_roundtrip_shapes() {
        let mut model = model();
        let mut graph = Graph::new();
        let input = graph.input(&mut model, TensorDims::d4(1, 96, 14, 14)).unwrap();
        let parts = graph.split(&mut model, &input, &[64, 32]).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].dims.channels(), 64);
        assert_eq!(parts[1].dims.channels(), 32);

        let joined = graph
            .concat(&mut model, &[&parts[0], &parts[1]])
            .unwrap();
        assert_eq!(joined.dims, TensorDims::d4(1, 96, 14, 14));
    }
}
