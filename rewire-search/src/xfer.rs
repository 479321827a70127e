//! Substitution patterns
//!
//! An [`Xfer`] is a declarative rewrite rule: a source pattern to match, a
//! destination pattern to construct, and the port mappings that splice the
//! destination into the matched subgraph's surroundings. Substitutions are
//! immutable once built and are shared by reference across the whole search.
//!
//! # Example
//!
//! ```ignore
//! let mut b = XferBuilder::new("fuse_conv_relu");
//! let conv = b.src_op(OpKind::Conv2d);
//! b.src_constraint(conv, Param::ActiMode, Compare::Eq, ActiMode::None.code());
//! let act = b.src_op(OpKind::Activation);
//! b.src_constraint(act, Param::ActiMode, Compare::Eq, ActiMode::Relu.code());
//! b.src_edge(conv, 0, act, 0);
//! let fused = b.dst_op(OpKind::ConvRelu, move |m, model| { /* construct */ });
//! b.map_input(conv, fused);
//! b.map_output(act, fused, 0);
//! let xfer = b.build()?;
//! ```

use rewire_core::{Op, OpKind, Param};
use rewire_graph::{GraphError, Model};

use crate::error::{SearchError, SearchResult};
use crate::matcher::Binding;

/// Comparison operator used by pattern constraints
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compare {
    Eq,
    Ne,
    Lt,
    Gt,
}

impl Compare {
    /// Evaluate `lhs <comp> rhs`
    pub fn holds(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Compare::Eq => lhs == rhs,
            Compare::Ne => lhs != rhs,
            Compare::Lt => lhs < rhs,
            Compare::Gt => lhs > rhs,
        }
    }
}

/// Constraint on a single matched operator: `parameter <comp> value`.
///
/// An operator that does not support the parameter never satisfies the
/// constraint.
#[derive(Clone, Debug)]
pub struct Constraint {
    pub param: Param,
    pub comp: Compare,
    pub value: i64,
}

/// Constraint relating parameters of two matched operators
#[derive(Clone, Debug)]
pub struct PairConstraint {
    pub comp: Compare,
    pub left: usize,
    pub left_param: Param,
    pub right: usize,
    pub right_param: Param,
}

/// A node of the source pattern
pub struct SrcOp {
    /// Required kind; `None` matches any operator
    pub(crate) kind: Option<OpKind>,
    pub(crate) constraints: Vec<Constraint>,
}

/// Constructor closure for a destination operator
pub type DstBuild = Box<dyn Fn(&Binding, &mut Model) -> Result<Op, GraphError>>;

/// A node of the destination pattern
pub enum DstOp {
    /// Materialize a new operator from the match binding
    Build { kind: OpKind, build: DstBuild },
    /// Re-emit the operator bound to the given source pattern node unchanged.
    /// Used for wildcard producers that stay in place across the rewrite.
    Reuse { src: usize },
}

/// An edge between two pattern nodes, with explicit port indices
#[derive(Clone, Copy, Debug)]
pub struct PatternEdge {
    pub src: usize,
    pub src_idx: usize,
    pub dst: usize,
    pub dst_idx: usize,
}

/// An immutable substitution rule
pub struct Xfer {
    name: String,
    pub(crate) src_ops: Vec<SrcOp>,
    pub(crate) src_edges: Vec<PatternEdge>,
    pub(crate) pair_constraints: Vec<PairConstraint>,
    pub(crate) dst_ops: Vec<DstOp>,
    pub(crate) dst_edges: Vec<PatternEdge>,
    /// Which destination node consumes the external inputs delivered to each
    /// mapped source node
    pub(crate) input_map: Vec<(usize, usize)>,
    /// Which destination node and output port serve the external consumers of
    /// each mapped source node
    pub(crate) output_map: Vec<(usize, usize, usize)>,
}

impl Xfer {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of source pattern nodes
    pub fn pattern_size(&self) -> usize {
        self.src_ops.len()
    }

    /// Whether the source pattern node at `index` exposes an output mapping
    pub(crate) fn exposes_output(&self, index: usize) -> bool {
        self.output_map.iter().any(|&(src, _, _)| src == index)
    }
}

/// Builder for [`Xfer`] values.
///
/// Pattern nodes are declared in match order; `build` validates that every
/// edge and mapping references declared nodes.
pub struct XferBuilder {
    name: String,
    src_ops: Vec<SrcOp>,
    src_edges: Vec<PatternEdge>,
    pair_constraints: Vec<PairConstraint>,
    dst_ops: Vec<DstOp>,
    dst_edges: Vec<PatternEdge>,
    input_map: Vec<(usize, usize)>,
    output_map: Vec<(usize, usize, usize)>,
}

impl XferBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            src_ops: Vec::new(),
            src_edges: Vec::new(),
            pair_constraints: Vec::new(),
            dst_ops: Vec::new(),
            dst_edges: Vec::new(),
            input_map: Vec::new(),
            output_map: Vec::new(),
        }
    }

    /// Declare a source pattern node of a fixed kind; returns its index
    pub fn src_op(&mut self, kind: OpKind) -> usize {
        self.src_ops.push(SrcOp {
            kind: Some(kind),
            constraints: Vec::new(),
        });
        self.src_ops.len() - 1
    }

    /// Declare a wildcard source pattern node matching any kind
    pub fn src_any(&mut self) -> usize {
        self.src_ops.push(SrcOp {
            kind: None,
            constraints: Vec::new(),
        });
        self.src_ops.len() - 1
    }

    /// Attach a one-op constraint to a source pattern node
    pub fn src_constraint(&mut self, op: usize, param: Param, comp: Compare, value: i64) {
        self.src_ops[op].constraints.push(Constraint {
            param,
            comp,
            value,
        });
    }

    /// Declare an edge of the source pattern
    pub fn src_edge(&mut self, src: usize, src_idx: usize, dst: usize, dst_idx: usize) {
        self.src_edges.push(PatternEdge {
            src,
            src_idx,
            dst,
            dst_idx,
        });
    }

    /// Relate a parameter of one source pattern node to a parameter of another
    pub fn pair_constraint(
        &mut self,
        left: usize,
        left_param: Param,
        comp: Compare,
        right: usize,
        right_param: Param,
    ) {
        self.pair_constraints.push(PairConstraint {
            comp,
            left,
            left_param,
            right,
            right_param,
        });
    }

    /// Declare a destination node with its constructor; returns its index
    pub fn dst_op<F>(&mut self, kind: OpKind, build: F) -> usize
    where
        F: Fn(&Binding, &mut Model) -> Result<Op, GraphError> + 'static,
    {
        self.dst_ops.push(DstOp::Build {
            kind,
            build: Box::new(build),
        });
        self.dst_ops.len() - 1
    }

    /// Declare a destination node that re-emits a matched operator unchanged
    pub fn dst_reuse(&mut self, src: usize) -> usize {
        self.dst_ops.push(DstOp::Reuse { src });
        self.dst_ops.len() - 1
    }

    /// Declare an edge of the destination pattern
    pub fn dst_edge(&mut self, src: usize, src_idx: usize, dst: usize, dst_idx: usize) {
        self.dst_edges.push(PatternEdge {
            src,
            src_idx,
            dst,
            dst_idx,
        });
    }

    /// Route the external inputs of a matched source node to a destination node
    pub fn map_input(&mut self, src: usize, dst: usize) {
        self.input_map.push((src, dst));
    }

    /// Serve the external consumers of a matched source node from a
    /// destination node's output port
    pub fn map_output(&mut self, src: usize, dst: usize, dst_port: usize) {
        self.output_map.push((src, dst, dst_port));
    }

    /// Validate and freeze the substitution
    pub fn build(self) -> SearchResult<Xfer> {
        let src_len = self.src_ops.len();
        let dst_len = self.dst_ops.len();
        if src_len == 0 {
            return Err(SearchError::malformed(&self.name, "empty source pattern"));
        }

        for edge in &self.src_edges {
            if edge.src >= src_len || edge.dst >= src_len {
                return Err(SearchError::malformed(
                    &self.name,
                    "source edge references an undeclared pattern node",
                ));
            }
            if edge.src == edge.dst {
                return Err(SearchError::malformed(&self.name, "source pattern self-edge"));
            }
        }
        for edge in &self.dst_edges {
            if edge.src >= dst_len || edge.dst >= dst_len {
                return Err(SearchError::malformed(
                    &self.name,
                    "destination edge references an undeclared node",
                ));
            }
            if edge.src == edge.dst {
                return Err(SearchError::malformed(&self.name, "destination self-edge"));
            }
        }
        for c in &self.pair_constraints {
            if c.left >= src_len || c.right >= src_len {
                return Err(SearchError::malformed(
                    &self.name,
                    "two-op constraint references an undeclared pattern node",
                ));
            }
        }
        for dst in &self.dst_ops {
            if let DstOp::Reuse { src } = dst {
                if *src >= src_len {
                    return Err(SearchError::malformed(
                        &self.name,
                        "reuse references an undeclared pattern node",
                    ));
                }
            }
        }
        for &(src, dst) in &self.input_map {
            if src >= src_len || dst >= dst_len {
                return Err(SearchError::malformed(
                    &self.name,
                    "input mapping references an undeclared node",
                ));
            }
        }
        if self
            .input_map
            .iter()
            .enumerate()
            .any(|(i, &(src, _))| self.input_map[..i].iter().any(|&(s, _)| s == src))
        {
            return Err(SearchError::malformed(
                &self.name,
                "source pattern node has two input mappings",
            ));
        }
        for &(src, dst, _) in &self.output_map {
            if src >= src_len || dst >= dst_len {
                return Err(SearchError::malformed(
                    &self.name,
                    "output mapping references an undeclared node",
                ));
            }
        }
        if self
            .output_map
            .iter()
            .enumerate()
            .any(|(i, &(src, _, _))| self.output_map[..i].iter().any(|&(s, _, _)| s == src))
        {
            return Err(SearchError::malformed(
                &self.name,
                "source pattern node has two output mappings",
            ));
        }

        Ok(Xfer {
            name: self.name,
            src_ops: self.src_ops,
            src_edges: self.src_edges,
            pair_constraints: self.pair_constraints,
            dst_ops: self.dst_ops,
            dst_edges: self.dst_edges,
            input_map: self.input_map,
            output_map: self.output_map,
        })
    }
}
