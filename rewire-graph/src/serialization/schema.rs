//! Graph file schema (.rdag)
//!
//! The exported form lists nodes in topological order followed by edges as
//! guid-addressed 4-tuples. Output shapes are stored per node so imports can
//! validate the re-derived shapes against the file.

use serde::{Deserialize, Serialize};

use rewire_core::{OpAttrs, OpKind, TensorDims};

use super::error::{Result, SerializationError};
use super::version::SchemaVersion;
use crate::graph::Graph;
use crate::model::Model;
use std::collections::BTreeMap;

/// Graph file schema (.rdag)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphFile {
    /// Schema version
    pub version: SchemaVersion,
    /// Graph definition
    pub graph: GraphDef,
}

/// Serialized graph: nodes in topological order plus guid-addressed edges
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDef {
    /// Graph name
    pub name: String,
    /// Nodes in topological order
    pub nodes: Vec<NodeDef>,
    /// Edges between nodes, by guid
    pub edges: Vec<EdgeDef>,
}

/// One serialized operator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDef {
    pub guid: u64,
    pub kind: OpKind,
    pub attrs: OpAttrs,
    /// Output shapes, for import-time validation
    pub outputs: Vec<TensorDims>,
}

/// One serialized edge
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EdgeDef {
    pub src_guid: u64,
    pub src_idx: usize,
    pub dst_guid: u64,
    pub dst_idx: usize,
}

/// Serialize a graph.
///
/// Nodes are written in topological order so that importers can rebuild
/// shapes in a single pass.
pub fn export_graph(graph: &Graph, name: &str) -> Result<GraphFile> {
    let order = graph.topo_order()?;
    let mut nodes = Vec::with_capacity(order.len());
    let mut edges = Vec::new();
    for op in &order {
        nodes.push(NodeDef {
            guid: op.guid().raw(),
            kind: op.kind(),
            attrs: op.def().attrs.clone(),
            outputs: op.def().outputs.clone(),
        });
        for edge in graph.in_edges(op) {
            edges.push(EdgeDef {
                src_guid: edge.src.guid().raw(),
                src_idx: edge.src_idx,
                dst_guid: edge.dst.guid().raw(),
                dst_idx: edge.dst_idx,
            });
        }
    }
    Ok(GraphFile {
        version: SchemaVersion::CURRENT,
        graph: GraphDef {
            name: name.to_string(),
            nodes,
            edges,
        },
    })
}

/// Rebuild a graph from its serialized form.
///
/// Operators are re-created through the model catalog, so imported graphs
/// share definitions (and measurements) with everything else the model has
/// seen. Guids are re-assigned; the structural hash is preserved.
pub fn import_graph(file: &GraphFile, model: &mut Model) -> Result<Graph> {
    let def = &file.graph;

    // in-edges per node guid, sorted by destination port
    let mut incoming: BTreeMap<u64, Vec<EdgeDef>> = BTreeMap::new();
    for edge in &def.edges {
        incoming.entry(edge.dst_guid).or_default().push(*edge);
    }
    for edges in incoming.values_mut() {
        edges.sort_by_key(|e| e.dst_idx);
        for (expected, edge) in edges.iter().enumerate() {
            if edge.dst_idx != expected {
                return Err(SerializationError::Malformed(format!(
                    "node {} input ports are not contiguous",
                    edge.dst_guid
                )));
            }
        }
    }

    let mut graph = Graph::new();
    let mut built = BTreeMap::new();
    for node in &def.nodes {
        let input_dims: Vec<TensorDims> = match incoming.get(&node.guid) {
            Some(edges) => edges
                .iter()
                .map(|e| {
                    let src: &rewire_core::Op = built.get(&e.src_guid).ok_or_else(|| {
                        SerializationError::Malformed(format!(
                            "node {} consumes node {} before it is defined",
                            node.guid, e.src_guid
                        ))
                    })?;
                    src.def()
                        .outputs
                        .get(e.src_idx)
                        .copied()
                        .ok_or_else(|| {
                            SerializationError::Malformed(format!(
                                "node {} has no output {}",
                                e.src_guid, e.src_idx
                            ))
                        })
                })
                .collect::<Result<_>>()?,
            // sources carry their own shape: a NoOp's input equals its output
            None if node.kind == OpKind::NoOp => node.outputs.clone(),
            None => {
                return Err(SerializationError::Malformed(format!(
                    "non-input node {} has no incoming edges",
                    node.guid
                )))
            }
        };

        let op = model.get_or_create(node.kind, node.attrs.clone(), input_dims)?;
        if op.def().outputs != node.outputs {
            return Err(SerializationError::Malformed(format!(
                "node {} output shapes disagree with the file",
                node.guid
            )));
        }
        graph.add_node(&op);
        if let Some(edges) = incoming.get(&node.guid) {
            for edge in edges {
                let src = built
                    .get(&edge.src_guid)
                    .cloned()
                    .expect("producers checked above");
                graph.add_edge(&src, edge.src_idx, &op, edge.dst_idx)?;
            }
        }
        built.insert(node.guid, op);
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewire_core::{ActiMode, AnalyticOracle};

    fn model() -> Model {
        Model::new(Box::new(AnalyticOracle::default()))
    }

    fn fire_module(model: &mut Model) -> Graph {
        let mut graph = Graph::new();
        let input = graph.input(model, TensorDims::d4(1, 96, 55, 55)).unwrap();
        let squeeze = graph
            .conv2d(model, &input, 16, (1, 1), (1, 1), (0, 0), ActiMode::Relu)
            .unwrap();
        let left = graph
            .conv2d(model, &squeeze, 64, (3, 3), (1, 1), (1, 1), ActiMode::Relu)
            .unwrap();
        let right = graph
            .conv2d(model, &squeeze, 64, (1, 1), (1, 1), (0, 0), ActiMode::Relu)
            .unwrap();
        graph.concat(model, &[&left, &right]).unwrap();
        graph
    }

    #[test]
    fn test_roundtrip_preserves_hash() {
        let mut model = model();
        let graph = fire_module(&mut model);
        let file = export_graph(&graph, "fire").unwrap();
        let rebuilt = import_graph(&file, &mut model).unwrap();

        assert_eq!(rebuilt.node_count(), graph.node_count());
        assert_eq!(rebuilt.edge_count(), graph.edge_count());
        assert_eq!(rebuilt.hash().unwrap(), graph.hash().unwrap());
    }

    #[test]
    fn test_roundtrip_through_json() {
        let mut model = model();
        let graph = fire_module(&mut model);
        let file = export_graph(&graph, "fire").unwrap();
        let json = serde_json::to_string_pretty(&file).unwrap();
        let parsed: GraphFile = serde_json::from_str(&json).unwrap();
        let rebuilt = import_graph(&parsed, &mut model).unwrap();
        assert_eq!(rebuilt.hash().unwrap(), graph.hash().unwrap());
    }

    #[test]
    fn test_import_rejects_forward_reference() {
        let mut model = model();
        let graph = fire_module(&mut model);
        let mut file = export_graph(&graph, "fire").unwrap();
        file.graph.nodes.reverse();

        assert!(matches!(
            import_graph(&file, &mut model),
            Err(SerializationError::Malformed(_))
        ));
    }

    #[test]
    fn test_import_rejects_dangling_non_input() {
        let mut model = model();
        let graph = fire_module(&mut model);
        let mut file = export_graph(&graph, "fire").unwrap();
        file.graph.edges.clear();

        assert!(matches!(
            import_graph(&file, &mut model),
            Err(SerializationError::Malformed(_))
        ));
    }
}
