//! Rewire Graph - Dataflow graphs and the model catalog
//!
//! This crate provides the graph layer of the Rewire optimizer:
//!
//! - [`graph`] - The DAG of operator instances with per-node edge maps,
//!   structural hashing, cost accounting, and high-level builder operations
//! - [`model`] - The [`Model`] catalog that interns operator definitions and
//!   measures each distinct definition once through the cost oracle
//! - [`serialization`] - JSON export/import of graphs (`.rdag` files)
//!
//! Substitutions and the search driver live in `rewire-search`.

pub mod graph;
pub mod model;
pub mod serialization;

// Re-export main types
pub use graph::{Edge, Graph, GraphError};
pub use model::Model;
pub use serialization::{export_graph, import_graph, GraphFile, SerializationError};
