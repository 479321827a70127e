//! Graph serialization (.rdag files)
//!
//! Exported graphs are JSON documents: a schema version, the nodes in
//! topological order (kind + attributes + guid + output shapes), and the
//! edges as `(src_guid, src_idx, dst_guid, dst_idx)` tuples. Importing an
//! exported graph yields a graph with the same structural hash; guids are
//! re-assigned by the model catalog.

pub mod error;
pub mod io;
pub mod schema;
pub mod version;

// Re-export main types
pub use error::{Result, SerializationError};
pub use io::{load_graph_file, load_graph_file_str, save_graph_file, save_graph_file_str};
pub use schema::{export_graph, import_graph, EdgeDef, GraphDef, GraphFile, NodeDef};
pub use version::SchemaVersion;
