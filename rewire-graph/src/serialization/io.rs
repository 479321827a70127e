//! File I/O for exported graphs

use std::fs;
use std::path::Path;

use super::error::{Result, SerializationError};
use super::schema::GraphFile;
use super::version::SchemaVersion;

fn validate_version(version: &SchemaVersion, expected_major: u32) -> Result<()> {
    if !version.is_compatible(expected_major) {
        return Err(SerializationError::VersionMismatch {
            file_major: version.major,
            file_minor: version.minor,
            expected_major,
        });
    }
    Ok(())
}

/// Load a graph file
pub fn load_graph_file(path: impl AsRef<Path>) -> Result<GraphFile> {
    let content = fs::read_to_string(path)?;
    load_graph_file_str(&content)
}

/// Save a graph file
pub fn save_graph_file(file: &GraphFile, path: impl AsRef<Path>) -> Result<()> {
    let content = save_graph_file_str(file)?;
    fs::write(path, content)?;
    Ok(())
}

/// Load a graph file from a JSON string
pub fn load_graph_file_str(json: &str) -> Result<GraphFile> {
    let file: GraphFile = serde_json::from_str(json)?;
    validate_version(&file.version, 1)?;
    Ok(file)
}

/// Serialize a graph file to a JSON string
pub fn save_graph_file_str(file: &GraphFile) -> Result<String> {
    Ok(serde_json::to_string_pretty(file)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::serialization::schema::export_graph;
    use rewire_core::{AnalyticOracle, TensorDims};

    #[test]
    fn test_roundtrip_str() {
        let mut model = Model::new(Box::new(AnalyticOracle::default()));
        let mut graph = crate::graph::Graph::new();
        graph
            .input(&mut model, TensorDims::d4(1, 3, 224, 224))
            .unwrap();
        let file = export_graph(&graph, "tiny").unwrap();

        let json = save_graph_file_str(&file).unwrap();
        let restored = load_graph_file_str(&json).unwrap();
        assert_eq!(restored.graph.name, "tiny");
        assert_eq!(restored.graph.nodes.len(), 1);
    }

    #[test]
    fn test_version_validation() {
        let json = r#"{
            "version": { "major": 99, "minor": 0 },
            "graph": { "name": "stale", "nodes": [], "edges": [] }
        }"#;
        assert!(matches!(
            load_graph_file_str(json),
            Err(SerializationError::VersionMismatch { .. })
        ));
    }
}
