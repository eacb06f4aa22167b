//! Zarr node documents.
//!
//! | Version | Group marker | Attributes | Array metadata |
//! |---------|--------------|------------|----------------|
//! | v2      | `.zgroup`    | `.zattrs`  | `.zarray`      |
//! | v3      | `zarr.json`  | `zarr.json` (`attributes`) | `zarr.json` |
//!
//! Array metadata itself is interpreted by `zarrs` when a level is opened.
//! This module only answers the questions asked before that: where the
//! hierarchy starts, which nodes are arrays, and what the root attributes say.

use serde_json::{Map, Value};

use crate::error::SourceError;

/// v2 array metadata file name
pub const ZARRAY: &str = ".zarray";
/// v2 group marker file name
pub const ZGROUP: &str = ".zgroup";
/// v2 attributes file name
pub const ZATTRS: &str = ".zattrs";
/// v3 node metadata file name
pub const ZARR_JSON: &str = "zarr.json";

/// Parse a JSON object document (attributes, group markers, v3 nodes).
pub fn parse_object(path: &str, bytes: &[u8]) -> Result<Map<String, Value>, SourceError> {
    let invalid = |message: String| SourceError::InvalidMetadata {
        path: path.to_string(),
        message,
    };
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(invalid("expected a JSON object".to_string())),
        Err(e) => Err(invalid(e.to_string())),
    }
}

/// Whether a v3 `zarr.json` node describes an array.
pub fn is_array_node(node: &Map<String, Value>) -> bool {
    node.get("node_type").and_then(Value::as_str) == Some("array")
}

/// Attributes of a v3 node; absent or non-object attributes read as empty.
pub fn node_attributes(mut node: Map<String, Value>) -> Map<String, Value> {
    match node.remove("attributes") {
        Some(Value::Object(attributes)) => attributes,
        _ => Map::new(),
    }
}
