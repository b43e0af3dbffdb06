//! Pipeline identity hash
//!
//! Retry payloads are keyed by this hash, so changing a pipeline's id or
//! function list orphans whatever was persisted for the old shape.

use sha2::{Digest, Sha256};

/// Hex SHA-256 of `id`, then each function identifier, newline separated
///
/// # Example
///
/// ```
/// use edgeflow_pipeline::pipeline_hash;
///
/// let a = pipeline_hash("p", &["to_xml", "export"]);
/// let b = pipeline_hash("p", &["to_json", "export"]);
/// assert_ne!(a, b);
/// assert_eq!(a.len(), 64);
/// ```
pub fn pipeline_hash(id: &str, identifiers: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update(b"\n");
    hasher.update(identifiers.join("\n").as_bytes());
    hex::encode(hasher.finalize())
}
