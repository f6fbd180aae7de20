//! Embedded result manifest
//!
//! Every archive carries one manifest member recording which task produced
//! it and which entries it contains. Provenance is confidential, so the
//! manifest rides inside the encrypted archive rather than the cleartext
//! package header.

use serde::{Deserialize, Serialize};

use rpack_core::{NodeIdentity, RpackError, RpackResult, TaskResult};

/// Reserved member name of the manifest inside the archive.
///
/// User entries may not collide with it.
pub const MANIFEST_NAME: &str = ".rpack-manifest.json";

/// Provenance record embedded in every packed archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultManifest {
    /// Manifest format version
    pub version: u32,
    pub task_id: String,
    pub subtask_id: String,
    /// Cryptographic identity of the node that produced the result
    pub owner_key_id: String,
    /// Human-readable name of the producing node
    pub node_name: String,
    /// Archive member names, in pack order
    pub entries: Vec<String>,
}

impl ResultManifest {
    pub fn new(node: &NodeIdentity, result: &TaskResult, entries: Vec<String>) -> Self {
        Self {
            version: 1,
            task_id: result.task_id.clone(),
            subtask_id: result.subtask_id.clone(),
            owner_key_id: result.owner_key_id.clone(),
            node_name: node.name.clone(),
            entries,
        }
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> RpackResult<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| anyhow::anyhow!("manifest serialization: {e}").into())
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(data: &[u8]) -> RpackResult<Self> {
        serde_json::from_slice(data)
            .map_err(|e| RpackError::CorruptArchive(format!("manifest deserialization: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpack_core::TaskResult;

    #[test]
    fn test_manifest_roundtrip() {
        let node = NodeIdentity::new("worker-3", "node-key");
        let result = TaskResult::data("task-1", "subtask-1", "owner-key", vec![1, 2, 3]);
        let manifest = ResultManifest::new(
            &node,
            &result,
            vec!["out_file".into(), "out_dir/dir_file".into()],
        );

        let bytes = manifest.to_bytes().unwrap();
        let restored = ResultManifest::from_bytes(&bytes).unwrap();

        assert_eq!(restored.version, 1);
        assert_eq!(restored.task_id, "task-1");
        assert_eq!(restored.subtask_id, "subtask-1");
        assert_eq!(restored.owner_key_id, "owner-key");
        assert_eq!(restored.node_name, "worker-3");
        assert_eq!(restored.entries.len(), 2);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        let err = ResultManifest::from_bytes(b"not json").unwrap_err();
        assert!(matches!(err, RpackError::CorruptArchive(_)));
    }
}
