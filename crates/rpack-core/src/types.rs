use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identity of the node that produced a result.
///
/// Carried as metadata alongside the package; never consumed by the
/// encryption path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub name: String,
    pub key: String,
}

impl NodeIdentity {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
        }
    }
}

/// The payload of a computed result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResultPayload {
    /// Paths produced by the task, resolved against its resource directory.
    Files(Vec<PathBuf>),
    /// Raw bytes, packaged as a single synthetic file entry.
    Data(Vec<u8>),
}

/// Descriptor of one subtask result handed to the package manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub subtask_id: String,
    /// Cryptographic identity of the producing node (provenance only).
    pub owner_key_id: String,
    pub payload: ResultPayload,
}

impl TaskResult {
    pub fn files(
        task_id: impl Into<String>,
        subtask_id: impl Into<String>,
        owner_key_id: impl Into<String>,
        paths: Vec<PathBuf>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            subtask_id: subtask_id.into(),
            owner_key_id: owner_key_id.into(),
            payload: ResultPayload::Files(paths),
        }
    }

    pub fn data(
        task_id: impl Into<String>,
        subtask_id: impl Into<String>,
        owner_key_id: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            subtask_id: subtask_id.into(),
            owner_key_id: owner_key_id.into(),
            payload: ResultPayload::Data(bytes),
        }
    }
}
