//! Node-scoped task directory namespace
//!
//! Layout under the workspace root:
//! ```text
//! <root>/<node_name>/res/<task_id>/   task inputs and produced files
//! <root>/<node_name>/out/             content-addressed package blobs
//! <root>/<node_name>/extract/<uuid>/  one fresh directory per extract call
//! ```
//!
//! Pure path provider: nothing here owns business logic, and only the
//! explicit `create_*` helpers touch the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use rpack_core::config::WorkspaceConfig;
use rpack_core::RpackResult;

pub struct TaskWorkspace {
    root: PathBuf,
    node_name: String,
}

impl TaskWorkspace {
    pub fn new(root: impl Into<PathBuf>, node_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            node_name: node_name.into(),
        }
    }

    pub fn from_config(config: &WorkspaceConfig) -> Self {
        Self::new(config.root.clone(), config.node_name.clone())
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn node_root(&self) -> PathBuf {
        self.root.join(&self.node_name)
    }

    /// Where a task's inputs and produced files live.
    ///
    /// Callers are expected to have created and populated this before
    /// packaging; the manager never creates it.
    pub fn resource_dir(&self, task_id: &str) -> PathBuf {
        self.node_root().join("res").join(task_id)
    }

    /// Root directory for stored package blobs.
    pub fn output_root(&self) -> PathBuf {
        self.node_root().join("out")
    }

    /// A fresh, never-reused extraction target.
    pub fn extraction_dir(&self) -> PathBuf {
        self.node_root().join("extract").join(Uuid::new_v4().to_string())
    }

    /// Create (if needed) and return a task's resource directory.
    pub fn create_resource_dir(&self, task_id: &str) -> RpackResult<PathBuf> {
        let dir = self.resource_dir(task_id);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
