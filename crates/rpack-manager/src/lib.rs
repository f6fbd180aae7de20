//! rpack-manager: the result package manager
//!
//! Orchestrates the full packaging pipeline. `create` packs a task's
//! produced files (or inline bytes) into an archive, seals it with a
//! per-package secret, and hands the ciphertext to the content-addressed
//! store. `extract` is the inverse: retrieve (integrity-checked), open,
//! and unpack into a fresh extraction directory.
//!
//! The manager is stateless across calls; concurrent creates and extracts
//! share nothing but the store's durable data. It never retries and never
//! transmits secrets.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use rpack_archive::{pack, pack_data, unpack, ResultManifest, INLINE_PAYLOAD_NAME};
use rpack_core::config::RpackConfig;
use rpack_core::{NodeIdentity, ResultPayload, RpackError, RpackResult, TaskResult};
use rpack_crypto::{open, seal, Secret, SecretGenerator};
use rpack_store::{ContentStore, StoredBlob, TaskWorkspace};

/// Result of one `extract` call.
///
/// The extraction directory is private to this call; cleanup is the
/// caller's responsibility.
#[derive(Debug)]
pub struct ExtractedPackage {
    /// Root of the unpacked file tree
    pub files_dir: PathBuf,
    /// Relative paths of the unpacked members, in archive order
    pub files: Vec<PathBuf>,
    /// Provenance carried inside the package
    pub manifest: ResultManifest,
}

pub struct ResultPackageManager {
    workspace: TaskWorkspace,
    store: ContentStore,
    secrets: SecretGenerator,
    zstd_level: i32,
}

impl ResultPackageManager {
    pub fn new(
        workspace: TaskWorkspace,
        store: ContentStore,
        secrets: SecretGenerator,
        zstd_level: i32,
    ) -> Self {
        Self {
            workspace,
            store,
            secrets,
            zstd_level,
        }
    }

    /// Wire up workspace, store, and secret generator from one config.
    pub fn from_config(config: &RpackConfig) -> RpackResult<Self> {
        let workspace = TaskWorkspace::from_config(&config.workspace);
        let store = ContentStore::new(workspace.output_root())?;
        let secrets = SecretGenerator::from_config(&config.secret)?;
        Ok(Self::new(workspace, store, secrets, config.archive.zstd_level))
    }

    pub fn workspace(&self) -> &TaskWorkspace {
        &self.workspace
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Generate a fresh per-package secret.
    ///
    /// Exposed so the caller holds the secret before `create` and can
    /// transmit it out-of-band to the extracting party.
    pub fn gen_secret(&self) -> RpackResult<Secret> {
        self.secrets.generate()
    }

    /// Package a task result: pack, seal with `secret`, store.
    ///
    /// Writes exactly one new blob unless deduplicated by identical
    /// ciphertext. `Files` payloads must live inside the task's resource
    /// directory; anything else fails with `InvalidResult` before any
    /// blob is written.
    pub fn create(
        &self,
        node: &NodeIdentity,
        result: &TaskResult,
        secret: &Secret,
    ) -> RpackResult<StoredBlob> {
        let res_dir = self.workspace.resource_dir(&result.task_id);

        let archive = match &result.payload {
            ResultPayload::Files(paths) => {
                if !res_dir.is_dir() {
                    return Err(RpackError::InvalidResult(format!(
                        "task {} has no resource directory at {}",
                        result.task_id,
                        res_dir.display()
                    )));
                }
                let entries = relative_to_resource_dir(paths, &res_dir)?;
                let names = entries
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect();
                let manifest = ResultManifest::new(node, result, names);
                pack(&res_dir, &entries, &manifest, self.zstd_level)?
            }
            ResultPayload::Data(bytes) => {
                let manifest =
                    ResultManifest::new(node, result, vec![INLINE_PAYLOAD_NAME.to_string()]);
                pack_data(bytes, &manifest, self.zstd_level)?
            }
        };

        let sealed = seal(secret, &archive)?;
        let blob = self.store.put(&result.task_id, &sealed)?;

        info!(
            task_id = %result.task_id,
            subtask_id = %result.subtask_id,
            address = %blob.address,
            "result package created"
        );
        Ok(blob)
    }

    /// Retrieve, open, and unpack a stored package.
    ///
    /// Fails `DecryptionFailed` on any authentication failure (wrong
    /// secret and tampered data are indistinguishable), `NotFound` /
    /// `IntegrityMismatch` from the store, `CorruptArchive` on structural
    /// damage. A failed unpack removes its extraction directory, so no
    /// partial tree survives.
    pub fn extract(&self, path: &Path, secret: &Secret) -> RpackResult<ExtractedPackage> {
        let sealed = self.store.get(path)?;
        let archive = open(secret, &sealed)?;

        let files_dir = self.workspace.extraction_dir();
        let (manifest, files) = match unpack(&archive, &files_dir) {
            Ok(unpacked) => unpacked,
            Err(e) => {
                let _ = fs::remove_dir_all(&files_dir);
                return Err(e);
            }
        };

        info!(
            task_id = %manifest.task_id,
            files = files.len(),
            files_dir = %files_dir.display(),
            "result package extracted"
        );
        Ok(ExtractedPackage {
            files_dir,
            files,
            manifest,
        })
    }
}

/// Resolve payload paths against the resource directory and require every
/// one of them to stay inside it.
///
/// Paths are canonicalized, so symlinks pointing out of the directory are
/// rejected along with `..` traversal.
fn relative_to_resource_dir(paths: &[PathBuf], res_dir: &Path) -> RpackResult<Vec<PathBuf>> {
    let canon_res = res_dir.canonicalize()?;

    let mut entries = Vec::with_capacity(paths.len());
    for path in paths {
        let abs = if path.is_absolute() {
            path.clone()
        } else {
            res_dir.join(path)
        };
        let canon = abs.canonicalize().map_err(|e| {
            RpackError::InvalidResult(format!(
                "result path {} is not readable: {e}",
                path.display()
            ))
        })?;
        let rel = canon.strip_prefix(&canon_res).map_err(|_| {
            RpackError::InvalidResult(format!(
                "result path {} is outside the task resource directory",
                path.display()
            ))
        })?;
        entries.push(rel.to_path_buf());
    }
    Ok(entries)
}
