//! Filesystem-backed content-addressed store
//!
//! Layout: `<root>/<scope>/<hh>/<address-hex>` where `scope` is the task id
//! and `hh` is the first two hex chars of the address. Writes go through a
//! temp file and an atomic rename, so two writers racing on the same
//! address cannot leave a torn object (the bytes are identical by
//! definition of the address). Retrieval re-hashes and compares against the
//! address encoded in the filename.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use rpack_core::{RpackError, RpackResult};

use crate::address::ContentAddress;

const TMP_DIR: &str = ".tmp";

/// A blob persisted by [`ContentStore::put`].
#[derive(Debug, Clone)]
pub struct StoredBlob {
    /// Absolute path of the stored object
    pub path: PathBuf,
    pub address: ContentAddress,
}

/// Content-addressed blob store rooted at a local directory.
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> RpackResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(TMP_DIR))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store bytes under the given scope, returning path and address.
    ///
    /// Idempotent: an object that already exists short-circuits the write.
    pub fn put(&self, scope: &str, bytes: &[u8]) -> RpackResult<StoredBlob> {
        validate_scope(scope)?;

        let address = ContentAddress::for_bytes(bytes);
        let path = self.object_path(scope, &address);

        if path.exists() {
            debug!(%address, scope, "store hit, write short-circuited");
            return Ok(StoredBlob { path, address });
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Unique temp name per writer; the final rename is atomic.
        let tmp = self
            .root
            .join(TMP_DIR)
            .join(format!("{}.{}.partial", address.to_hex(), Uuid::new_v4()));
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;

        debug!(%address, scope, len = bytes.len(), "blob stored");
        Ok(StoredBlob { path, address })
    }

    /// Retrieve a stored object by its path.
    ///
    /// The expected address is recovered from the object filename; bytes
    /// that no longer hash to it fail with `IntegrityMismatch`, which the
    /// caller must treat as fatal for this source.
    pub fn get(&self, path: &Path) -> RpackResult<Vec<u8>> {
        let expected = address_of_object_path(path)?;

        let bytes = fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RpackError::NotFound(path.display().to_string())
            } else {
                RpackError::Io(e)
            }
        })?;

        let actual = ContentAddress::for_bytes(&bytes);
        if actual != expected {
            return Err(RpackError::IntegrityMismatch {
                expected: expected.to_hex(),
                actual: actual.to_hex(),
            });
        }

        Ok(bytes)
    }

    /// Retrieve a stored object by scope and address.
    pub fn get_by_address(&self, scope: &str, address: &ContentAddress) -> RpackResult<Vec<u8>> {
        validate_scope(scope)?;
        self.get(&self.object_path(scope, address))
    }

    /// Whether an object is present locally.
    pub fn contains(&self, scope: &str, address: &ContentAddress) -> bool {
        self.object_path(scope, address).is_file()
    }

    fn object_path(&self, scope: &str, address: &ContentAddress) -> PathBuf {
        let hex = address.to_hex();
        self.root.join(scope).join(&hex[..2]).join(hex)
    }
}

/// Recover the content address encoded in a stored object's filename.
fn address_of_object_path(path: &Path) -> RpackResult<ContentAddress> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            RpackError::InvalidInput(format!("not a store object path: {}", path.display()))
        })?;
    ContentAddress::from_hex(name)
}

/// Scopes become path components; keep them to a single clean component.
fn validate_scope(scope: &str) -> RpackResult<()> {
    if scope.is_empty()
        || scope.contains(['/', '\\'])
        || scope == "."
        || scope == ".."
        || scope == TMP_DIR
    {
        return Err(RpackError::InvalidInput(format!(
            "invalid store scope: {scope:?}"
        )));
    }
    Ok(())
}
