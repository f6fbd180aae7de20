//! Archive pack/unpack
//!
//! Packed archive format: a tar stream compressed with zstd. Listed entries
//! keep their paths relative to the pack root; the manifest is appended
//! under its reserved name as the final member. Timestamps are whatever tar
//! records, so archives are not bit-deterministic; member payloads are.

use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use tar::Header;
use tracing::debug;

use rpack_core::{RpackError, RpackResult};

use crate::manifest::{ResultManifest, MANIFEST_NAME};

/// Member name used when a raw-bytes payload is packaged instead of files.
pub const INLINE_PAYLOAD_NAME: &str = "result.payload";

/// Pack the listed entries (paths relative to `root`) plus the manifest
/// into one compressed archive.
///
/// Entries may be files or directories; a directory entry records the
/// directory itself (empty directories survive the round trip). Paths that
/// are absolute, escape `root`, or collide with the reserved manifest name
/// are rejected with `InvalidInput` before anything is read.
pub fn pack(
    root: &Path,
    entries: &[PathBuf],
    manifest: &ResultManifest,
    zstd_level: i32,
) -> RpackResult<Vec<u8>> {
    for rel in entries {
        if !is_clean_relative(rel) {
            return Err(RpackError::InvalidInput(format!(
                "entry path escapes the pack root: {}",
                rel.display()
            )));
        }
        if rel == Path::new(MANIFEST_NAME) {
            return Err(RpackError::InvalidInput(format!(
                "entry path collides with the reserved manifest name {MANIFEST_NAME}"
            )));
        }
    }

    let mut builder = tar::Builder::new(Vec::new());

    for rel in entries {
        let abs = root.join(rel);
        let meta = fs::symlink_metadata(&abs).map_err(|e| {
            RpackError::InvalidInput(format!("entry {} is not readable: {e}", rel.display()))
        })?;

        if meta.is_dir() {
            builder.append_dir(rel, &abs)?;
        } else if meta.is_file() {
            builder.append_path_with_name(&abs, rel)?;
        } else {
            return Err(RpackError::InvalidInput(format!(
                "entry {} is neither a regular file nor a directory",
                rel.display()
            )));
        }
    }

    let manifest_bytes = manifest.to_bytes()?;
    let mut header = Header::new_gnu();
    header.set_size(manifest_bytes.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, MANIFEST_NAME, &manifest_bytes[..])?;

    let tar_bytes = builder.into_inner()?;
    debug!(
        entries = entries.len(),
        tar_len = tar_bytes.len(),
        "archive packed"
    );

    Ok(zstd::encode_all(&tar_bytes[..], zstd_level)?)
}

/// Pack a raw-bytes payload as a single synthetic member plus the
/// manifest, so inline results unpack the same way file results do.
pub fn pack_data(
    payload: &[u8],
    manifest: &ResultManifest,
    zstd_level: i32,
) -> RpackResult<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());

    let mut header = Header::new_gnu();
    header.set_size(payload.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, INLINE_PAYLOAD_NAME, payload)?;

    let manifest_bytes = manifest.to_bytes()?;
    let mut header = Header::new_gnu();
    header.set_size(manifest_bytes.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, MANIFEST_NAME, &manifest_bytes[..])?;

    let tar_bytes = builder.into_inner()?;
    debug!(payload_len = payload.len(), "inline payload packed");

    Ok(zstd::encode_all(&tar_bytes[..], zstd_level)?)
}

/// Unpack an archive into `target_dir`, creating it if absent.
///
/// Returns the embedded manifest and the relative paths of all unpacked
/// members, in archive order. Structural problems (bad compression,
/// truncated entries, hostile member paths, a missing manifest) surface
/// as `CorruptArchive`; partial writes stay confined to `target_dir`.
pub fn unpack(bytes: &[u8], target_dir: &Path) -> RpackResult<(ResultManifest, Vec<PathBuf>)> {
    let tar_bytes = zstd::decode_all(bytes)
        .map_err(|e| RpackError::CorruptArchive(format!("zstd decompression failed: {e}")))?;

    fs::create_dir_all(target_dir)?;

    let mut archive = tar::Archive::new(&tar_bytes[..]);
    let mut manifest_bytes: Option<Vec<u8>> = None;
    let mut files = Vec::new();

    let entries = archive
        .entries()
        .map_err(|e| RpackError::CorruptArchive(format!("unreadable tar stream: {e}")))?;

    for entry in entries {
        let mut entry =
            entry.map_err(|e| RpackError::CorruptArchive(format!("truncated tar entry: {e}")))?;

        let rel: PathBuf = entry
            .path()
            .map_err(|e| RpackError::CorruptArchive(format!("bad entry path: {e}")))?
            .into_owned();

        if !is_clean_relative(&rel) {
            return Err(RpackError::CorruptArchive(format!(
                "entry path escapes the extraction directory: {}",
                rel.display()
            )));
        }

        if rel == Path::new(MANIFEST_NAME) {
            let mut buf = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut buf).map_err(|e| {
                RpackError::CorruptArchive(format!("truncated manifest member: {e}"))
            })?;
            manifest_bytes = Some(buf);
            continue;
        }

        let unpacked = entry.unpack_in(target_dir).map_err(|e| {
            RpackError::CorruptArchive(format!("failed to unpack {}: {e}", rel.display()))
        })?;
        if !unpacked {
            return Err(RpackError::CorruptArchive(format!(
                "entry {} was refused by the extractor",
                rel.display()
            )));
        }

        files.push(rel);
    }

    let manifest_bytes = manifest_bytes.ok_or_else(|| {
        RpackError::CorruptArchive(format!("archive has no {MANIFEST_NAME} member"))
    })?;
    let manifest = ResultManifest::from_bytes(&manifest_bytes)?;

    debug!(files = files.len(), target = %target_dir.display(), "archive unpacked");
    Ok((manifest, files))
}

/// True when the path is relative and contains no `..`/root components, so
/// joining it under a directory can never leave that directory.
fn is_clean_relative(path: &Path) -> bool {
    if path.as_os_str().is_empty() {
        return false;
    }
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpack_core::{NodeIdentity, TaskResult};
    use tempfile::tempdir;

    fn test_manifest(entries: &[&str]) -> ResultManifest {
        let node = NodeIdentity::new("test-node", "test-key");
        let result = TaskResult::files("task-a", "subtask-a", "owner", vec![]);
        ResultManifest::new(&node, &result, entries.iter().map(|s| s.to_string()).collect())
    }

    fn write_fixture(root: &Path) -> Vec<PathBuf> {
        fs::write(root.join("out_file"), b"File contents").unwrap();
        fs::create_dir_all(root.join("out_dir")).unwrap();
        fs::write(root.join("out_dir/dir_file"), b"Dir file contents").unwrap();
        vec![
            PathBuf::from("out_file"),
            PathBuf::from("out_dir/dir_file"),
        ]
    }

    #[test]
    fn test_pack_unpack_roundtrip() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        let entries = write_fixture(src.path());

        let packed = pack(
            src.path(),
            &entries,
            &test_manifest(&["out_file", "out_dir/dir_file"]),
            3,
        )
        .unwrap();
        let (manifest, files) = unpack(&packed, dst.path()).unwrap();

        assert_eq!(manifest.task_id, "task-a");
        assert_eq!(files, entries);
        assert_eq!(
            fs::read(dst.path().join("out_file")).unwrap(),
            b"File contents"
        );
        assert_eq!(
            fs::read(dst.path().join("out_dir/dir_file")).unwrap(),
            b"Dir file contents"
        );
    }

    #[test]
    fn test_empty_directory_survives() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        fs::create_dir_all(src.path().join("empty_dir")).unwrap();

        let packed = pack(
            src.path(),
            &[PathBuf::from("empty_dir")],
            &test_manifest(&["empty_dir"]),
            3,
        )
        .unwrap();
        let (_, files) = unpack(&packed, dst.path()).unwrap();

        assert_eq!(files, vec![PathBuf::from("empty_dir")]);
        assert!(dst.path().join("empty_dir").is_dir());
    }

    #[test]
    fn test_unpack_creates_target_dir() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        let entries = write_fixture(src.path());
        let packed = pack(src.path(), &entries, &test_manifest(&[]), 3).unwrap();

        let target = dst.path().join("fresh/nested");
        unpack(&packed, &target).unwrap();
        assert!(target.join("out_file").is_file());
    }

    #[test]
    fn test_pack_rejects_traversal() {
        let src = tempdir().unwrap();
        let err = pack(
            src.path(),
            &[PathBuf::from("../escape")],
            &test_manifest(&[]),
            3,
        )
        .unwrap_err();
        assert!(matches!(err, RpackError::InvalidInput(_)));
    }

    #[test]
    fn test_pack_rejects_absolute_path() {
        let src = tempdir().unwrap();
        let err = pack(
            src.path(),
            &[PathBuf::from("/etc/passwd")],
            &test_manifest(&[]),
            3,
        )
        .unwrap_err();
        assert!(matches!(err, RpackError::InvalidInput(_)));
    }

    #[test]
    fn test_pack_rejects_reserved_name() {
        let src = tempdir().unwrap();
        fs::write(src.path().join(MANIFEST_NAME), b"{}").unwrap();
        let err = pack(
            src.path(),
            &[PathBuf::from(MANIFEST_NAME)],
            &test_manifest(&[]),
            3,
        )
        .unwrap_err();
        assert!(matches!(err, RpackError::InvalidInput(_)));
    }

    #[test]
    fn test_pack_rejects_missing_entry() {
        let src = tempdir().unwrap();
        let err = pack(
            src.path(),
            &[PathBuf::from("does_not_exist")],
            &test_manifest(&[]),
            3,
        )
        .unwrap_err();
        assert!(matches!(err, RpackError::InvalidInput(_)));
    }

    #[test]
    fn test_unpack_rejects_garbage() {
        let dst = tempdir().unwrap();
        let err = unpack(b"definitely not zstd", dst.path()).unwrap_err();
        assert!(matches!(err, RpackError::CorruptArchive(_)));
    }

    #[test]
    fn test_unpack_rejects_corrupted_stream() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        let entries = write_fixture(src.path());
        let mut packed = pack(src.path(), &entries, &test_manifest(&[]), 3).unwrap();

        let mid = packed.len() / 2;
        packed[mid] ^= 0xFF;
        packed.truncate(mid + 1);

        let err = unpack(&packed, dst.path()).unwrap_err();
        assert!(matches!(err, RpackError::CorruptArchive(_)));
    }

    #[test]
    fn test_unpack_requires_manifest() {
        let dst = tempdir().unwrap();

        // A structurally valid archive with no manifest member.
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = Header::new_gnu();
        header.set_size(5);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, "plain", &b"hello"[..]).unwrap();
        let tar_bytes = builder.into_inner().unwrap();
        let packed = zstd::encode_all(&tar_bytes[..], 3).unwrap();

        let err = unpack(&packed, dst.path()).unwrap_err();
        assert!(matches!(err, RpackError::CorruptArchive(_)));
    }

    #[test]
    fn test_pack_data_roundtrip() {
        let dst = tempdir().unwrap();
        let payload = b"raw result bytes";

        let packed = pack_data(payload, &test_manifest(&[INLINE_PAYLOAD_NAME]), 3).unwrap();
        let (manifest, files) = unpack(&packed, dst.path()).unwrap();

        assert_eq!(files, vec![PathBuf::from(INLINE_PAYLOAD_NAME)]);
        assert_eq!(manifest.entries, vec![INLINE_PAYLOAD_NAME.to_string()]);
        assert_eq!(
            fs::read(dst.path().join(INLINE_PAYLOAD_NAME)).unwrap(),
            payload
        );
    }

    #[test]
    fn test_binary_content_fidelity() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        let blob: Vec<u8> = (0..=255u8).cycle().take(70_000).collect();
        fs::write(src.path().join("blob.bin"), &blob).unwrap();

        let packed = pack(
            src.path(),
            &[PathBuf::from("blob.bin")],
            &test_manifest(&["blob.bin"]),
            3,
        )
        .unwrap();
        unpack(&packed, dst.path()).unwrap();

        assert_eq!(fs::read(dst.path().join("blob.bin")).unwrap(), blob);
    }

    proptest::proptest! {
        #[test]
        fn roundtrip_preserves_bytes(data in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..=4096)) {
            let src = tempdir().unwrap();
            let dst = tempdir().unwrap();
            fs::write(src.path().join("f"), &data).unwrap();

            let packed = pack(src.path(), &[PathBuf::from("f")], &test_manifest(&["f"]), 1).unwrap();
            unpack(&packed, dst.path()).unwrap();

            proptest::prop_assert_eq!(fs::read(dst.path().join("f")).unwrap(), data);
        }
    }
}
