//! Pre-run snapshot and rollback for the project tree.
//!
//! The snapshot is a full copy of the tree, taken once before any mutation
//! and stored in a content-addressed sibling directory next to the project
//! root. Partial snapshots are never retained: a failed copy is removed and
//! the run aborts before any agent writes. Restore is all-or-nothing; a
//! failure after the root has been cleared surfaces as `RestorePartial`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::error::PipelineError;
use crate::io::tree::FileTree;

/// Reference to a completed snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHandle {
    /// Content digest of the tree at snapshot time (sha256 hex).
    pub id: String,
    pub path: PathBuf,
    pub file_count: usize,
}

/// Creates the immutable pre-run snapshot and restores it on fatal failure.
#[derive(Debug, Default)]
pub struct BackupManager;

impl BackupManager {
    pub fn new() -> Self {
        Self
    }

    /// Copy the whole tree into `<name>.mender-backup-<digest12>` beside the
    /// project root and verify the copy byte-for-byte via digest.
    pub fn snapshot(&self, tree: &FileTree) -> Result<SnapshotHandle, PipelineError> {
        let id = tree.digest()?;
        let dest = snapshot_dir(tree.root(), &id)?;

        if dest.is_dir() {
            // Content-addressed: an existing snapshot with this digest is
            // already the copy we would make.
            let existing = FileTree::open(&dest)?;
            if existing.digest()? == id {
                debug!(path = %dest.display(), "reusing existing snapshot");
                let file_count = existing.files()?.len();
                return Ok(SnapshotHandle {
                    id,
                    path: dest,
                    file_count,
                });
            }
            fs::remove_dir_all(&dest).map_err(|err| {
                PipelineError::resource(format!("clear stale snapshot {}: {err}", dest.display()))
            })?;
        }

        info!(path = %dest.display(), "creating snapshot");
        if let Err(err) = copy_tree(tree, &dest) {
            // Never retain a partial backup.
            if let Err(cleanup) = fs::remove_dir_all(&dest) {
                warn!(path = %dest.display(), error = %cleanup, "failed to remove partial snapshot");
            }
            return Err(err);
        }

        let copied = FileTree::open(&dest)?;
        let copied_digest = copy_verify(&copied, &dest)?;
        if copied_digest != id {
            let _ = fs::remove_dir_all(&dest);
            return Err(PipelineError::resource(format!(
                "snapshot verification failed: digest mismatch under {}",
                dest.display()
            )));
        }

        let file_count = copied.files()?.len();
        Ok(SnapshotHandle {
            id,
            path: dest,
            file_count,
        })
    }

    /// Replace the tree contents with the snapshot's contents exactly.
    ///
    /// Verifies the snapshot still matches its recorded digest before
    /// touching the tree; any failure after clearing begins is reported as
    /// `RestorePartial`, never as success.
    pub fn restore(&self, tree: &FileTree, handle: &SnapshotHandle) -> Result<(), PipelineError> {
        let snapshot = FileTree::open(&handle.path)?;
        let snapshot_digest = snapshot.digest()?;
        if snapshot_digest != handle.id {
            return Err(PipelineError::resource(format!(
                "snapshot {} no longer matches its recorded digest",
                handle.path.display()
            )));
        }

        info!(snapshot = %handle.id, "restoring tree from snapshot");
        clear_root(tree.root()).map_err(|err| partial(handle, err))?;
        copy_tree(&snapshot, tree.root()).map_err(|err| partial(handle, err))?;

        let restored = tree.digest().map_err(|err| partial(handle, err))?;
        if restored != handle.id {
            return Err(PipelineError::RestorePartial {
                snapshot: handle.id.clone(),
                message: "restored tree digest does not match snapshot".to_string(),
            });
        }
        Ok(())
    }
}

fn partial(handle: &SnapshotHandle, err: PipelineError) -> PipelineError {
    PipelineError::RestorePartial {
        snapshot: handle.id.clone(),
        message: err.to_string(),
    }
}

fn snapshot_dir(root: &Path, digest: &str) -> Result<PathBuf, PipelineError> {
    let parent = root.parent().ok_or_else(|| {
        PipelineError::resource(format!(
            "project root {} has no parent directory for snapshots",
            root.display()
        ))
    })?;
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "project".to_string());
    let short = &digest[..digest.len().min(12)];
    Ok(parent.join(format!("{name}.mender-backup-{short}")))
}

/// Copy every directory and file from `src` under `dest_root`.
fn copy_tree(src: &FileTree, dest_root: &Path) -> Result<(), PipelineError> {
    fs::create_dir_all(dest_root).map_err(|err| {
        PipelineError::resource(format!("create {}: {err}", dest_root.display()))
    })?;
    for dir in src.dirs()? {
        let dest = dest_root.join(&dir);
        fs::create_dir_all(&dest).map_err(|err| {
            PipelineError::resource(format!("create {}: {err}", dest.display()))
        })?;
    }
    for file in src.files()? {
        let from = src.root().join(&file);
        let to = dest_root.join(&file);
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                PipelineError::resource(format!("create {}: {err}", parent.display()))
            })?;
        }
        fs::copy(&from, &to).map_err(|err| {
            PipelineError::resource(format!(
                "copy {} -> {}: {err}",
                from.display(),
                to.display()
            ))
        })?;
    }
    Ok(())
}

fn copy_verify(copied: &FileTree, dest: &Path) -> Result<String, PipelineError> {
    copied.digest().map_err(|err| {
        PipelineError::resource(format!("verify snapshot {}: {err}", dest.display()))
    })
}

fn clear_root(root: &Path) -> Result<(), PipelineError> {
    let entries = fs::read_dir(root)
        .map_err(|err| PipelineError::resource(format!("list {}: {err}", root.display())))?;
    for entry in entries {
        let entry = entry
            .map_err(|err| PipelineError::resource(format!("list {}: {err}", root.display())))?;
        let path = entry.path();
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|err| {
            PipelineError::resource(format!("remove {}: {err}", path.display()))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_tree() -> (tempfile::TempDir, FileTree) {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("project");
        fs::create_dir_all(root.join("src")).expect("mkdir");
        fs::write(root.join("src/lib.rs"), "pub fn f() {}").expect("write");
        fs::write(root.join("README.md"), "# project").expect("write");
        fs::create_dir_all(root.join("empty")).expect("mkdir");
        let tree = FileTree::open(&root).expect("open");
        (temp, tree)
    }

    #[test]
    fn snapshot_then_restore_is_byte_identical() {
        let (_temp, tree) = seeded_tree();
        let manager = BackupManager::new();
        let before = tree.digest().expect("digest");

        let handle = manager.snapshot(&tree).expect("snapshot");
        assert_eq!(handle.id, before);
        assert_eq!(handle.file_count, 2);

        manager.restore(&tree, &handle).expect("restore");
        assert_eq!(tree.digest().expect("digest"), before);
    }

    #[test]
    fn restore_undoes_mutations_and_removes_new_files() {
        let (_temp, tree) = seeded_tree();
        let manager = BackupManager::new();
        let handle = manager.snapshot(&tree).expect("snapshot");

        tree.write(Path::new("src/lib.rs"), "pub fn g() {}")
            .expect("write");
        tree.write(Path::new("src/new.rs"), "// new").expect("write");

        manager.restore(&tree, &handle).expect("restore");
        assert_eq!(tree.digest().expect("digest"), handle.id);
        assert!(!tree.exists(Path::new("src/new.rs")));
        assert_eq!(
            tree.read_to_string(Path::new("src/lib.rs")).expect("read"),
            "pub fn f() {}"
        );
    }

    #[test]
    fn snapshot_is_content_addressed_and_reused() {
        let (_temp, tree) = seeded_tree();
        let manager = BackupManager::new();

        let first = manager.snapshot(&tree).expect("snapshot");
        let second = manager.snapshot(&tree).expect("snapshot again");
        assert_eq!(first, second);
        assert!(first.path.is_dir());
    }

    #[test]
    fn restore_rejects_tampered_snapshot() {
        let (_temp, tree) = seeded_tree();
        let manager = BackupManager::new();
        let handle = manager.snapshot(&tree).expect("snapshot");

        fs::write(handle.path.join("README.md"), "tampered").expect("tamper");
        let err = manager.restore(&tree, &handle).unwrap_err();
        assert!(matches!(err, PipelineError::Resource { .. }));
    }
}
