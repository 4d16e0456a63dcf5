//! Rooted handle over the mutable project tree.
//!
//! Every read and write goes through [`FileTree::resolve`], which rejects
//! absolute paths and parent traversal, so no agent can touch a path outside
//! the tree root. Listings and digests are sorted for deterministic output.

use std::fs;
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::core::error::PipelineError;
use crate::io::report_store::{REPORT_JSON, REPORT_MARKDOWN};

/// The shared mutable resource all agents read and write.
#[derive(Debug, Clone)]
pub struct FileTree {
    root: PathBuf,
}

impl FileTree {
    /// Open an existing directory as the project tree.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(PipelineError::resource(format!(
                "project root {} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a root-relative path, rejecting escapes.
    pub fn resolve(&self, rel: &Path) -> Result<PathBuf, PipelineError> {
        if rel.is_absolute() {
            return Err(PipelineError::resource(format!(
                "absolute path {} rejected; tree paths are root-relative",
                rel.display()
            )));
        }
        for component in rel.components() {
            if matches!(component, Component::ParentDir) {
                return Err(PipelineError::resource(format!(
                    "path {} escapes the tree root",
                    rel.display()
                )));
            }
        }
        Ok(self.root.join(rel))
    }

    pub fn exists(&self, rel: &Path) -> bool {
        self.resolve(rel).map(|p| p.exists()).unwrap_or(false)
    }

    pub fn is_dir(&self, rel: &Path) -> bool {
        self.resolve(rel).map(|p| p.is_dir()).unwrap_or(false)
    }

    pub fn read_to_string(&self, rel: &Path) -> Result<String, PipelineError> {
        let path = self.resolve(rel)?;
        fs::read_to_string(&path).map_err(|err| {
            PipelineError::resource(format!("read {}: {err}", path.display()))
        })
    }

    /// Write a file, creating parent directories as needed.
    pub fn write(&self, rel: &Path, contents: &str) -> Result<(), PipelineError> {
        let path = self.resolve(rel)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| PipelineError::Write {
                path: parent.display().to_string(),
                message: err.to_string(),
            })?;
        }
        fs::write(&path, contents).map_err(|err| PipelineError::Write {
            path: path.display().to_string(),
            message: err.to_string(),
        })
    }

    pub fn create_dir_all(&self, rel: &Path) -> Result<(), PipelineError> {
        let path = self.resolve(rel)?;
        fs::create_dir_all(&path).map_err(|err| PipelineError::Write {
            path: path.display().to_string(),
            message: err.to_string(),
        })
    }

    /// All regular files under the root, as sorted root-relative paths.
    pub fn files(&self) -> Result<Vec<PathBuf>, PipelineError> {
        let (_, mut files) = self.walk()?;
        files.sort();
        Ok(files)
    }

    /// All directories under the root, as sorted root-relative paths.
    pub fn dirs(&self) -> Result<Vec<PathBuf>, PipelineError> {
        let (mut dirs, _) = self.walk()?;
        dirs.sort();
        Ok(dirs)
    }

    /// Content digest over the whole tree: sha256 of sorted (path, bytes)
    /// pairs. Two trees with identical file contents have equal digests.
    pub fn digest(&self) -> Result<String, PipelineError> {
        let files = self.files()?;
        let mut hasher = Sha256::new();
        for rel in files {
            let path = self.root.join(&rel);
            let bytes = fs::read(&path).map_err(|err| {
                PipelineError::resource(format!("read {}: {err}", path.display()))
            })?;
            hasher.update(rel.to_string_lossy().as_bytes());
            hasher.update([0u8]);
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(&bytes);
        }
        Ok(hex::encode(hasher.finalize()))
    }

    /// Cheap accessibility check used between phase steps.
    pub fn probe(&self) -> Result<(), PipelineError> {
        fs::read_dir(&self.root).map_err(|err| {
            PipelineError::resource(format!("list {}: {err}", self.root.display()))
        })?;
        Ok(())
    }

    fn walk(&self) -> Result<(Vec<PathBuf>, Vec<PathBuf>), PipelineError> {
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let entries = fs::read_dir(&dir).map_err(|err| {
                PipelineError::resource(format!("list {}: {err}", dir.display()))
            })?;
            for entry in entries {
                let entry = entry.map_err(|err| {
                    PipelineError::resource(format!("list {}: {err}", dir.display()))
                })?;
                let path = entry.path();
                let rel = path
                    .strip_prefix(&self.root)
                    .expect("walk stays under root")
                    .to_path_buf();
                let kind = entry.file_type().map_err(|err| {
                    PipelineError::resource(format!("stat {}: {err}", path.display()))
                })?;
                if kind.is_dir() {
                    dirs.push(rel);
                    pending.push(path);
                } else if kind.is_file() {
                    // Report artifacts are run outputs, not project content;
                    // they never count toward listings or digests.
                    if dir == self.root
                        && rel
                            .to_str()
                            .is_some_and(|n| n == REPORT_MARKDOWN || n == REPORT_JSON)
                    {
                        continue;
                    }
                    files.push(rel);
                }
            }
        }
        Ok((dirs, files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> (tempfile::TempDir, FileTree) {
        let temp = tempfile::tempdir().expect("tempdir");
        let tree = FileTree::open(temp.path()).expect("open");
        (temp, tree)
    }

    #[test]
    fn open_rejects_missing_root() {
        let temp = tempfile::tempdir().expect("tempdir");
        let missing = temp.path().join("absent");
        let err = FileTree::open(&missing).unwrap_err();
        assert!(matches!(err, PipelineError::Resource { .. }));
    }

    #[test]
    fn resolve_rejects_absolute_and_parent_paths() {
        let (_temp, tree) = sample_tree();
        assert!(tree.resolve(Path::new("/etc/passwd")).is_err());
        assert!(tree.resolve(Path::new("../outside.txt")).is_err());
        assert!(tree.resolve(Path::new("src/../../outside.txt")).is_err());
        assert!(tree.resolve(Path::new("src/inside.txt")).is_ok());
    }

    #[test]
    fn write_creates_parents_and_files_lists_sorted() {
        let (_temp, tree) = sample_tree();
        tree.write(Path::new("src/b.rs"), "b").expect("write");
        tree.write(Path::new("src/a.rs"), "a").expect("write");
        tree.write(Path::new("README.md"), "readme").expect("write");

        let files = tree.files().expect("files");
        assert_eq!(
            files,
            vec![
                PathBuf::from("README.md"),
                PathBuf::from("src/a.rs"),
                PathBuf::from("src/b.rs"),
            ]
        );
        assert!(tree.is_dir(Path::new("src")));
    }

    #[test]
    fn report_artifacts_are_invisible_to_listings_and_digests() {
        let (_temp, tree) = sample_tree();
        tree.write(Path::new("src/lib.rs"), "pub fn x() {}")
            .expect("write");
        let before = tree.digest().expect("digest");

        tree.write(Path::new("mender-report.md"), "# Remediation Report")
            .expect("write");
        tree.write(Path::new("mender-report.json"), "{}").expect("write");

        assert_eq!(tree.files().expect("files"), vec![PathBuf::from("src/lib.rs")]);
        assert_eq!(tree.digest().expect("digest"), before);
    }

    #[test]
    fn digest_tracks_content_changes() {
        let (_temp, tree) = sample_tree();
        tree.write(Path::new("a.txt"), "one").expect("write");
        let before = tree.digest().expect("digest");

        tree.write(Path::new("a.txt"), "two").expect("write");
        let after = tree.digest().expect("digest");
        assert_ne!(before, after);

        tree.write(Path::new("a.txt"), "one").expect("write");
        assert_eq!(tree.digest().expect("digest"), before);
    }

    #[test]
    fn digest_is_stable_for_equal_content() {
        let (_t1, first) = sample_tree();
        let (_t2, second) = sample_tree();
        for tree in [&first, &second] {
            tree.write(Path::new("src/lib.rs"), "pub fn x() {}")
                .expect("write");
            tree.create_dir_all(Path::new("docs")).expect("mkdir");
        }
        assert_eq!(
            first.digest().expect("digest"),
            second.digest().expect("digest")
        );
    }
}
