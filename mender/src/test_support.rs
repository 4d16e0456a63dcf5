//! Test-only fixtures and scripted collaborators.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use crate::core::error::PipelineError;
use crate::core::issue::Issue;
use crate::core::ledger::Patch;
use crate::io::detect::Detector;
use crate::io::transform::Transformer;
use crate::io::tree::FileTree;

/// A temporary project directory that cleans up after itself.
pub struct TestProject {
    temp: tempfile::TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            temp: tempfile::tempdir().expect("tempdir"),
        }
    }

    /// Like `new`, but the project lives one level below the tempdir so
    /// snapshots (siblings of the root) land inside the tempdir too.
    pub fn nested() -> Self {
        let project = Self::new();
        std::fs::create_dir_all(project.temp.path().join("project")).expect("mkdir");
        project
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn nested_root(&self) -> std::path::PathBuf {
        self.temp.path().join("project")
    }

    pub fn tree(&self) -> FileTree {
        FileTree::open(self.root()).expect("open tree")
    }

    pub fn nested_tree(&self) -> FileTree {
        FileTree::open(self.nested_root()).expect("open tree")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Detector driven by a closure.
pub struct FnDetector {
    f: Box<dyn Fn(&FileTree) -> Result<Vec<Issue>, PipelineError>>,
}

impl FnDetector {
    pub fn new(f: impl Fn(&FileTree) -> Result<Vec<Issue>, PipelineError> + 'static) -> Self {
        Self { f: Box::new(f) }
    }
}

impl Detector for FnDetector {
    fn detect(&self, tree: &FileTree) -> Result<Vec<Issue>, PipelineError> {
        (self.f)(tree)
    }
}

/// Transformer driven by a closure.
pub struct FnTransformer {
    f: Box<dyn Fn(&FileTree, &Issue) -> Result<Patch, PipelineError>>,
}

impl FnTransformer {
    pub fn new(
        f: impl Fn(&FileTree, &Issue) -> Result<Patch, PipelineError> + 'static,
    ) -> Self {
        Self { f: Box::new(f) }
    }
}

impl Transformer for FnTransformer {
    fn apply(&self, tree: &FileTree, issue: &Issue) -> Result<Patch, PipelineError> {
        (self.f)(tree, issue)
    }
}

/// Shared append-only log for observing collaborator call order in tests.
#[derive(Clone, Default)]
pub struct CallLog {
    events: Rc<RefCell<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.events.borrow_mut().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }
}
