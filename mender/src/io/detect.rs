//! Detector seam and the built-in, config-driven detectors.
//!
//! A detector is a read-only scan over the project tree. Implementations
//! must be side-effect-free and re-entrant: detecting twice on an unchanged
//! tree yields an equal issue set. The built-ins here are deliberately
//! generic (required paths, peer files, content patterns); anything
//! language-specific belongs in configuration, not code.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use crate::core::error::PipelineError;
use crate::core::issue::{Issue, IssueKind, Severity, normalize};
use crate::io::config::{PatternRule, PeerRule};
use crate::io::tree::FileTree;

/// Produces issues from a read-only scan of the tree.
pub trait Detector {
    fn detect(&self, tree: &FileTree) -> Result<Vec<Issue>, PipelineError>;
}

/// Emits `missing_directory` for each configured directory that is absent.
pub struct RequiredDirDetector {
    dirs: Vec<PathBuf>,
    severity: Severity,
}

impl RequiredDirDetector {
    pub fn new(dirs: impl IntoIterator<Item = impl Into<PathBuf>>, severity: Severity) -> Self {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
            severity,
        }
    }
}

impl Detector for RequiredDirDetector {
    fn detect(&self, tree: &FileTree) -> Result<Vec<Issue>, PipelineError> {
        let issues = self
            .dirs
            .iter()
            .filter(|dir| !tree.is_dir(dir))
            .map(|dir| Issue::new(IssueKind::MissingDirectory, dir.clone(), self.severity))
            .collect();
        Ok(issues)
    }
}

/// Emits `missing_file` for each configured file that is absent.
pub struct RequiredFileDetector {
    files: Vec<PathBuf>,
    severity: Severity,
}

impl RequiredFileDetector {
    pub fn new(files: impl IntoIterator<Item = impl Into<PathBuf>>, severity: Severity) -> Self {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            severity,
        }
    }
}

impl Detector for RequiredFileDetector {
    fn detect(&self, tree: &FileTree) -> Result<Vec<Issue>, PipelineError> {
        let issues = self
            .files
            .iter()
            .filter(|file| !tree.exists(file))
            .map(|file| Issue::new(IssueKind::MissingFile, file.clone(), self.severity))
            .collect();
        Ok(issues)
    }
}

/// Emits `missing_peer` for each source file whose derived peer is absent.
///
/// The expected peer path is recorded in issue metadata under `peer` so the
/// matching transformer knows what to create.
pub struct PeerFileDetector {
    rule: PeerRule,
}

impl PeerFileDetector {
    pub fn new(rule: PeerRule) -> Self {
        Self { rule }
    }

    fn peer_path(&self, source: &Path) -> Option<PathBuf> {
        let stem = source.file_stem()?.to_str()?;
        let ext = source.extension()?.to_str()?;
        let parent = source.parent().map(|p| p.to_string_lossy().to_string());
        let rendered = self
            .rule
            .peer_template
            .replace("{stem}", stem)
            .replace("{ext}", ext)
            .replace("{parent}", parent.as_deref().unwrap_or(""));
        Some(PathBuf::from(rendered))
    }

    fn skipped(&self, source: &Path) -> bool {
        source
            .components()
            .next()
            .and_then(|c| c.as_os_str().to_str())
            .is_some_and(|top| self.rule.skip_dirs.iter().any(|s| s == top))
    }
}

impl Detector for PeerFileDetector {
    fn detect(&self, tree: &FileTree) -> Result<Vec<Issue>, PipelineError> {
        let mut issues = Vec::new();
        for source in tree.files()? {
            let matches_ext = source
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == self.rule.source_ext);
            if !matches_ext || self.skipped(&source) {
                continue;
            }
            let Some(peer) = self.peer_path(&source) else {
                continue;
            };
            if !tree.exists(&peer) {
                issues.push(
                    Issue::new(IssueKind::MissingPeer, source, Severity::Medium)
                        .with_metadata("peer", peer.to_string_lossy()),
                );
            }
        }
        Ok(issues)
    }
}

/// Emits `forbidden_pattern` for each file containing a denylisted pattern.
pub struct PatternDetector {
    rules: Vec<CompiledRule>,
}

struct CompiledRule {
    regex: Regex,
    source: PatternRule,
}

impl PatternDetector {
    pub fn new(rules: &[PatternRule]) -> Result<Self, PipelineError> {
        let compiled = rules
            .iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|regex| CompiledRule {
                        regex,
                        source: rule.clone(),
                    })
                    .map_err(|err| {
                        PipelineError::Configuration(format!(
                            "invalid pattern regex '{}': {err}",
                            rule.pattern
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules: compiled })
    }
}

impl Detector for PatternDetector {
    fn detect(&self, tree: &FileTree) -> Result<Vec<Issue>, PipelineError> {
        let mut issues = Vec::new();
        for file in tree.files()? {
            let contents = match tree.read_to_string(&file) {
                Ok(contents) => contents,
                Err(err) => {
                    // Binary or vanished files are not findings.
                    debug!(file = %file.display(), error = %err, "skipping unreadable file");
                    continue;
                }
            };
            for rule in &self.rules {
                let ext_matches = match &rule.source.file_ext {
                    Some(ext) => file
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| e == ext),
                    None => true,
                };
                if ext_matches && rule.regex.is_match(&contents) {
                    issues.push(
                        Issue::new(
                            IssueKind::ForbiddenPattern,
                            file.clone(),
                            rule.source.severity,
                        )
                        .with_metadata("pattern", &rule.source.pattern),
                    );
                }
            }
        }
        Ok(issues)
    }
}

/// Concatenates child detectors, sorting and deduplicating on identity.
pub struct CompositeDetector {
    children: Vec<Box<dyn Detector>>,
}

impl CompositeDetector {
    pub fn new(children: Vec<Box<dyn Detector>>) -> Self {
        Self { children }
    }
}

impl Detector for CompositeDetector {
    fn detect(&self, tree: &FileTree) -> Result<Vec<Issue>, PipelineError> {
        let mut issues = Vec::new();
        for child in &self.children {
            issues.extend(child.detect(tree)?);
        }
        Ok(normalize(issues))
    }
}
