//! Issue records produced by the analyze phase.
//!
//! Issues are immutable once produced. Identity is the `(kind, location)`
//! pair; analysis output is sorted and deduplicated on identity so repeated
//! analysis of an unchanged tree yields an equal issue set.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Issue severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Stable lowercase name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finite issue taxonomy dispatched through per-agent transformer tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A required directory is absent.
    MissingDirectory,
    /// A required standalone file is absent.
    MissingFile,
    /// A source file has no matching peer file (e.g. its test).
    MissingPeer,
    /// A file contains content matching a denylisted pattern.
    ForbiddenPattern,
}

impl IssueKind {
    /// Stable lowercase name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingDirectory => "missing_directory",
            Self::MissingFile => "missing_file",
            Self::MissingPeer => "missing_peer",
            Self::ForbiddenPattern => "forbidden_pattern",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding from the analyze phase. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    /// Path relative to the project tree root (or a symbolic location).
    pub location: PathBuf,
    pub severity: Severity,
    /// Collaborator-supplied detail, keyed deterministically.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// Issue identity: two issues with equal ids describe the same finding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IssueId {
    pub kind: IssueKind,
    pub location: PathBuf,
}

impl Issue {
    pub fn new(kind: IssueKind, location: impl Into<PathBuf>, severity: Severity) -> Self {
        Self {
            kind,
            location: location.into(),
            severity,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn id(&self) -> IssueId {
        IssueId {
            kind: self.kind,
            location: self.location.clone(),
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }
}

/// Sort issues by (severity desc, kind, location) and drop identity duplicates.
///
/// This is the canonical ordering for analysis output and report rendering.
pub fn normalize(mut issues: Vec<Issue>) -> Vec<Issue> {
    // Group identity duplicates together first, keeping the most severe.
    issues.sort_by(|a, b| {
        a.kind
            .cmp(&b.kind)
            .then(a.location.cmp(&b.location))
            .then(b.severity.cmp(&a.severity))
    });
    issues.dedup_by(|a, b| a.id() == b.id());
    issues.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(a.kind.cmp(&b.kind))
            .then(a.location.cmp(&b.location))
    });
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_low_to_high() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
    }

    #[test]
    fn normalize_sorts_severity_desc_then_kind_then_location() {
        let issues = vec![
            Issue::new(IssueKind::MissingPeer, "src/b.rs", Severity::Medium),
            Issue::new(IssueKind::MissingDirectory, "tests", Severity::High),
            Issue::new(IssueKind::MissingPeer, "src/a.rs", Severity::Medium),
            Issue::new(IssueKind::MissingFile, "README.md", Severity::High),
        ];

        let sorted = normalize(issues);
        let ids: Vec<(IssueKind, &str)> = sorted
            .iter()
            .map(|i| (i.kind, i.location.to_str().unwrap()))
            .collect();
        assert_eq!(
            ids,
            vec![
                (IssueKind::MissingDirectory, "tests"),
                (IssueKind::MissingFile, "README.md"),
                (IssueKind::MissingPeer, "src/a.rs"),
                (IssueKind::MissingPeer, "src/b.rs"),
            ]
        );
    }

    #[test]
    fn normalize_drops_identity_duplicates() {
        let issues = vec![
            Issue::new(IssueKind::MissingFile, "README.md", Severity::High),
            Issue::new(IssueKind::MissingFile, "README.md", Severity::High)
                .with_metadata("source", "second detector"),
        ];

        let normalized = normalize(issues);
        assert_eq!(normalized.len(), 1);
    }

    #[test]
    fn normalize_keeps_most_severe_duplicate() {
        let issues = vec![
            Issue::new(IssueKind::MissingFile, "README.md", Severity::Low),
            Issue::new(IssueKind::MissingFile, "README.md", Severity::High),
        ];

        let normalized = normalize(issues);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].severity, Severity::High);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&IssueKind::MissingDirectory).expect("serialize");
        assert_eq!(json, "\"missing_directory\"");
        assert_eq!(IssueKind::ForbiddenPattern.to_string(), "forbidden_pattern");
    }

    #[test]
    fn severity_display_matches_serde_names() {
        for (severity, name) in [
            (Severity::Low, "low"),
            (Severity::Medium, "medium"),
            (Severity::High, "high"),
        ] {
            assert_eq!(severity.to_string(), name);
            let json = serde_json::to_string(&severity).expect("serialize");
            assert_eq!(json, format!("\"{name}\""));
        }
    }

    #[test]
    fn issue_ids_are_hashable_identity_keys() {
        let mut seen = std::collections::HashSet::new();
        seen.insert(Issue::new(IssueKind::MissingFile, "README.md", Severity::High).id());
        seen.insert(Issue::new(IssueKind::MissingFile, "README.md", Severity::Low).id());
        seen.insert(Issue::new(IssueKind::MissingDirectory, "README.md", Severity::High).id());
        assert_eq!(seen.len(), 2);
    }
}
