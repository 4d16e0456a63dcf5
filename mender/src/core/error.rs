//! Failure taxonomy for the remediation pipeline.
//!
//! The coordinator routes failures by class: local and agent-level errors
//! are absorbed and surfaced only in the report, resource failures abort the
//! run and trigger a restore, configuration errors fail before any mutation.

use thiserror::Error;

use crate::core::issue::{IssueKind, Severity};

/// Classified pipeline failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A single detector/transformer call failed. Recorded as a skipped fix;
    /// never aborts the owning agent.
    #[error("collaborator failed for {kind} at {location}: {message}")]
    LocalIssue {
        kind: IssueKind,
        location: String,
        message: String,
    },

    /// An agent could not complete its analysis at all. The agent is marked
    /// failed; sibling agents proceed.
    #[error("agent {agent} could not complete analysis: {message}")]
    AgentFailure { agent: String, message: String },

    /// A single write into the tree failed (e.g. permission denied on one
    /// path). Non-fatal at the agent level; surfaces as `fixed < total`.
    #[error("write failed for {path}: {message}")]
    Write { path: String, message: String },

    /// The project tree is unreadable or unwritable. Fatal; triggers restore.
    #[error("project tree unusable: {message}")]
    Resource { message: String },

    /// Invalid CLI invocation or config file. Fails before any mutation.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A restore failed after it started replacing tree contents. The tree
    /// may hold a mix of current and snapshot state; manual recovery needed.
    #[error("restore of snapshot {snapshot} incomplete: {message}")]
    RestorePartial { snapshot: String, message: String },

    /// Append after the run reached a terminal phase. Programming error.
    #[error("modification ledger is closed")]
    LedgerClosed,

    /// Illegal phase transition. Programming error.
    #[error("illegal phase transition: {from} -> {to}")]
    Phase { from: String, to: String },

    /// Two agents claimed the same fix target within one phase.
    #[error("path {path} already claimed by agent {holder}")]
    ClaimConflict { path: String, holder: String },
}

impl PipelineError {
    /// Convenience constructor for resource failures.
    pub fn resource(message: impl Into<String>) -> Self {
        Self::Resource {
            message: message.into(),
        }
    }

    /// Convenience constructor for locally absorbed collaborator failures.
    pub fn local(kind: IssueKind, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LocalIssue {
            kind,
            location: location.into(),
            message: message.into(),
        }
    }

    /// True for failures that must abort the run and trigger a restore.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Resource { .. } | Self::RestorePartial { .. } | Self::Configuration(_)
        )
    }
}

/// Record of a fix that was skipped because a collaborator failed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SkippedFix {
    pub kind: IssueKind,
    pub location: String,
    pub severity: Severity,
    pub reason: String,
}
