//! Result types built up across the three phases.
//!
//! `AgentResult` is owned by its agent until the coordinator collects it;
//! the coordinator treats collected results as read-only. `RunReport` is
//! created once at the end of the run and never mutated.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::SkippedFix;
use crate::core::issue::{Issue, Severity};
use crate::core::ledger::Modification;
use crate::core::phase::Phase;

/// The quality dimension an expert agent is responsible for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    TestCoverage,
    Architecture,
    Security,
    Performance,
    Documentation,
}

impl Dimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TestCoverage => "test_coverage",
            Self::Architecture => "architecture",
            Self::Security => "security",
            Self::Performance => "performance",
            Self::Documentation => "documentation",
        }
    }

    /// All dimensions in roster order.
    pub fn all() -> [Dimension; 5] {
        [
            Self::TestCoverage,
            Self::Architecture,
            Self::Security,
            Self::Performance,
            Self::Documentation,
        ]
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acceptance gate applied during validation.
///
/// An agent passes validation when the number of issues remaining at or
/// above `block_at` severity is at most `max_open`. Thresholds are
/// configuration inputs, not fixed behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Acceptance {
    pub block_at: Severity,
    pub max_open: usize,
}

impl Default for Acceptance {
    fn default() -> Self {
        Self {
            block_at: Severity::Medium,
            max_open: 0,
        }
    }
}

impl Acceptance {
    pub fn accepts(&self, issues: &[Issue]) -> bool {
        let open = issues
            .iter()
            .filter(|issue| issue.severity >= self.block_at)
            .count();
        open <= self.max_open
    }
}

/// Outcome of one agent's fix phase.
///
/// `total` counts the issues still present when the fix step ran; issues
/// already gone (fixed earlier, or by an external actor) land in
/// `already_fixed` and never produce ledger entries. `fixed < total` means
/// some fixes were skipped after collaborator failures.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FixOutcome {
    pub fixed: usize,
    pub total: usize,
    pub already_fixed: usize,
    pub skipped: Vec<SkippedFix>,
}

/// Everything one agent produced across analyze, fix, and validate.
#[derive(Debug, Clone, Serialize)]
pub struct AgentResult {
    pub agent: String,
    pub dimension: Dimension,
    pub issues: Vec<Issue>,
    pub modifications: Vec<Modification>,
    pub fix: FixOutcome,
    /// Analysis could not complete; the agent never fixed or validated.
    pub analysis_failed: bool,
    pub validated: bool,
}

impl AgentResult {
    pub fn new(agent: impl Into<String>, dimension: Dimension) -> Self {
        Self {
            agent: agent.into(),
            dimension,
            issues: Vec::new(),
            modifications: Vec::new(),
            fix: FixOutcome::default(),
            analysis_failed: false,
            validated: false,
        }
    }

    /// Count issues at the given severity.
    pub fn issues_at(&self, severity: Severity) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
    }
}

/// How a run ended. Exactly one of these applies to every invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// All phases completed; see `success` for the verdict.
    Done,
    /// Analysis-only run; no fixes were attempted.
    DryRun,
    /// A fatal failure occurred and the pre-run snapshot was restored.
    RolledBack,
    /// A restore failed partway. Manual recovery required.
    RolledBackPartial,
}

/// Reference to the pre-run snapshot, carried in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotRef {
    /// Content digest of the tree at snapshot time (sha256 hex).
    pub id: String,
    pub path: String,
    pub file_count: usize,
}

/// Aggregated result of one orchestration run. Immutable once created.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub status: RunStatus,
    /// Logical AND of every agent's final validation (false for dry runs
    /// and rollbacks).
    pub success: bool,
    pub final_phase: Phase,
    pub snapshot: Option<SnapshotRef>,
    pub agents: Vec<AgentResult>,
    pub ledger_len: usize,
    pub started_at_unix: u64,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn total_issues(&self) -> usize {
        self.agents.iter().map(|a| a.issues.len()).sum()
    }

    pub fn total_fixed(&self) -> usize {
        self.agents.iter().map(|a| a.fix.fixed).sum()
    }

    pub fn total_modifications(&self) -> usize {
        self.agents.iter().map(|a| a.modifications.len()).sum()
    }
}
