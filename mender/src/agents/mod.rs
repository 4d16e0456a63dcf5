//! Expert agents implementing the analyze/fix/validate contract.
//!
//! An agent owns one quality dimension and two collaborator seams: a
//! [`Detector`] that finds issues and a transformer table keyed by issue
//! kind that fixes them. The engine here enforces the contract the
//! coordinator relies on:
//!
//! - `analyze` is read-only and re-entrant;
//! - `fix` is idempotent (re-analysis skips issues that are already gone)
//!   and absorbs single-issue collaborator failures as skipped fixes;
//! - `validate` re-derives truth from the current tree, so fixes applied by
//!   an external actor count just as much as the agent's own.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::core::error::{PipelineError, SkippedFix};
use crate::core::issue::{Issue, IssueId, IssueKind, normalize};
use crate::core::ledger::{Modification, ModificationLedger};
use crate::core::outcome::{Acceptance, Dimension, FixOutcome};
use crate::io::detect::Detector;
use crate::io::transform::Transformer;
use crate::io::tree::FileTree;

pub mod roster;

/// One expert agent: a dimension plus its collaborators and acceptance gate.
pub struct Agent {
    name: String,
    dimension: Dimension,
    detector: Box<dyn Detector>,
    transformers: BTreeMap<IssueKind, Box<dyn Transformer>>,
    acceptance: Acceptance,
}

impl Agent {
    pub fn new(
        dimension: Dimension,
        detector: Box<dyn Detector>,
        transformers: BTreeMap<IssueKind, Box<dyn Transformer>>,
        acceptance: Acceptance,
    ) -> Self {
        Self {
            name: dimension.as_str().to_string(),
            dimension,
            detector,
            transformers,
            acceptance,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Read-only scan for issues in this agent's dimension.
    ///
    /// Output is sorted and deduplicated on identity, so two analyses of an
    /// unchanged tree return equal sets. Resource failures propagate; any
    /// other detector failure is an agent-level failure.
    pub fn analyze(&self, tree: &FileTree) -> Result<Vec<Issue>, PipelineError> {
        let issues = match self.detector.detect(tree) {
            Ok(issues) => normalize(issues),
            Err(err @ PipelineError::Resource { .. }) => return Err(err),
            Err(err) => {
                return Err(PipelineError::AgentFailure {
                    agent: self.name.clone(),
                    message: err.to_string(),
                });
            }
        };
        info!(agent = %self.name, issues = issues.len(), "analysis complete");
        Ok(issues)
    }

    /// Apply a transformer per issue, recording one ledger entry per
    /// successful fix.
    ///
    /// Idempotence: the tree is re-analyzed first and issues no longer
    /// present are skipped without touching the tree or the ledger, so
    /// fixing the same issue twice is a no-op. Single-issue failures are
    /// absorbed as skipped fixes; only fatal failures abort.
    pub fn fix(
        &self,
        tree: &FileTree,
        issues: &[Issue],
        ledger: &mut ModificationLedger,
    ) -> Result<(FixOutcome, Vec<Modification>), PipelineError> {
        let present = self.reanalyze_ids(tree)?;
        let mut outcome = FixOutcome::default();
        let mut modifications = Vec::new();

        for issue in issues {
            if !present.contains(&issue.id()) {
                debug!(agent = %self.name, location = %issue.location().display(), "already fixed, skipping");
                outcome.already_fixed += 1;
                continue;
            }
            outcome.total += 1;

            let Some(transformer) = self.transformers.get(&issue.kind) else {
                outcome.skipped.push(skipped(issue, "no transformer registered for kind"));
                continue;
            };
            match transformer.apply(tree, issue) {
                Ok(patch) => {
                    let recorded = ledger.record(patch)?;
                    modifications.push(recorded.clone());
                    outcome.fixed += 1;
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err @ PipelineError::LedgerClosed) => return Err(err),
                Err(err) => {
                    warn!(agent = %self.name, location = %issue.location().display(), error = %err, "fix skipped");
                    outcome.skipped.push(skipped(issue, err.to_string()));
                }
            }
        }

        info!(
            agent = %self.name,
            fixed = outcome.fixed,
            total = outcome.total,
            already_fixed = outcome.already_fixed,
            "fix phase complete"
        );
        Ok((outcome, modifications))
    }

    /// Read-only acceptance check against the current tree state.
    ///
    /// Never consults fix bookkeeping: passing depends only on what a fresh
    /// analysis finds. Non-resource detector failures count as not valid.
    pub fn validate(&self, tree: &FileTree) -> Result<bool, PipelineError> {
        match self.detector.detect(tree) {
            Ok(issues) => {
                let issues = normalize(issues);
                let passed = self.acceptance.accepts(&issues);
                info!(agent = %self.name, remaining = issues.len(), passed, "validation complete");
                Ok(passed)
            }
            Err(err @ PipelineError::Resource { .. }) => Err(err),
            Err(err) => {
                warn!(agent = %self.name, error = %err, "validation failed to run");
                Ok(false)
            }
        }
    }

    /// Paths this agent would write while fixing `issues`; the coordinator
    /// claims these before the fix step runs.
    pub fn fix_targets(&self, issues: &[Issue]) -> BTreeSet<PathBuf> {
        let mut targets = BTreeSet::new();
        for issue in issues {
            targets.insert(issue.location.clone());
            if let Some(peer) = issue.metadata.get("peer") {
                targets.insert(PathBuf::from(peer));
            }
        }
        targets
    }

    fn reanalyze_ids(&self, tree: &FileTree) -> Result<BTreeSet<IssueId>, PipelineError> {
        match self.detector.detect(tree) {
            Ok(issues) => Ok(issues.iter().map(Issue::id).collect()),
            Err(err @ PipelineError::Resource { .. }) => Err(err),
            Err(err) => Err(PipelineError::AgentFailure {
                agent: self.name.clone(),
                message: format!("re-analysis before fix failed: {err}"),
            }),
        }
    }
}

fn skipped(issue: &Issue, reason: impl Into<String>) -> SkippedFix {
    SkippedFix {
        kind: issue.kind,
        location: issue.location().display().to_string(),
        severity: issue.severity,
        reason: reason.into(),
    }
}
