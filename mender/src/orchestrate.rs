//! Coordinator for a full remediation run.
//!
//! Drives the roster through the three global phases behind a strict phase
//! barrier: every agent finishes analyzing before any agent fixes, and every
//! agent finishes fixing before any agent validates. Agent-level failures
//! are absorbed into the report; resource failures abort the run and restore
//! the pre-run snapshot. Within the fixing phase each agent's declared
//! target paths are claimed before its fix step runs, so two agents can
//! never write the same path in one run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, error, info, warn};

use crate::agents::Agent;
use crate::core::claims::ClaimRegistry;
use crate::core::error::PipelineError;
use crate::core::ledger::ModificationLedger;
use crate::core::outcome::{AgentResult, RunReport, RunStatus, SnapshotRef};
use crate::core::phase::Phase;
use crate::io::backup::{BackupManager, SnapshotHandle};
use crate::io::tree::FileTree;

/// Externally requested cancellation, checked between fix steps.
///
/// In-flight fixes complete; no new fix starts after cancellation, and the
/// pre-run snapshot is restored.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Options for one orchestration run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Analyze only; never enter the fixing or validating phases.
    pub dry_run: bool,
    /// Skip the pre-run snapshot. Explicitly unsafe: disables rollback.
    pub skip_backup: bool,
    pub cancel: CancelToken,
}

/// Run the full pipeline over `tree` with the given roster.
///
/// Returns `Ok` with a report for every completed run, including rollbacks;
/// returns `Err` only when the run cannot even reach a reportable terminal
/// state (snapshot failure before any mutation, or a fatal failure with
/// rollback disabled).
pub fn run_pipeline(
    tree: &FileTree,
    roster: &[Agent],
    options: &RunOptions,
) -> Result<RunReport, PipelineError> {
    let started_at_unix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let start = Instant::now();

    let mut phase = Phase::Init;
    let mut ledger = ModificationLedger::new();
    let backup = BackupManager::new();

    info!(root = %tree.root().display(), agents = roster.len(), dry_run = options.dry_run, "run starting");

    // INIT: snapshot before any mutation. A snapshot failure is fatal and
    // leaves the tree untouched.
    let snapshot = if options.skip_backup {
        warn!("snapshot skipped; rollback is unavailable for this run");
        None
    } else {
        Some(backup.snapshot(tree)?)
    };

    let mut results: Vec<AgentResult> = roster
        .iter()
        .map(|agent| AgentResult::new(agent.name(), agent.dimension()))
        .collect();

    // ANALYZING: every agent completes before any agent fixes.
    phase.transition(Phase::Analyzing)?;
    for (idx, agent) in roster.iter().enumerate() {
        match agent.analyze(tree) {
            Ok(issues) => results[idx].issues = issues,
            Err(err @ PipelineError::Resource { .. }) => {
                return abort(
                    tree, &backup, snapshot.as_ref(), err, &mut phase, &mut ledger, results,
                    started_at_unix, start,
                );
            }
            Err(err) => {
                warn!(agent = %agent.name(), error = %err, "analysis failed; agent marked failed");
                results[idx].analysis_failed = true;
            }
        }
    }

    if options.dry_run {
        phase.transition(Phase::Done)?;
        ledger.close();
        info!("dry run complete; no fixes attempted");
        return Ok(finish(
            RunStatus::DryRun,
            false,
            phase,
            snapshot,
            results,
            &ledger,
            started_at_unix,
            start,
        ));
    }

    // FIXING: agents run one at a time; claims make write exclusivity
    // explicit even though execution is sequential.
    phase.transition(Phase::Fixing)?;
    let mut claims = ClaimRegistry::new();
    for (idx, agent) in roster.iter().enumerate() {
        if results[idx].analysis_failed {
            debug!(agent = %agent.name(), "skipping fix for failed agent");
            continue;
        }
        if options.cancel.is_cancelled() {
            info!("cancellation requested; stopping before next fix");
            let err = PipelineError::resource("run cancelled during fixing");
            return abort(
                tree, &backup, snapshot.as_ref(), err, &mut phase, &mut ledger, results,
                started_at_unix, start,
            );
        }
        if let Err(err) = tree.probe() {
            return abort(
                tree, &backup, snapshot.as_ref(), err, &mut phase, &mut ledger, results,
                started_at_unix, start,
            );
        }

        let targets = agent.fix_targets(&results[idx].issues);
        claims.claim_all(agent.name(), targets.iter().map(|p| p.as_path()))?;
        let fixed = agent.fix(tree, &results[idx].issues, &mut ledger);
        claims.release(agent.name());

        match fixed {
            Ok((outcome, modifications)) => {
                results[idx].fix = outcome;
                results[idx].modifications = modifications;
            }
            Err(err @ PipelineError::Resource { .. }) => {
                return abort(
                    tree, &backup, snapshot.as_ref(), err, &mut phase, &mut ledger, results,
                    started_at_unix, start,
                );
            }
            Err(err @ PipelineError::AgentFailure { .. }) => {
                warn!(agent = %agent.name(), error = %err, "fix phase failed; agent marked failed");
                results[idx].analysis_failed = true;
            }
            Err(err) => return Err(err),
        }
    }

    // VALIDATING: read-only; each agent re-derives its verdict from the tree.
    phase.transition(Phase::Validating)?;
    for (idx, agent) in roster.iter().enumerate() {
        if results[idx].analysis_failed {
            results[idx].validated = false;
            continue;
        }
        match agent.validate(tree) {
            Ok(passed) => results[idx].validated = passed,
            Err(err @ PipelineError::Resource { .. }) => {
                return abort(
                    tree, &backup, snapshot.as_ref(), err, &mut phase, &mut ledger, results,
                    started_at_unix, start,
                );
            }
            Err(err) => {
                warn!(agent = %agent.name(), error = %err, "validation errored; counted as failed");
                results[idx].validated = false;
            }
        }
    }

    phase.transition(Phase::Done)?;
    ledger.close();
    let success = results.iter().all(|r| r.validated);
    info!(success, modifications = ledger.len(), "run complete");
    Ok(finish(
        RunStatus::Done,
        success,
        phase,
        snapshot,
        results,
        &ledger,
        started_at_unix,
        start,
    ))
}

/// Fatal-failure path: restore the snapshot and report a rollback.
///
/// With rollback disabled there is no reportable terminal state; the fatal
/// error propagates instead.
#[allow(clippy::too_many_arguments)]
fn abort(
    tree: &FileTree,
    backup: &BackupManager,
    snapshot: Option<&SnapshotHandle>,
    cause: PipelineError,
    phase: &mut Phase,
    ledger: &mut ModificationLedger,
    results: Vec<AgentResult>,
    started_at_unix: u64,
    start: Instant,
) -> Result<RunReport, PipelineError> {
    error!(error = %cause, "fatal failure; aborting run");
    let Some(handle) = snapshot else {
        return Err(cause);
    };

    let status = match backup.restore(tree, handle) {
        Ok(()) => {
            info!(snapshot = %handle.id, "tree restored from snapshot");
            RunStatus::RolledBack
        }
        Err(restore_err) => {
            error!(error = %restore_err, "restore failed; manual recovery required");
            RunStatus::RolledBackPartial
        }
    };

    phase.transition(Phase::RolledBack)?;
    ledger.close();
    Ok(finish(
        status,
        false,
        *phase,
        Some(handle.clone()),
        results,
        ledger,
        started_at_unix,
        start,
    ))
}

#[allow(clippy::too_many_arguments)]
fn finish(
    status: RunStatus,
    success: bool,
    final_phase: Phase,
    snapshot: Option<SnapshotHandle>,
    agents: Vec<AgentResult>,
    ledger: &ModificationLedger,
    started_at_unix: u64,
    start: Instant,
) -> RunReport {
    RunReport {
        status,
        success,
        final_phase,
        snapshot: snapshot.map(|handle| SnapshotRef {
            id: handle.id,
            path: handle.path.display().to_string(),
            file_count: handle.file_count,
        }),
        agents,
        ledger_len: ledger.len(),
        started_at_unix,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}
