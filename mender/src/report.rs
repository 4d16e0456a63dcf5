//! Pure report rendering over a finished [`RunReport`].
//!
//! Two surfaces from the same input: a human-readable markdown report and a
//! machine-readable `RunSummary`. Identical reports produce byte-identical
//! output; agents render in roster order and ledger rows in sequence order.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::error::SkippedFix;
use crate::core::issue::Severity;
use crate::core::outcome::{RunReport, SnapshotRef};

const REPORT_TEMPLATE: &str = include_str!("templates/report.md");

/// One row of the run-wide modification table, in sequence order.
#[derive(Debug, Clone, Serialize)]
struct LedgerRow {
    seq: u64,
    agent: String,
    target: String,
    description: String,
}

#[derive(Debug, Clone, Serialize)]
struct IssueRow {
    kind: String,
    location: String,
    severity: String,
}

#[derive(Debug, Clone, Serialize)]
struct AgentContext {
    name: String,
    verdict: String,
    issue_count: usize,
    high: usize,
    medium: usize,
    low: usize,
    fixed: usize,
    total: usize,
    already_fixed: usize,
    issues: Vec<IssueRow>,
    skipped: Vec<SkippedFix>,
}

/// Machine-readable run summary, written alongside the markdown report.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub status: String,
    pub success: bool,
    pub final_phase: String,
    pub total_issues: usize,
    pub total_fixed: usize,
    pub total_modifications: usize,
    pub snapshot: Option<SnapshotRef>,
    pub agents: Vec<AgentSummary>,
    pub started_at_unix: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentSummary {
    pub agent: String,
    pub dimension: String,
    pub issues: usize,
    pub fixed: usize,
    pub already_fixed: usize,
    pub skipped: usize,
    pub analysis_failed: bool,
    pub validated: bool,
}

/// Build the machine-readable summary for a finished run.
pub fn summary(report: &RunReport) -> RunSummary {
    RunSummary {
        status: to_snake(&report.status),
        success: report.success,
        final_phase: report.final_phase.to_string(),
        total_issues: report.total_issues(),
        total_fixed: report.total_fixed(),
        total_modifications: report.total_modifications(),
        snapshot: report.snapshot.clone(),
        agents: report
            .agents
            .iter()
            .map(|result| AgentSummary {
                agent: result.agent.clone(),
                dimension: result.dimension.to_string(),
                issues: result.issues.len(),
                fixed: result.fix.fixed,
                already_fixed: result.fix.already_fixed,
                skipped: result.fix.skipped.len(),
                analysis_failed: result.analysis_failed,
                validated: result.validated,
            })
            .collect(),
        started_at_unix: report.started_at_unix,
        duration_ms: report.duration_ms,
    }
}

/// Render the markdown report for a finished run.
pub fn render_markdown(report: &RunReport) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("report", REPORT_TEMPLATE)
        .context("report template should be valid")?;
    let template = env.get_template("report")?;

    let agents: Vec<AgentContext> = report
        .agents
        .iter()
        .map(|result| AgentContext {
            name: result.agent.clone(),
            verdict: if result.analysis_failed {
                "analysis failed".to_string()
            } else if result.validated {
                "pass".to_string()
            } else {
                "fail".to_string()
            },
            issue_count: result.issues.len(),
            high: result.issues_at(Severity::High),
            medium: result.issues_at(Severity::Medium),
            low: result.issues_at(Severity::Low),
            fixed: result.fix.fixed,
            total: result.fix.total,
            already_fixed: result.fix.already_fixed,
            issues: result
                .issues
                .iter()
                .map(|issue| IssueRow {
                    kind: issue.kind.to_string(),
                    location: issue.location.display().to_string(),
                    severity: issue.severity.to_string(),
                })
                .collect(),
            skipped: result.fix.skipped.clone(),
        })
        .collect();

    let mut modifications: Vec<LedgerRow> = report
        .agents
        .iter()
        .flat_map(|result| {
            result.modifications.iter().map(|entry| LedgerRow {
                seq: entry.seq,
                agent: result.agent.clone(),
                target: entry.target.display().to_string(),
                description: entry.description.clone(),
            })
        })
        .collect();
    modifications.sort_by_key(|row| row.seq);

    let rendered = template.render(context! {
        status => to_snake(&report.status),
        success => report.success,
        final_phase => report.final_phase.to_string(),
        totals => context! {
            issues => report.total_issues(),
            fixed => report.total_fixed(),
            modifications => report.total_modifications(),
        },
        duration_ms => report.duration_ms,
        snapshot => report.snapshot.clone(),
        agents => agents,
        modifications => modifications,
    })?;
    Ok(rendered)
}

fn to_snake(status: &crate::core::outcome::RunStatus) -> String {
    serde_json::to_value(status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{status:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::issue::{Issue, IssueKind};
    use crate::core::ledger::Modification;
    use crate::core::outcome::{AgentResult, Dimension, RunStatus};
    use crate::core::phase::Phase;

    fn sample_report() -> RunReport {
        let mut doc = AgentResult::new("documentation", Dimension::Documentation);
        doc.issues = vec![Issue::new(
            IssueKind::MissingFile,
            "README.md",
            Severity::High,
        )];
        doc.modifications = vec![Modification {
            seq: 1,
            target: "README.md".into(),
            description: "created documentation stub".to_string(),
        }];
        doc.fix.fixed = 1;
        doc.fix.total = 1;
        doc.validated = true;

        let mut tests = AgentResult::new("test_coverage", Dimension::TestCoverage);
        tests.modifications = vec![Modification {
            seq: 0,
            target: "tests".into(),
            description: "created directory".to_string(),
        }];
        tests.fix.fixed = 1;
        tests.fix.total = 1;
        tests.validated = true;

        RunReport {
            status: RunStatus::Done,
            success: true,
            final_phase: Phase::Done,
            snapshot: None,
            agents: vec![tests, doc],
            ledger_len: 2,
            started_at_unix: 1_700_000_000,
            duration_ms: 42,
        }
    }

    #[test]
    fn markdown_lists_agents_in_roster_order() {
        let rendered = render_markdown(&sample_report()).expect("render");
        let tests_pos = rendered.find("### test_coverage").expect("tests section");
        let docs_pos = rendered.find("### documentation").expect("docs section");
        assert!(tests_pos < docs_pos, "roster order preserved");
        assert!(rendered.contains("Status: **done**"));
        assert!(rendered.contains("Verdict: **pass**"));
        assert!(rendered.contains("| high | missing_file | `README.md` |"));
    }

    #[test]
    fn markdown_ledger_rows_are_in_sequence_order() {
        let rendered = render_markdown(&sample_report()).expect("render");
        let first = rendered.find("| 0 | test_coverage |").expect("seq 0 row");
        let second = rendered.find("| 1 | documentation |").expect("seq 1 row");
        assert!(first < second);
    }

    #[test]
    fn rendering_is_deterministic() {
        let report = sample_report();
        let a = render_markdown(&report).expect("render");
        let b = render_markdown(&report).expect("render");
        assert_eq!(a, b);
    }

    #[test]
    fn summary_counts_match_report_totals() {
        let report = sample_report();
        let summary = summary(&report);
        assert_eq!(summary.total_issues, report.total_issues());
        assert_eq!(summary.total_fixed, 2);
        assert_eq!(summary.agents.len(), 2);
        assert_eq!(summary.status, "done");
        assert_eq!(summary.final_phase, "done");
    }
}
