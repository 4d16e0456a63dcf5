//! Report artifact writer with schema validation.
//!
//! Writes `mender-report.md` and `mender-report.json` into the project root,
//! overwriting any previous run's artifacts. The JSON summary is validated
//! against the embedded schema before it touches disk, so a malformed
//! summary is a bug caught at write time rather than a corrupt artifact.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;

use crate::core::outcome::RunReport;
use crate::report;

const SUMMARY_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/run_summary.schema.json"
));

pub const REPORT_MARKDOWN: &str = "mender-report.md";
pub const REPORT_JSON: &str = "mender-report.json";

/// Render and write both report artifacts under `root`.
///
/// Returns the paths written, markdown first.
pub fn write_reports(root: &Path, run: &RunReport) -> Result<Vec<PathBuf>> {
    let markdown_path = root.join(REPORT_MARKDOWN);
    let json_path = root.join(REPORT_JSON);

    let markdown = report::render_markdown(run)?;
    fs::write(&markdown_path, markdown)
        .with_context(|| format!("write report {}", markdown_path.display()))?;

    let summary = report::summary(run);
    let value = serde_json::to_value(&summary).context("serialize run summary")?;
    validate_summary(&value)?;
    let mut buf = serde_json::to_string_pretty(&value)?;
    buf.push('\n');
    fs::write(&json_path, buf).with_context(|| format!("write report {}", json_path.display()))?;

    Ok(vec![markdown_path, json_path])
}

fn validate_summary(summary: &Value) -> Result<()> {
    let schema_value: Value =
        serde_json::from_str(SUMMARY_SCHEMA).context("parse run summary schema")?;
    let compiled =
        validator_for(&schema_value).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(summary) {
        let messages = compiled
            .iter_errors(summary)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "run summary schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::outcome::{AgentResult, Dimension, RunStatus};
    use crate::core::phase::Phase;
    use crate::test_support::TestProject;

    fn finished_report() -> RunReport {
        let mut result = AgentResult::new("security", Dimension::Security);
        result.validated = true;
        RunReport {
            status: RunStatus::Done,
            success: true,
            final_phase: Phase::Done,
            snapshot: None,
            agents: vec![result],
            ledger_len: 0,
            started_at_unix: 1_700_000_000,
            duration_ms: 5,
        }
    }

    #[test]
    fn writes_both_artifacts_and_validates_json() {
        let project = TestProject::new();
        let written = write_reports(project.root(), &finished_report()).expect("write reports");
        assert_eq!(written.len(), 2);

        let markdown = fs::read_to_string(&written[0]).expect("read markdown");
        assert!(markdown.contains("# Remediation Report"));

        let json = fs::read_to_string(&written[1]).expect("read json");
        let value: Value = serde_json::from_str(&json).expect("parse json");
        assert_eq!(value["status"], "done");
        assert_eq!(value["agents"][0]["dimension"], "security");
        assert!(json.ends_with('\n'));
    }

    #[test]
    fn rerun_overwrites_previous_artifacts() {
        let project = TestProject::new();
        let mut first = finished_report();
        first.duration_ms = 1;
        write_reports(project.root(), &first).expect("first write");

        let mut second = finished_report();
        second.duration_ms = 99;
        write_reports(project.root(), &second).expect("second write");

        let json =
            fs::read_to_string(project.root().join(REPORT_JSON)).expect("read json");
        let value: Value = serde_json::from_str(&json).expect("parse json");
        assert_eq!(value["duration_ms"], 99);
    }

    #[test]
    fn embedded_schema_is_valid_draft_2020_12() {
        let schema: Value = serde_json::from_str(SUMMARY_SCHEMA).expect("parse schema");
        validator_for(&schema).expect("compile schema");
    }
}
