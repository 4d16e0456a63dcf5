//! CLI tests for `mender run`.
//!
//! Spawns the mender binary and verifies exit codes and report artifacts
//! for clean, failing, and misconfigured projects.

use std::fs;
use std::path::Path;
use std::process::Command;

use mender::exit_codes;

fn mender_run(project: &Path, extra: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_mender"))
        .arg("run")
        .arg("--project-path")
        .arg(project)
        .args(extra)
        .output()
        .expect("mender run")
}

#[test]
fn fixable_project_exits_ok_and_writes_reports() {
    let temp = tempfile::tempdir().expect("tempdir");
    let project = temp.path().join("project");
    fs::create_dir_all(&project).expect("mkdir");

    let output = mender_run(&project, &[]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));

    assert!(project.join("tests").is_dir());
    assert!(project.join("docs").is_dir());
    assert!(project.join("README.md").exists());
    assert!(project.join("mender-report.md").exists());

    let summary = fs::read_to_string(project.join("mender-report.json")).expect("read summary");
    let value: serde_json::Value = serde_json::from_str(&summary).expect("parse summary");
    assert_eq!(value["status"], "done");
    assert_eq!(value["success"], true);
}

#[test]
fn unfixable_issue_exits_with_validation_failure() {
    let temp = tempfile::tempdir().expect("tempdir");
    let project = temp.path().join("project");
    fs::create_dir_all(&project).expect("mkdir");
    // A rewrite whose replacement still matches the pattern never converges.
    fs::write(
        project.join("mender.toml"),
        r#"
[[performance.patterns]]
pattern = "sleep"
replacement = "sleep_briefly"
file_ext = "py"
severity = "medium"
"#,
    )
    .expect("write config");
    fs::write(project.join("worker.py"), "time.sleep(5)\n").expect("write source");

    let output = mender_run(&project, &[]);
    assert_eq!(output.status.code(), Some(exit_codes::VALIDATION_FAILED));

    let summary = fs::read_to_string(project.join("mender-report.json")).expect("read summary");
    let value: serde_json::Value = serde_json::from_str(&summary).expect("parse summary");
    assert_eq!(value["success"], false);
}

#[test]
fn invalid_config_exits_with_config_code_and_touches_nothing() {
    let temp = tempfile::tempdir().expect("tempdir");
    let project = temp.path().join("project");
    fs::create_dir_all(&project).expect("mkdir");
    fs::write(
        project.join("mender.toml"),
        r#"
[[security.patterns]]
pattern = "([unclosed"
replacement = ""
"#,
    )
    .expect("write config");

    let output = mender_run(&project, &[]);
    assert_eq!(output.status.code(), Some(exit_codes::CONFIG));
    assert!(!project.join("README.md").exists());
    assert!(!project.join("mender-report.md").exists());
}

#[test]
fn missing_project_path_exits_with_config_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = mender_run(&temp.path().join("absent"), &[]);
    assert_eq!(output.status.code(), Some(exit_codes::CONFIG));
}

#[test]
fn dry_run_prints_report_and_leaves_project_untouched() {
    let temp = tempfile::tempdir().expect("tempdir");
    let project = temp.path().join("project");
    fs::create_dir_all(&project).expect("mkdir");

    let output = mender_run(&project, &["--dry-run", "--skip-backup"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));

    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(stdout.contains("# Remediation Report"));
    assert!(stdout.contains("dry_run"));

    // Nothing was fixed and no artifacts were written.
    assert!(!project.join("README.md").exists());
    assert!(!project.join("tests").exists());
    assert!(!project.join("mender-report.md").exists());
    assert_eq!(fs::read_dir(&project).expect("list").count(), 0);
}
