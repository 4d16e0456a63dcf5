//! Multi-agent codebase remediation CLI.
//!
//! `mender run` drives the full analyze/fix/validate pipeline over a project
//! directory and writes report artifacts into it. Exit codes are stable:
//! 0 clean, 1 validation failed, 2 rolled back, 3 bad invocation.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;

use mender::agents::roster::default_roster;
use mender::core::error::PipelineError;
use mender::core::outcome::{RunReport, RunStatus};
use mender::exit_codes;
use mender::io::config::load_config;
use mender::io::report_store::write_reports;
use mender::io::tree::FileTree;
use mender::orchestrate::{RunOptions, run_pipeline};
use mender::{logging, report};

#[derive(Parser)]
#[command(
    name = "mender",
    version,
    about = "Multi-agent codebase remediation pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze, fix, and validate a project directory.
    Run {
        /// Project directory to remediate.
        #[arg(long)]
        project_path: PathBuf,
        /// Analyze and report only; never write into the project.
        #[arg(long)]
        dry_run: bool,
        /// Skip the pre-run snapshot. Disables rollback on fatal failure.
        #[arg(long)]
        skip_backup: bool,
        /// Config file path. Defaults to `mender.toml` under the project.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();
    let code = match cli.command {
        Command::Run {
            project_path,
            dry_run,
            skip_backup,
            config,
        } => cmd_run(&project_path, dry_run, skip_backup, config.as_deref()),
    };
    ExitCode::from(code as u8)
}

fn cmd_run(
    project_path: &std::path::Path,
    dry_run: bool,
    skip_backup: bool,
    config_path: Option<&std::path::Path>,
) -> i32 {
    let config_path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(|| project_path.join("mender.toml"));
    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %format!("{err:#}"), "invalid configuration");
            eprintln!("mender: {err:#}");
            return exit_codes::CONFIG;
        }
    };

    let tree = match FileTree::open(project_path) {
        Ok(tree) => tree,
        Err(err) => {
            eprintln!("mender: {err}");
            return exit_codes::CONFIG;
        }
    };

    let roster = match default_roster(&config) {
        Ok(roster) => roster,
        Err(err) => {
            eprintln!("mender: {err}");
            return exit_codes::CONFIG;
        }
    };

    let options = RunOptions {
        dry_run,
        skip_backup,
        ..RunOptions::default()
    };
    match run_pipeline(&tree, &roster, &options) {
        Ok(run) => emit(project_path, &run),
        Err(err @ PipelineError::Configuration(_)) => {
            eprintln!("mender: {err}");
            exit_codes::CONFIG
        }
        Err(err) => {
            eprintln!("mender: {err}");
            exit_codes::ROLLED_BACK
        }
    }
}

/// Print or persist the report and map the run outcome to an exit code.
fn emit(project_path: &std::path::Path, run: &RunReport) -> i32 {
    match run.status {
        // Dry runs leave the project untouched; the report goes to stdout.
        RunStatus::DryRun => match report::render_markdown(run) {
            Ok(markdown) => {
                print!("{markdown}");
                exit_codes::OK
            }
            Err(err) => {
                // Nothing was mutated; a render failure is a broken template,
                // not a rollback.
                eprintln!("mender: {err:#}");
                exit_codes::CONFIG
            }
        },
        _ => {
            if let Err(err) = write_reports(project_path, run) {
                eprintln!("mender: {err:#}");
                return exit_codes::ROLLED_BACK;
            }
            match run.status {
                RunStatus::Done if run.success => exit_codes::OK,
                RunStatus::Done => exit_codes::VALIDATION_FAILED,
                RunStatus::RolledBack | RunStatus::RolledBackPartial => exit_codes::ROLLED_BACK,
                RunStatus::DryRun => exit_codes::OK,
            }
        }
    }
}
