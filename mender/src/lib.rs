//! Multi-agent codebase remediation pipeline.
//!
//! A coordinator drives a roster of expert agents, one per quality
//! dimension, over a project tree in three strictly ordered phases: every
//! agent analyzes, then every agent fixes, then every agent validates. The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (issue taxonomy, ledger, phase
//!   machine, claims). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (tree access, snapshots, config,
//!   detection/transformation, report artifacts). Isolated to enable
//!   scripted collaborators in tests.
//!
//! [`orchestrate`] coordinates core logic with I/O; [`agents`] defines the
//! per-dimension analyze/fix/validate contract and the default roster;
//! [`report`] renders the outcome.

pub mod agents;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod orchestrate;
pub mod report;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
