//! Stable exit codes for the mender CLI.

/// Run completed and every agent's validation passed (or dry run).
pub const OK: i32 = 0;
/// Run completed but at least one agent's validation failed.
pub const VALIDATION_FAILED: i32 = 1;
/// A fatal failure aborted the run; the pre-run snapshot was restored
/// (or could not be, see the report).
pub const ROLLED_BACK: i32 = 2;
/// Invalid CLI invocation or configuration; nothing was touched.
pub const CONFIG: i32 = 3;
