//! Global phase machine for a remediation run.
//!
//! Phases are strictly sequential: every agent finishes phase N before any
//! agent enters N+1. The coordinator owns the single `Phase` value and all
//! transitions flow through [`Phase::transition`], so an out-of-order step
//! is a typed programming error rather than a silent reordering.

use std::fmt;

use serde::Serialize;

use crate::core::error::PipelineError;

/// Run phase. `Done` and `RolledBack` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Init,
    Analyzing,
    Fixing,
    Validating,
    Done,
    RolledBack,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::RolledBack)
    }

    /// Whether `next` is a legal successor of `self`.
    ///
    /// Legal edges: the forward chain `Init -> Analyzing -> Fixing ->
    /// Validating -> Done`, the dry-run short-circuit `Analyzing -> Done`,
    /// and the abort edges from every non-terminal working phase to
    /// `RolledBack`.
    pub fn can_transition(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Self::Init, Self::Analyzing)
                | (Self::Analyzing, Self::Fixing)
                | (Self::Analyzing, Self::Done)
                | (Self::Analyzing, Self::RolledBack)
                | (Self::Fixing, Self::Validating)
                | (Self::Fixing, Self::RolledBack)
                | (Self::Validating, Self::Done)
                | (Self::Validating, Self::RolledBack)
        )
    }

    /// Advance to `next`, rejecting illegal edges.
    pub fn transition(&mut self, next: Phase) -> Result<(), PipelineError> {
        if !self.can_transition(next) {
            return Err(PipelineError::Phase {
                from: self.to_string(),
                to: next.to_string(),
            });
        }
        *self = next;
        Ok(())
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Analyzing => "analyzing",
            Self::Fixing => "fixing",
            Self::Validating => "validating",
            Self::Done => "done",
            Self::RolledBack => "rolled_back",
        };
        f.write_str(name)
    }
}
