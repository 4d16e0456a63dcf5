//! Per-path mutual exclusion for the fixing phase.
//!
//! Before an agent's fix step runs, the coordinator claims every path that
//! agent intends to write. A second claimant on any path is rejected, which
//! forces overlapping agents to run one after another. Agents with disjoint
//! claim sets could fix concurrently without violating the write-exclusivity
//! invariant; execution order within a phase carries no semantic weight.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::error::PipelineError;

/// Registry of fix-target claims for a single run.
#[derive(Debug, Default)]
pub struct ClaimRegistry {
    held: BTreeMap<PathBuf, String>,
}

impl ClaimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim every path in `paths` for `agent`.
    ///
    /// All-or-nothing: if any path is held by a different agent, nothing is
    /// claimed and the conflict is returned. Re-claiming a path the same
    /// agent already holds is a no-op.
    pub fn claim_all<'a>(
        &mut self,
        agent: &str,
        paths: impl IntoIterator<Item = &'a Path>,
    ) -> Result<(), PipelineError> {
        let paths: Vec<&Path> = paths.into_iter().collect();
        for path in &paths {
            if let Some(holder) = self.held.get(*path)
                && holder != agent
            {
                return Err(PipelineError::ClaimConflict {
                    path: path.display().to_string(),
                    holder: holder.clone(),
                });
            }
        }
        for path in paths {
            self.held.insert(path.to_path_buf(), agent.to_string());
        }
        Ok(())
    }

    /// Release every claim held by `agent`.
    pub fn release(&mut self, agent: &str) {
        self.held.retain(|_, holder| holder != agent);
    }

    pub fn holder(&self, path: &Path) -> Option<&str> {
        self.held.get(path).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}
