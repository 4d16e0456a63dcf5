//! Append-only modification ledger.
//!
//! Every successful fix records exactly one entry. Sequence numbers are
//! assigned by the ledger and strictly increase across the whole run, which
//! gives a total order over modifications from all agents and makes replay
//! deterministic in tests. Entries are never mutated or removed; the type
//! exposes no API for either.

use std::path::PathBuf;

use serde::Serialize;

use crate::core::error::PipelineError;

/// A single recorded write performed during the fix phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Modification {
    /// Ledger-assigned monotonic timestamp, total order across the run.
    pub seq: u64,
    /// Target path relative to the project tree root.
    pub target: PathBuf,
    pub description: String,
}

/// What a transformer hands back: the ledger turns it into a `Modification`
/// by assigning the next sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub target: PathBuf,
    pub description: String,
}

impl Patch {
    pub fn new(target: impl Into<PathBuf>, description: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            description: description.into(),
        }
    }
}

/// Append-only log of every write performed during a run.
#[derive(Debug, Default)]
pub struct ModificationLedger {
    entries: Vec<Modification>,
    next_seq: u64,
    closed: bool,
}

impl ModificationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a patch, assigning the next sequence number.
    ///
    /// Fails only once the run has reached a terminal phase; appending after
    /// close is a programming error, not a recoverable condition.
    pub fn record(&mut self, patch: Patch) -> Result<&Modification, PipelineError> {
        if self.closed {
            return Err(PipelineError::LedgerClosed);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Modification {
            seq,
            target: patch.target,
            description: patch.description,
        });
        Ok(self.entries.last().expect("entry just pushed"))
    }

    /// Read-only filter over recorded entries.
    pub fn query(&self, predicate: impl Fn(&Modification) -> bool) -> Vec<Modification> {
        self.entries
            .iter()
            .filter(|m| predicate(m))
            .cloned()
            .collect()
    }

    pub fn entries(&self) -> &[Modification] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Seal the ledger when the run reaches a terminal phase.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_assigns_strictly_increasing_seq() {
        let mut ledger = ModificationLedger::new();
        ledger
            .record(Patch::new("a.txt", "create"))
            .expect("record");
        ledger
            .record(Patch::new("b.txt", "create"))
            .expect("record");
        ledger
            .record(Patch::new("a.txt", "rewrite"))
            .expect("record");

        let seqs: Vec<u64> = ledger.entries().iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn record_after_close_is_an_error() {
        let mut ledger = ModificationLedger::new();
        ledger.close();

        let err = ledger.record(Patch::new("a.txt", "create")).unwrap_err();
        assert!(matches!(err, PipelineError::LedgerClosed));
        assert!(ledger.is_empty());
    }

    #[test]
    fn query_filters_without_mutating() {
        let mut ledger = ModificationLedger::new();
        ledger
            .record(Patch::new("tests/a_test.rs", "peer stub"))
            .expect("record");
        ledger
            .record(Patch::new("README.md", "readme stub"))
            .expect("record");

        let matched = ledger.query(|m| m.target.starts_with("tests"));
        assert_eq!(matched.len(), 1);
        assert_eq!(ledger.len(), 2);
    }
}
