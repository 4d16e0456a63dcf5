//! Deterministic, pure logic shared by the pipeline.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod claims;
pub mod error;
pub mod issue;
pub mod ledger;
pub mod outcome;
pub mod phase;
