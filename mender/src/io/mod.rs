//! Side-effecting operations: filesystem tree access, snapshots,
//! configuration loading, detection and transformation over the tree, and
//! report artifacts.

pub mod backup;
pub mod config;
pub mod detect;
pub mod report_store;
pub mod transform;
pub mod tree;
