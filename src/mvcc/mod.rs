//! Transactions over versioned index trees
//!
//! This module provides:
//! - `Store` - root pointer to the current snapshot, single writer lock
//! - `Txn` - snapshot-isolated reads, serialized copy-on-write writes
//! - `Snapshot` - one immutable version of every index tree
//! - `CommitId` - snapshot version number
//! - `ResultIterator` - lazy query results with a watch channel
//! - `Change` - per-record change tracking
//!
//! # Invariants
//!
//! - Readers never block and never observe a partial commit
//! - Commits are linearized in writer-lock acquisition order
//! - Watch channels close only after the new snapshot is visible

mod changes;
mod commit_id;
mod errors;
mod iter;
mod snapshot;
mod store;
mod txn;

pub use changes::Change;
pub use commit_id::CommitId;
pub use errors::{TxnError, TxnResult};
pub use iter::ResultIterator;
pub use snapshot::Snapshot;
pub use store::Store;
pub use txn::Txn;
