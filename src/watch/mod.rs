//! Change notification for memdb
//!
//! Every radix tree node and leaf owns a `WatchCh`. A commit closes the
//! channels of every node and leaf it replaced, after the new snapshot is
//! published, so a caller woken by a channel always observes the commit that
//! closed it when it next opens a transaction.
//!
//! Callers collect channels into a `WatchSet` and either block on it
//! (`watch`) or await it (`changed`).

mod channel;
mod set;

pub use channel::WatchCh;
pub use set::WatchSet;
