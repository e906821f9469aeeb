//! memdb - a schema-driven, in-memory, transactional table store
//!
//! Records live in persistent radix trees, one per (table, index). Readers
//! work on immutable snapshots; a single writer builds the next snapshot by
//! copy-on-write and publishes it atomically.

pub mod cli;
pub mod config;
pub mod index;
pub mod mvcc;
pub mod observability;
pub mod radix;
pub mod schema;
pub mod watch;
