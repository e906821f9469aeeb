//! Observable events for memdb
//!
//! Events are explicit and typed; each one carries its default severity.

use std::fmt;

use super::logger::{Logger, Severity};

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Store opened with a validated schema
    StoreOpened,
    /// Store closed to further writes
    StoreClosed,
    /// Independent store forked from the current state
    StoreSnapshot,

    // Transactions, only emitted when `StoreConfig::log_transactions` is set
    /// Write transaction committed
    TxnCommitted,
    /// Write transaction aborted or dropped
    TxnAborted,

    // Schemas
    /// Schema passed validation
    SchemaValidated,
    /// Schema failed validation
    SchemaRejected,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StoreOpened => "STORE_OPENED",
            Event::StoreClosed => "STORE_CLOSED",
            Event::StoreSnapshot => "STORE_SNAPSHOT",
            Event::TxnCommitted => "TXN_COMMITTED",
            Event::TxnAborted => "TXN_ABORTED",
            Event::SchemaValidated => "SCHEMA_VALIDATED",
            Event::SchemaRejected => "SCHEMA_REJECTED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::SchemaRejected => Severity::Error,
            _ => Severity::Info,
        }
    }

    /// Writes the event through `Logger`.
    pub fn emit(&self, fields: &[(&str, &str)]) {
        Logger::emit(self.severity(), self.as_str(), fields);
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
