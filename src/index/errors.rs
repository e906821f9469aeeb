//! Index encoding error types
//!
//! Error codes:
//! - MEMDB_INDEX_MISSING_VALUE (REJECT)
//! - MEMDB_INDEX_BAD_ARGS (REJECT)
//! - MEMDB_INDEX_TYPE_MISMATCH (REJECT)
//! - MEMDB_INDEX_UNSUPPORTED_VALUE (REJECT)

use std::fmt;

/// Severity levels for index errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The write or query is rejected; the store is unaffected
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Index-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexErrorCode {
    /// A record lacks the value a non-sparse index needs
    MemdbIndexMissingValue,
    /// Wrong number of query arguments
    MemdbIndexBadArgs,
    /// Query argument of the wrong type
    MemdbIndexTypeMismatch,
    /// Record value cannot be encoded (object, nested array, ...)
    MemdbIndexUnsupportedValue,
}

impl IndexErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            IndexErrorCode::MemdbIndexMissingValue => "MEMDB_INDEX_MISSING_VALUE",
            IndexErrorCode::MemdbIndexBadArgs => "MEMDB_INDEX_BAD_ARGS",
            IndexErrorCode::MemdbIndexTypeMismatch => "MEMDB_INDEX_TYPE_MISMATCH",
            IndexErrorCode::MemdbIndexUnsupportedValue => "MEMDB_INDEX_UNSUPPORTED_VALUE",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for IndexErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Index error type with context
#[derive(Debug, Clone)]
pub struct IndexError {
    code: IndexErrorCode,
    message: String,
}

impl IndexError {
    /// A required value is absent from the record
    pub fn missing_value(what: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::MemdbIndexMissingValue,
            message: format!("missing value for {}", what.into()),
        }
    }

    /// Wrong argument count
    pub fn bad_args(expected: usize, actual: usize) -> Self {
        Self {
            code: IndexErrorCode::MemdbIndexBadArgs,
            message: format!("expected {} argument(s), got {}", expected, actual),
        }
    }

    /// Argument type does not match the indexer
    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        Self {
            code: IndexErrorCode::MemdbIndexTypeMismatch,
            message: format!("expected {} argument, got {}", expected, actual),
        }
    }

    /// Value cannot be turned into a key
    pub fn unsupported_value(reason: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::MemdbIndexUnsupportedValue,
            message: reason.into(),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> IndexErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for IndexError {}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;
