//! Transaction errors

use thiserror::Error;

use crate::index::IndexError;

/// Result type for transaction operations
pub type TxnResult<T> = Result<T, TxnError>;

/// Runtime transaction errors
///
/// None of these affect committed state: a failed call leaves the store and
/// the transaction's pending writes exactly as they were.
#[derive(Debug, Clone, Error)]
pub enum TxnError {
    // ==================
    // Lookup Errors
    // ==================
    /// Unknown table name
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Unknown index name
    #[error("Index not found: {table}.{index}")]
    IndexNotFound { table: String, index: String },

    /// No record with the given id
    #[error("Record not found in table {0}")]
    RecordNotFound(String),

    // ==================
    // Encoding Errors
    // ==================
    /// An indexer rejected a record or query arguments
    #[error("Failed to encode {table}.{index}: {source}")]
    Encoding {
        table: String,
        index: String,
        #[source]
        source: IndexError,
    },

    // ==================
    // Constraint Errors
    // ==================
    /// Another record already holds the key on a unique index
    #[error("Unique constraint violated on {table}.{index}")]
    UniqueViolation { table: String, index: String },

    // ==================
    // Usage Errors
    // ==================
    /// Write operation on a read transaction
    #[error("Transaction is read-only")]
    ReadOnly,

    /// Transaction already committed or aborted
    #[error("Transaction already finished")]
    Finished,

    /// Store closed to writes
    #[error("Store is closed")]
    Closed,
}

impl TxnError {
    pub(crate) fn encoding(table: &str, index: &str, source: IndexError) -> Self {
        TxnError::Encoding {
            table: table.to_string(),
            index: index.to_string(),
            source,
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            TxnError::TableNotFound(_) => "MEMDB_TABLE_NOT_FOUND",
            TxnError::IndexNotFound { .. } => "MEMDB_INDEX_NOT_FOUND",
            TxnError::RecordNotFound(_) => "MEMDB_RECORD_NOT_FOUND",
            TxnError::Encoding { .. } => "MEMDB_ENCODING_FAILED",
            TxnError::UniqueViolation { .. } => "MEMDB_UNIQUE_VIOLATION",
            TxnError::ReadOnly => "MEMDB_TXN_READ_ONLY",
            TxnError::Finished => "MEMDB_TXN_FINISHED",
            TxnError::Closed => "MEMDB_STORE_CLOSED",
        }
    }

    /// True for the NotFound class
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TxnError::TableNotFound(_) | TxnError::IndexNotFound { .. } | TxnError::RecordNotFound(_)
        )
    }
}
