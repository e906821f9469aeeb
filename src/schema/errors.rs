//! Schema error types
//!
//! Error codes:
//! - MEMDB_SCHEMA_NO_TABLES (FATAL)
//! - MEMDB_SCHEMA_INVALID_TABLE (FATAL)
//! - MEMDB_SCHEMA_INVALID_INDEX (FATAL)
//! - MEMDB_SCHEMA_MISSING_ID (FATAL)
//! - MEMDB_SCHEMA_INVALID_ID (FATAL)
//! - MEMDB_SCHEMA_MALFORMED (FATAL)
//!
//! A schema error is fatal to store creation only; an existing store is
//! never affected.

use std::fmt;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The store cannot be created
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Schema declares no tables
    MemdbSchemaNoTables,
    /// Table name empty or duplicated, or table without indexes
    MemdbSchemaInvalidTable,
    /// Index name empty, duplicated or reserved
    MemdbSchemaInvalidIndex,
    /// Table lacks the `id` index
    MemdbSchemaMissingId,
    /// `id` index is sparse, non-unique or multi-valued
    MemdbSchemaInvalidId,
    /// Schema definition file unreadable or malformed
    MemdbSchemaMalformed,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::MemdbSchemaNoTables => "MEMDB_SCHEMA_NO_TABLES",
            SchemaErrorCode::MemdbSchemaInvalidTable => "MEMDB_SCHEMA_INVALID_TABLE",
            SchemaErrorCode::MemdbSchemaInvalidIndex => "MEMDB_SCHEMA_INVALID_INDEX",
            SchemaErrorCode::MemdbSchemaMissingId => "MEMDB_SCHEMA_MISSING_ID",
            SchemaErrorCode::MemdbSchemaInvalidId => "MEMDB_SCHEMA_INVALID_ID",
            SchemaErrorCode::MemdbSchemaMalformed => "MEMDB_SCHEMA_MALFORMED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema error with context
#[derive(Debug, Clone)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    table: Option<String>,
}

impl SchemaError {
    pub fn no_tables() -> Self {
        Self {
            code: SchemaErrorCode::MemdbSchemaNoTables,
            message: "schema must declare at least one table".into(),
            table: None,
        }
    }

    pub fn invalid_table(table: impl Into<String>, reason: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            code: SchemaErrorCode::MemdbSchemaInvalidTable,
            message: format!("table '{}': {}", table, reason.into()),
            table: Some(table),
        }
    }

    pub fn invalid_index(
        table: impl Into<String>,
        index: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let table = table.into();
        Self {
            code: SchemaErrorCode::MemdbSchemaInvalidIndex,
            message: format!("table '{}', index '{}': {}", table, index.into(), reason.into()),
            table: Some(table),
        }
    }

    pub fn missing_id(table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            code: SchemaErrorCode::MemdbSchemaMissingId,
            message: format!("table '{}' must have an 'id' index", table),
            table: Some(table),
        }
    }

    pub fn invalid_id(table: impl Into<String>, reason: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            code: SchemaErrorCode::MemdbSchemaInvalidId,
            message: format!("table '{}': 'id' index {}", table, reason.into()),
            table: Some(table),
        }
    }

    /// Schema definition could not be read or parsed
    pub fn malformed(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::MemdbSchemaMalformed,
            message: format!("{}: {}", source.into(), reason.into()),
            table: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
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

    /// Returns the offending table, if any
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
