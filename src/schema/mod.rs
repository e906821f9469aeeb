//! Table and database schemas for memdb
//!
//! Schemas are declared once, validated once, and never change while a
//! store uses them.
//!
//! # Design Principles
//!
//! - Every table has a unique, non-sparse, single-valued `id` index
//! - Index names are resolved to positions, so hot paths index vectors
//! - Indexers must be pure; this is a precondition and is not checked

mod errors;
mod loader;
mod types;
mod validator;

pub use errors::{SchemaError, SchemaErrorCode, SchemaResult, Severity};
pub use loader::{load_schema, IndexDefinition, IndexKind, SchemaDefinition, TableDefinition};
pub use types::{
    DbSchema, DbSchemaBuilder, IndexRef, IndexSchema, TableSchema, ID_INDEX, PREFIX_SUFFIX,
};
pub use validator::SchemaValidator;
