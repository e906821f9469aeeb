//! Structural validation of a `DbSchema`
//!
//! Rules:
//! - At least one table
//! - Table names are non-empty and unique
//! - Every table has at least one index, including `id`
//! - Index names are non-empty, unique per table and do not end in `_prefix`
//! - The `id` index is unique, not sparse and single-valued
//!
//! Validation is deterministic: tables and indexes are checked in
//! declaration order and the first violation is reported.

use std::collections::HashSet;

use super::errors::{SchemaError, SchemaResult};
use super::types::{DbSchema, TableSchema, PREFIX_SUFFIX};

/// Stateless schema checker.
pub struct SchemaValidator;

impl SchemaValidator {
    /// Validates the whole schema.
    pub fn validate<R>(schema: &DbSchema<R>) -> SchemaResult<()> {
        if schema.tables().is_empty() {
            return Err(SchemaError::no_tables());
        }

        let mut seen = HashSet::new();
        for table in schema.tables() {
            if table.name().is_empty() {
                return Err(SchemaError::invalid_table("", "name must not be empty"));
            }
            if !seen.insert(table.name()) {
                return Err(SchemaError::invalid_table(table.name(), "declared twice"));
            }
            Self::validate_table(table)?;
        }
        Ok(())
    }

    /// Validates one table in isolation.
    pub fn validate_table<R>(table: &TableSchema<R>) -> SchemaResult<()> {
        if table.indexes().is_empty() {
            return Err(SchemaError::invalid_table(table.name(), "no indexes declared"));
        }

        let mut seen = HashSet::new();
        for index in table.indexes() {
            let name = index.name();
            if name.is_empty() {
                return Err(SchemaError::invalid_index(table.name(), name, "name must not be empty"));
            }
            if name.ends_with(PREFIX_SUFFIX) {
                return Err(SchemaError::invalid_index(
                    table.name(),
                    name,
                    format!("names ending in '{}' are reserved", PREFIX_SUFFIX),
                ));
            }
            if !seen.insert(name) {
                return Err(SchemaError::invalid_index(table.name(), name, "declared twice"));
            }
        }

        let id = match table.id_position() {
            Some(pos) => &table.indexes()[pos],
            None => return Err(SchemaError::missing_id(table.name())),
        };
        if !id.is_unique() {
            return Err(SchemaError::invalid_id(table.name(), "must be unique"));
        }
        if id.allows_missing() {
            return Err(SchemaError::invalid_id(table.name(), "must not allow missing values"));
        }
        if id.indexer().is_multi() {
            return Err(SchemaError::invalid_id(table.name(), "must be single-valued"));
        }

        Ok(())
    }
}
