//! Schema type definitions
//!
//! A `DbSchema` is a set of tables; each table is an ordered list of
//! indexes, one of which is the `id` primary key. Schemas are immutable
//! once a store has been opened with them.

use std::fmt;
use std::sync::Arc;

use crate::index::Indexer;
use crate::mvcc::{TxnError, TxnResult};

use super::errors::SchemaResult;
use super::validator::SchemaValidator;

/// Name of the mandatory primary key index.
pub const ID_INDEX: &str = "id";

/// Suffix that turns an index name into a prefix lookup.
pub const PREFIX_SUFFIX: &str = "_prefix";

/// One index of a table.
pub struct IndexSchema<R> {
    name: String,
    unique: bool,
    allow_missing: bool,
    indexer: Arc<dyn Indexer<R>>,
}

impl<R> IndexSchema<R> {
    /// Creates a non-unique, non-sparse index.
    pub fn new(name: impl Into<String>, indexer: impl Indexer<R> + 'static) -> Self {
        Self::with_indexer(name, Arc::new(indexer))
    }

    pub fn with_indexer(name: impl Into<String>, indexer: Arc<dyn Indexer<R>>) -> Self {
        Self {
            name: name.into(),
            unique: false,
            allow_missing: false,
            indexer,
        }
    }

    /// At most one record per key.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Records without a value are left out of the index instead of failing.
    pub fn allow_missing(mut self) -> Self {
        self.allow_missing = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn allows_missing(&self) -> bool {
        self.allow_missing
    }

    pub fn indexer(&self) -> &dyn Indexer<R> {
        self.indexer.as_ref()
    }
}

impl<R> Clone for IndexSchema<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            unique: self.unique,
            allow_missing: self.allow_missing,
            indexer: Arc::clone(&self.indexer),
        }
    }
}

impl<R> fmt::Debug for IndexSchema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexSchema")
            .field("name", &self.name)
            .field("unique", &self.unique)
            .field("allow_missing", &self.allow_missing)
            .field("kind", &self.indexer.kind())
            .finish()
    }
}

/// A table: a name and its indexes, in declaration order.
pub struct TableSchema<R> {
    name: String,
    indexes: Vec<IndexSchema<R>>,
}

impl<R> TableSchema<R> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            indexes: Vec::new(),
        }
    }

    /// Adds an index (builder style).
    pub fn index(mut self, index: IndexSchema<R>) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn indexes(&self) -> &[IndexSchema<R>] {
        &self.indexes
    }

    /// Position of the index called `name`.
    pub fn index_position(&self, name: &str) -> Option<usize> {
        self.indexes.iter().position(|index| index.name == name)
    }

    /// Position of the `id` index.
    pub fn id_position(&self) -> Option<usize> {
        self.index_position(ID_INDEX)
    }
}

impl<R> Clone for TableSchema<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            indexes: self.indexes.clone(),
        }
    }
}

impl<R> fmt::Debug for TableSchema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableSchema")
            .field("name", &self.name)
            .field("indexes", &self.indexes)
            .finish()
    }
}

/// A resolved (table, index) position within a `DbSchema`.
///
/// Only obtainable from `DbSchema::resolve_index`, so it always points at
/// an existing index of the schema it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexRef {
    table: usize,
    index: usize,
}

impl IndexRef {
    pub(crate) fn new(table: usize, index: usize) -> Self {
        Self { table, index }
    }

    pub fn table(&self) -> usize {
        self.table
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// The full set of tables.
pub struct DbSchema<R> {
    tables: Vec<TableSchema<R>>,
}

impl<R> DbSchema<R> {
    /// Wraps `tables` without validating them; see `validate`.
    pub fn new(tables: Vec<TableSchema<R>>) -> Self {
        Self { tables }
    }

    pub fn builder() -> DbSchemaBuilder<R> {
        DbSchemaBuilder { tables: Vec::new() }
    }

    /// Checks every structural rule of the schema.
    pub fn validate(&self) -> SchemaResult<()> {
        SchemaValidator::validate(self)
    }

    pub fn tables(&self) -> &[TableSchema<R>] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema<R>> {
        self.tables.iter().find(|table| table.name == name)
    }

    pub fn table_position(&self, name: &str) -> Option<usize> {
        self.tables.iter().position(|table| table.name == name)
    }

    /// Table names in sorted order.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|t| t.name.clone()).collect();
        names.sort();
        names
    }

    /// Resolves a (table, index) pair by name.
    pub fn resolve_index(&self, table: &str, index: &str) -> TxnResult<IndexRef> {
        let table_pos = self
            .table_position(table)
            .ok_or_else(|| TxnError::TableNotFound(table.to_string()))?;
        let index_pos = self.tables[table_pos]
            .index_position(index)
            .ok_or_else(|| TxnError::IndexNotFound {
                table: table.to_string(),
                index: index.to_string(),
            })?;
        Ok(IndexRef::new(table_pos, index_pos))
    }

    /// The table an `IndexRef` points into, if it is in range for this
    /// schema.
    pub fn table_at(&self, index_ref: IndexRef) -> Option<&TableSchema<R>> {
        self.tables.get(index_ref.table)
    }

    /// The index an `IndexRef` points at, if it is in range for this schema.
    pub fn index_at(&self, index_ref: IndexRef) -> Option<&IndexSchema<R>> {
        self.table_at(index_ref)?.indexes.get(index_ref.index)
    }
}

impl<R> Clone for DbSchema<R> {
    fn clone(&self) -> Self {
        Self {
            tables: self.tables.clone(),
        }
    }
}

impl<R> fmt::Debug for DbSchema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbSchema").field("tables", &self.tables).finish()
    }
}

/// Builder for `DbSchema`; `build` validates.
pub struct DbSchemaBuilder<R> {
    tables: Vec<TableSchema<R>>,
}

impl<R> DbSchemaBuilder<R> {
    pub fn table(mut self, table: TableSchema<R>) -> Self {
        self.tables.push(table);
        self
    }

    pub fn build(self) -> SchemaResult<DbSchema<R>> {
        let schema = DbSchema::new(self.tables);
        schema.validate()?;
        Ok(schema)
    }
}
