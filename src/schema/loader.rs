//! JSON schema definitions
//!
//! Lets a schema for `serde_json::Value` records be declared in a file:
//!
//! ```json
//! {
//!   "tables": [
//!     {
//!       "name": "nodes",
//!       "indexes": [
//!         { "name": "id", "field": "id", "unique": true },
//!         { "name": "tags", "kind": "multi", "field": "tags" },
//!         { "name": "pair", "kind": "compound", "fields": ["dc", "name"] }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::index::{CompoundIndex, Indexer, JsonFieldIndex};

use super::errors::{SchemaError, SchemaResult};
use super::types::{DbSchema, IndexSchema, TableSchema};

/// How an index derives its keys from a JSON record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// One scalar at `field`
    #[default]
    Field,
    /// Every element of the array at `field`
    Multi,
    /// Concatenation of the scalars at `fields`
    Compound,
}

/// Declarative form of an `IndexSchema`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    #[serde(default)]
    pub kind: IndexKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub allow_missing: bool,
    #[serde(default)]
    pub lowercase: bool,
}

/// Declarative form of a `TableSchema`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    pub indexes: Vec<IndexDefinition>,
}

/// Declarative form of a `DbSchema<Value>`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub tables: Vec<TableDefinition>,
}

impl SchemaDefinition {
    /// Reads a definition from a JSON file.
    pub fn from_file(path: &Path) -> SchemaResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SchemaError::malformed(path.display().to_string(), format!("failed to read file: {}", e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            SchemaError::malformed(path.display().to_string(), format!("invalid JSON: {}", e))
        })
    }

    /// Parses a definition from a JSON string.
    pub fn from_json(content: &str) -> SchemaResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| SchemaError::malformed("<inline>", format!("invalid JSON: {}", e)))
    }

    /// Builds and validates the schema.
    pub fn build(&self) -> SchemaResult<DbSchema<Value>> {
        let mut tables = Vec::with_capacity(self.tables.len());
        for table in &self.tables {
            let mut schema = TableSchema::new(table.name.clone());
            for index in &table.indexes {
                schema = schema.index(build_index(&table.name, index)?);
            }
            tables.push(schema);
        }

        let schema = DbSchema::new(tables);
        schema.validate()?;
        Ok(schema)
    }
}

fn build_index(table: &str, def: &IndexDefinition) -> SchemaResult<IndexSchema<Value>> {
    let field = |def: &IndexDefinition| {
        def.field.clone().ok_or_else(|| {
            SchemaError::invalid_index(table, &def.name, "'field' is required for this kind")
        })
    };
    let json_index = |path: &str| {
        let index = JsonFieldIndex::new(path);
        if def.lowercase {
            index.lowercase()
        } else {
            index
        }
    };

    let indexer: Arc<dyn Indexer<Value>> = match def.kind {
        IndexKind::Field => Arc::new(json_index(field(def)?.as_str())),
        IndexKind::Multi => Arc::new(json_index(field(def)?.as_str()).multi()),
        IndexKind::Compound => {
            if def.fields.is_empty() {
                return Err(SchemaError::invalid_index(
                    table,
                    &def.name,
                    "'fields' must list at least one field",
                ));
            }
            let parts = def
                .fields
                .iter()
                .map(|path| Arc::new(json_index(path.as_str())) as Arc<dyn Indexer<Value>>)
                .collect();
            let compound = CompoundIndex::new(parts);
            if def.allow_missing {
                Arc::new(compound.allow_missing())
            } else {
                Arc::new(compound)
            }
        }
    };

    let mut index = IndexSchema::with_indexer(def.name.clone(), indexer);
    if def.unique {
        index = index.unique();
    }
    if def.allow_missing {
        index = index.allow_missing();
    }
    Ok(index)
}

/// Reads, builds and validates a schema file.
pub fn load_schema(path: &Path) -> SchemaResult<DbSchema<Value>> {
    SchemaDefinition::from_file(path)?.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaErrorCode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const NODES: &str = r#"{
        "tables": [
            {
                "name": "nodes",
                "indexes": [
                    { "name": "id", "field": "id", "unique": true },
                    { "name": "name", "field": "name", "lowercase": true },
                    { "name": "tags", "kind": "multi", "field": "tags", "allow_missing": true },
                    { "name": "pair", "kind": "compound", "fields": ["dc", "name"] }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_build_definition() {
        let schema = SchemaDefinition::from_json(NODES).unwrap().build().unwrap();
        let table = schema.table("nodes").unwrap();
        assert_eq!(table.indexes().len(), 4);
        assert!(table.indexes()[0].is_unique());
        assert!(table.indexes()[2].indexer().is_multi());
        assert!(table.indexes()[2].allows_missing());
        assert_eq!(table.indexes()[3].indexer().kind(), "compound");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(NODES.as_bytes()).unwrap();

        let schema = load_schema(file.path()).unwrap();
        assert_eq!(schema.table_names(), vec!["nodes".to_string()]);
    }

    #[test]
    fn test_missing_file() {
        let err = load_schema(Path::new("/nonexistent/schema.json")).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::MemdbSchemaMalformed);
    }

    #[test]
    fn test_malformed_json() {
        let err = SchemaDefinition::from_json("{ not json").unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::MemdbSchemaMalformed);
    }

    #[test]
    fn test_field_required() {
        let def = r#"{"tables": [{"name": "t", "indexes": [{"name": "id", "unique": true}]}]}"#;
        let err = SchemaDefinition::from_json(def).unwrap().build().unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::MemdbSchemaInvalidIndex);
    }

    #[test]
    fn test_definition_is_validated() {
        let def = r#"{"tables": [{"name": "t", "indexes": [{"name": "id", "field": "id"}]}]}"#;
        let err = SchemaDefinition::from_json(def).unwrap().build().unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::MemdbSchemaInvalidId);
    }
}
