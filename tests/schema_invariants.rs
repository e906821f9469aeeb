//! Schema Invariant Tests
//!
//! Tests for schema rules as seen through the public API:
//! - A store never opens on an invalid schema
//! - Every table has a unique, single-valued, required `id` index
//! - Unknown tables and indexes are reported by name

use serde_json::json;

use memdb::mvcc::{Store, TxnError};
use memdb::schema::{load_schema, SchemaDefinition, SchemaErrorCode, Severity};

fn definition(indexes: serde_json::Value) -> SchemaDefinition {
    serde_json::from_value(json!({ "tables": [{ "name": "nodes", "indexes": indexes }] })).unwrap()
}

// =============================================================================
// Validation Tests
// =============================================================================

/// Schema errors are fatal and carry a stable code.
#[test]
fn test_schema_errors_are_fatal() {
    let err = SchemaDefinition::default().build().unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::MemdbSchemaNoTables);
    assert_eq!(err.severity(), Severity::Fatal);
    assert!(err.to_string().starts_with("[FATAL] MEMDB_SCHEMA_NO_TABLES"));
}

/// The id index must be unique and required.
#[test]
fn test_id_index_rules() {
    let missing = definition(json!([{ "name": "name", "field": "name" }]));
    assert_eq!(missing.build().unwrap_err().code(), SchemaErrorCode::MemdbSchemaMissingId);

    let not_unique = definition(json!([{ "name": "id", "field": "id" }]));
    assert_eq!(not_unique.build().unwrap_err().code(), SchemaErrorCode::MemdbSchemaInvalidId);

    let sparse = definition(json!([{ "name": "id", "field": "id", "unique": true, "allow_missing": true }]));
    assert_eq!(sparse.build().unwrap_err().code(), SchemaErrorCode::MemdbSchemaInvalidId);

    let multi = definition(json!([{ "name": "id", "kind": "multi", "field": "id", "unique": true }]));
    assert_eq!(multi.build().unwrap_err().code(), SchemaErrorCode::MemdbSchemaInvalidId);
}

/// Index names may not collide with prefix lookups.
#[test]
fn test_prefix_suffix_reserved() {
    let def = definition(json!([
        { "name": "id", "field": "id", "unique": true },
        { "name": "dc_prefix", "field": "dc" }
    ]));
    let err = def.build().unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::MemdbSchemaInvalidIndex);
    assert_eq!(err.table(), Some("nodes"));
}

/// Loading a malformed file fails before any store exists.
#[test]
fn test_load_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = load_schema(&path).unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::MemdbSchemaMalformed);
}

// =============================================================================
// Lookup Tests
// =============================================================================

/// Unknown tables and indexes are named in the error.
#[test]
fn test_unknown_names() {
    let schema = definition(json!([
        { "name": "id", "field": "id", "unique": true },
        { "name": "dc", "field": "dc" }
    ]))
    .build()
    .unwrap();
    let store = Store::open(schema).unwrap();
    let txn = store.read_txn();

    match txn.get("edges", "id", &[]) {
        Err(TxnError::TableNotFound(table)) => assert_eq!(table, "edges"),
        other => panic!("expected TableNotFound, got {:?}", other.err()),
    }
    match txn.get("nodes", "rack", &[]) {
        Err(TxnError::IndexNotFound { table, index }) => {
            assert_eq!((table.as_str(), index.as_str()), ("nodes", "rack"))
        }
        other => panic!("expected IndexNotFound, got {:?}", other.err()),
    }
    assert!(txn.get("nodes", "rack_prefix", &["x".into()]).unwrap_err().is_not_found());
    assert!(txn.get("nodes", "dc_prefix", &["e".into()]).is_ok());
}

/// Resolved index references address the same tree as names.
#[test]
fn test_resolve_index() {
    let schema = definition(json!([
        { "name": "id", "field": "id", "unique": true },
        { "name": "dc", "field": "dc" }
    ]))
    .build()
    .unwrap();
    let dc = schema.resolve_index("nodes", "dc").unwrap();
    assert_eq!((dc.table(), dc.index()), (0, 1));
    assert!(schema.resolve_index("nodes", "rack").is_err());

    let store = Store::open(schema).unwrap();
    let mut txn = store.write_txn().unwrap();
    txn.insert("nodes", json!({"id": "n1", "dc": "east"})).unwrap();
    txn.commit().unwrap();

    let txn = store.read_txn();
    let by_ref: Vec<_> = txn.get_ref(dc, &["east".into()]).unwrap().collect();
    let by_name: Vec<_> = txn.get("nodes", "dc", &["east".into()]).unwrap().collect();
    assert_eq!(by_ref, by_name);
    assert_eq!(by_ref.len(), 1);
}

/// A reference resolved against a larger schema is reported, not followed.
#[test]
fn test_foreign_index_ref_rejected() {
    let wide: SchemaDefinition = serde_json::from_value(json!({ "tables": [
        { "name": "a", "indexes": [{ "name": "id", "field": "id", "unique": true }] },
        { "name": "b", "indexes": [
            { "name": "id", "field": "id", "unique": true },
            { "name": "dc", "field": "dc" }
        ]}
    ]}))
    .unwrap();
    let b_dc = wide.build().unwrap().resolve_index("b", "dc").unwrap();
    assert_eq!((b_dc.table(), b_dc.index()), (1, 1));

    let narrow = definition(json!([{ "name": "id", "field": "id", "unique": true }]));
    let store = Store::open(narrow.build().unwrap()).unwrap();
    let txn = store.read_txn();

    let err = txn.get_ref(b_dc, &["east".into()]).unwrap_err();
    assert!(matches!(err, TxnError::IndexNotFound { .. }));
    assert!(txn.get_ref(b_dc, &[]).unwrap_err().is_not_found());
}
