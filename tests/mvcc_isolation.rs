//! MVCC Isolation Tests
//!
//! Tests for transaction isolation:
//! - Readers see the snapshot they started on
//! - Aborted writes leave no trace
//! - A single writer at a time
//! - Change tracking across a transaction

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use memdb::index::{IntFieldIndex, StringFieldIndex, StringSliceFieldIndex};
use memdb::mvcc::{CommitId, ResultIterator, Store, TxnError};
use memdb::schema::{DbSchema, IndexSchema, TableSchema};

#[derive(Debug, Clone, PartialEq)]
struct Node {
    id: String,
    datacenter: String,
    weight: i64,
    tags: Vec<String>,
}

fn node(id: &str, datacenter: &str, weight: i64) -> Node {
    Node {
        id: id.to_string(),
        datacenter: datacenter.to_string(),
        weight,
        tags: Vec::new(),
    }
}

fn nodes_store() -> Store<Node> {
    let schema = DbSchema::builder()
        .table(
            TableSchema::new("nodes")
                .index(IndexSchema::new("id", StringFieldIndex::new(|n: &Node| Some(n.id.clone()))).unique())
                .index(IndexSchema::new(
                    "datacenter",
                    StringFieldIndex::new(|n: &Node| Some(n.datacenter.clone())),
                ))
                .index(IndexSchema::new("weight", IntFieldIndex::new(|n: &Node| Some(n.weight))))
                .index(
                    IndexSchema::new("tags", StringSliceFieldIndex::new(|n: &Node| n.tags.clone()))
                        .allow_missing(),
                ),
        )
        .build()
        .unwrap();
    Store::open(schema).unwrap()
}

fn ids(iter: ResultIterator<Node>) -> Vec<String> {
    iter.map(|n| n.id.clone()).collect()
}

// =============================================================================
// Snapshot Isolation Tests
// =============================================================================

/// A reader keeps its snapshot while a writer commits around it.
#[test]
fn test_reader_sees_its_snapshot() {
    let store = nodes_store();

    let mut txn = store.write_txn().unwrap();
    txn.insert("nodes", node("a", "east", 1)).unwrap();
    txn.insert("nodes", node("b", "east", 2)).unwrap();
    txn.commit().unwrap();

    let before = store.read_txn();

    let mut txn = store.write_txn().unwrap();
    txn.insert("nodes", node("c", "west", 3)).unwrap();
    txn.delete("nodes", &node("a", "east", 1)).unwrap();
    txn.commit().unwrap();

    assert_eq!(ids(before.get("nodes", "id", &[]).unwrap()), vec!["a", "b"]);
    assert_eq!(before.commit_id(), CommitId::new(1));

    let after = store.read_txn();
    assert_eq!(ids(after.get("nodes", "id", &[]).unwrap()), vec!["b", "c"]);
    assert_eq!(after.commit_id(), CommitId::new(2));
}

/// Insert a, b, c then delete b: readers see the id order before and after.
#[test]
fn test_nodes_scenario() {
    let store = nodes_store();
    let mut txn = store.write_txn().unwrap();
    for id in ["c", "a", "b"] {
        txn.insert("nodes", node(id, "east", 0)).unwrap();
    }
    txn.commit().unwrap();

    let read = store.read_txn();
    assert_eq!(ids(read.get("nodes", "id", &[]).unwrap()), vec!["a", "b", "c"]);
    assert_eq!(read.first("nodes", "id", &["b".into()]).unwrap().unwrap().id, "b");

    let mut txn = store.write_txn().unwrap();
    txn.delete("nodes", &node("b", "east", 0)).unwrap();
    txn.commit().unwrap();

    assert_eq!(ids(store.read_txn().get("nodes", "id", &[]).unwrap()), vec!["a", "c"]);
    assert_eq!(ids(read.get("nodes", "id", &[]).unwrap()), vec!["a", "b", "c"]);
}

/// Delete then re-insert in one transaction nets out to the final record.
#[test]
fn test_delete_then_reinsert() {
    let store = nodes_store();
    let mut txn = store.write_txn().unwrap();
    txn.insert("nodes", node("a", "east", 1)).unwrap();
    txn.delete("nodes", &node("a", "east", 1)).unwrap();
    txn.insert("nodes", node("a", "west", 2)).unwrap();
    txn.commit().unwrap();

    let read = store.read_txn();
    assert_eq!(ids(read.get("nodes", "id", &[]).unwrap()), vec!["a"]);
    assert_eq!(ids(read.get("nodes", "datacenter", &["west".into()]).unwrap()), vec!["a"]);
    assert!(ids(read.get("nodes", "datacenter", &["east".into()]).unwrap()).is_empty());
    assert_eq!(ids(read.get("nodes", "weight", &[2i64.into()]).unwrap()), vec!["a"]);
}

/// Uncommitted writes are visible inside the writing transaction only.
#[test]
fn test_uncommitted_writes_are_private() {
    let store = nodes_store();
    let mut txn = store.write_txn().unwrap();
    txn.insert("nodes", node("a", "east", 1)).unwrap();

    assert!(txn.first("nodes", "id", &["a".into()]).unwrap().is_some());
    assert!(store.read_txn().first("nodes", "id", &["a".into()]).unwrap().is_none());

    txn.commit().unwrap();
    assert!(store.read_txn().first("nodes", "id", &["a".into()]).unwrap().is_some());
}

/// Records returned by a query stay valid after later commits.
#[test]
fn test_returned_records_outlive_updates() {
    let store = nodes_store();
    let mut txn = store.write_txn().unwrap();
    txn.insert("nodes", node("a", "east", 1)).unwrap();
    txn.commit().unwrap();

    let old = store.read_txn().first("nodes", "id", &["a".into()]).unwrap().unwrap();

    let mut txn = store.write_txn().unwrap();
    txn.insert("nodes", node("a", "west", 9)).unwrap();
    txn.commit().unwrap();

    assert_eq!(old.datacenter, "east");
    let new = store.read_txn().first("nodes", "id", &["a".into()]).unwrap().unwrap();
    assert_eq!(new.datacenter, "west");
}

/// A snapshot store is frozen at the point it was taken.
#[test]
fn test_snapshot_store_is_independent() {
    let store = nodes_store();
    let mut txn = store.write_txn().unwrap();
    txn.insert("nodes", node("a", "east", 1)).unwrap();
    txn.commit().unwrap();

    let snap = store.snapshot();

    let mut txn = store.write_txn().unwrap();
    txn.insert("nodes", node("b", "east", 2)).unwrap();
    txn.commit().unwrap();

    let mut txn = snap.write_txn().unwrap();
    txn.insert("nodes", node("z", "north", 5)).unwrap();
    txn.commit().unwrap();

    assert_eq!(ids(store.read_txn().get("nodes", "id", &[]).unwrap()), vec!["a", "b"]);
    assert_eq!(ids(snap.read_txn().get("nodes", "id", &[]).unwrap()), vec!["a", "z"]);
}

// =============================================================================
// Abort Tests
// =============================================================================

/// Abort discards every pending write and leaves the commit id alone.
#[test]
fn test_abort_discards_writes() {
    let store = nodes_store();
    let mut txn = store.write_txn().unwrap();
    txn.insert("nodes", node("a", "east", 1)).unwrap();
    txn.commit().unwrap();

    let mut txn = store.write_txn().unwrap();
    txn.insert("nodes", node("b", "east", 2)).unwrap();
    txn.delete("nodes", &node("a", "east", 1)).unwrap();
    txn.abort();
    txn.abort();

    assert_eq!(store.commit_id(), CommitId::new(1));
    assert_eq!(ids(store.read_txn().get("nodes", "id", &[]).unwrap()), vec!["a"]);
    assert!(matches!(txn.commit(), Err(TxnError::Finished)));
}

/// Deferred functions only run for committed transactions, last first.
#[test]
fn test_deferred_run_after_commit_only() {
    let store = nodes_store();
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let mut txn = store.write_txn().unwrap();
    let o = Arc::clone(&order);
    txn.defer(move || o.lock().push("aborted")).unwrap();
    txn.abort();

    let mut txn = store.write_txn().unwrap();
    for name in ["first", "second"] {
        let o = Arc::clone(&order);
        txn.defer(move || o.lock().push(name)).unwrap();
    }
    txn.commit().unwrap();

    assert_eq!(*order.lock(), vec!["second", "first"]);
}

/// Dropping an unfinished write transaction counts as an abort.
#[test]
fn test_drop_aborts_write_txn() {
    let store = nodes_store();
    {
        let mut txn = store.write_txn().unwrap();
        txn.insert("nodes", node("a", "east", 1)).unwrap();
    }
    assert_eq!(store.metrics().aborts, 1);
    assert!(store.read_txn().first("nodes", "id", &["a".into()]).unwrap().is_none());

    // Writer lock was released by the drop.
    let mut txn = store.write_txn().unwrap();
    txn.insert("nodes", node("a", "east", 1)).unwrap();
    txn.commit().unwrap();
}

/// Read transactions reject writes.
#[test]
fn test_read_txn_is_read_only() {
    let store = nodes_store();
    let mut txn = store.read_txn();
    assert!(matches!(txn.insert("nodes", node("a", "east", 1)), Err(TxnError::ReadOnly)));
    assert!(matches!(txn.defer(|| {}), Err(TxnError::ReadOnly)));
    assert!(txn.commit().is_ok());
}

// =============================================================================
// Writer Serialization Tests
// =============================================================================

/// A second writer blocks until the first one finishes.
#[test]
fn test_single_writer() {
    let store = nodes_store();
    let mut first = store.write_txn().unwrap();
    first.insert("nodes", node("a", "east", 1)).unwrap();

    let (tx, rx) = mpsc::channel();
    let other = store.clone();
    let handle = thread::spawn(move || {
        let mut txn = other.write_txn().unwrap();
        let seen = txn.first("nodes", "id", &["a".into()]).unwrap().is_some();
        txn.insert("nodes", node("b", "east", 2)).unwrap();
        txn.commit().unwrap();
        tx.send(seen).unwrap();
    });

    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    first.commit().unwrap();

    assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
    handle.join().unwrap();
    assert_eq!(store.commit_id(), CommitId::new(2));
}

/// Concurrent writers each commit exactly once.
#[test]
fn test_concurrent_writers_all_commit() {
    let store = nodes_store();
    let done = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut txn = store.write_txn().unwrap();
                txn.insert("nodes", node(&format!("n{}", i), "east", i)).unwrap();
                txn.commit().unwrap();
                done.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(done.load(Ordering::SeqCst), 8);
    assert_eq!(store.commit_id(), CommitId::new(8));
    assert_eq!(store.read_txn().get("nodes", "id", &[]).unwrap().count(), 8);
}

// =============================================================================
// Change Tracking Tests
// =============================================================================

/// Changes coalesce per record across one transaction.
#[test]
fn test_changes_coalesce() {
    let store = nodes_store();
    let mut txn = store.write_txn().unwrap();
    txn.insert("nodes", node("a", "east", 1)).unwrap();
    txn.insert("nodes", node("b", "east", 2)).unwrap();
    txn.commit().unwrap();

    let mut txn = store.write_txn().unwrap();
    txn.track_changes().unwrap();
    txn.insert("nodes", node("a", "west", 1)).unwrap();
    txn.insert("nodes", node("a", "north", 1)).unwrap();
    txn.delete("nodes", &node("b", "east", 2)).unwrap();
    txn.insert("nodes", node("c", "east", 3)).unwrap();
    txn.insert("nodes", node("d", "east", 4)).unwrap();
    txn.delete("nodes", &node("d", "east", 4)).unwrap();
    txn.commit().unwrap();

    let changes = txn.changes();
    assert_eq!(changes.len(), 3);

    assert!(changes[0].updated());
    assert_eq!(changes[0].before.as_ref().unwrap().datacenter, "east");
    assert_eq!(changes[0].after.as_ref().unwrap().datacenter, "north");
    assert!(changes[1].deleted());
    assert!(changes[2].created());
    assert!(changes.iter().all(|c| c.table == "nodes"));
}

/// Closing the store fails pending commits and new writers.
#[test]
fn test_closed_store() {
    let store = nodes_store();
    let mut txn = store.write_txn().unwrap();
    txn.insert("nodes", node("a", "east", 1)).unwrap();

    store.close();
    assert!(matches!(txn.commit(), Err(TxnError::Closed)));
    assert!(matches!(store.write_txn(), Err(TxnError::Closed)));
    assert_eq!(store.commit_id(), CommitId::ZERO);
}
