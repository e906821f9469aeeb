//! Txn - read or write handle over one snapshot
//!
//! # Invariants
//!
//! - A read transaction sees exactly the snapshot it captured
//! - A write transaction holds the writer lock until it finishes
//! - Pending writes live in a private working copy of the trees; nothing
//!   is visible to other transactions before commit
//! - A failed write call leaves the working copy unchanged

use std::sync::Arc;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::RawMutex;

use crate::index::{IndexArg, IndexError};
use crate::observability::{log_event_with_fields, Event};
use crate::radix::{Tree, WatchTracker};
use crate::schema::{IndexRef, IndexSchema, TableSchema, PREFIX_SUFFIX};
use crate::watch::WatchCh;

use super::changes::{Change, ChangeSet};
use super::commit_id::CommitId;
use super::errors::{TxnError, TxnResult};
use super::iter::ResultIterator;
use super::snapshot::{Snapshot, Trees};
use super::store::StoreInner;

type Deferred = Box<dyn FnOnce() + Send>;

struct WriteState<R> {
    _guard: ArcMutexGuard<RawMutex, ()>,
    trees: Trees<R>,
    tracker: WatchTracker,
    deferred: Vec<Deferred>,
    inserted: u64,
    deleted: u64,
}

/// A transaction. See the module docs for its guarantees.
///
/// Dropping an unfinished write transaction aborts it.
pub struct Txn<R> {
    store: Arc<StoreInner<R>>,
    base: Arc<Snapshot<R>>,
    write: Option<WriteState<R>>,
    writable: bool,
    finished: bool,
    changes: Option<ChangeSet<R>>,
}

/// Splits a trailing `_prefix` off an index name.
fn split_prefix(index: &str) -> (&str, bool) {
    match index.strip_suffix(PREFIX_SUFFIX) {
        Some(base) if !base.is_empty() => (base, true),
        _ => (index, false),
    }
}

/// Key under which a record is stored in an index tree.
///
/// Non-unique indexes append the id key so every tree key is distinct.
fn tree_key<R>(index: &IndexSchema<R>, key: &[u8], id_key: &[u8]) -> Vec<u8> {
    if index.is_unique() {
        key.to_vec()
    } else {
        let mut out = Vec::with_capacity(key.len() + id_key.len());
        out.extend_from_slice(key);
        out.extend_from_slice(id_key);
        out
    }
}

/// Keys of `record` for every index of `table`, in index order.
fn record_keys<R>(table: &TableSchema<R>, record: &R) -> TxnResult<Vec<Vec<Vec<u8>>>> {
    let mut all = Vec::with_capacity(table.indexes().len());
    for index in table.indexes() {
        let keys = index
            .indexer()
            .from_object(record)
            .map_err(|e| TxnError::encoding(table.name(), index.name(), e))?;
        if keys.is_empty() && !index.allows_missing() {
            return Err(TxnError::encoding(
                table.name(),
                index.name(),
                IndexError::missing_value(format!("index '{}'", index.name())),
            ));
        }
        if keys.len() > 1 && !index.indexer().is_multi() {
            return Err(TxnError::encoding(
                table.name(),
                index.name(),
                IndexError::unsupported_value(format!(
                    "single-valued index produced {} keys",
                    keys.len()
                )),
            ));
        }
        all.push(keys);
    }
    Ok(all)
}

/// Id key of `record`.
fn record_id_key<R>(table: &TableSchema<R>, id_pos: usize, record: &R) -> TxnResult<Vec<u8>> {
    let id_index = &table.indexes()[id_pos];
    id_index
        .indexer()
        .from_object(record)
        .map_err(|e| TxnError::encoding(table.name(), id_index.name(), e))?
        .into_iter()
        .next()
        .ok_or_else(|| TxnError::encoding(table.name(), "id", IndexError::missing_value("id")))
}

impl<R: Send + Sync + 'static> Txn<R> {
    pub(crate) fn read(store: Arc<StoreInner<R>>, base: Arc<Snapshot<R>>) -> Self {
        Self {
            store,
            base,
            write: None,
            writable: false,
            finished: false,
            changes: None,
        }
    }

    pub(crate) fn write(
        store: Arc<StoreInner<R>>,
        base: Arc<Snapshot<R>>,
        guard: ArcMutexGuard<RawMutex, ()>,
    ) -> Self {
        let trees = base.trees().clone();
        Self {
            store,
            base,
            write: Some(WriteState {
                _guard: guard,
                trees,
                tracker: WatchTracker::new(),
                deferred: Vec::new(),
                inserted: 0,
                deleted: 0,
            }),
            writable: true,
            finished: false,
            changes: None,
        }
    }

    pub fn is_write(&self) -> bool {
        self.writable
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Version of the snapshot this transaction started from.
    pub fn commit_id(&self) -> CommitId {
        self.base.commit_id()
    }

    fn trees(&self) -> TxnResult<&Trees<R>> {
        if self.finished {
            return Err(TxnError::Finished);
        }
        Ok(match &self.write {
            Some(state) => &state.trees,
            None => self.base.trees(),
        })
    }

    fn write_state(&mut self) -> TxnResult<&mut WriteState<R>> {
        if self.finished {
            return Err(TxnError::Finished);
        }
        self.write.as_mut().ok_or(TxnError::ReadOnly)
    }

    // ==================
    // Lifecycle
    // ==================

    /// Publishes pending writes as a new snapshot.
    ///
    /// On a read transaction this only marks it finished. After the swap the
    /// writer lock is released, replaced watch channels are closed, then
    /// deferred functions run in reverse registration order.
    pub fn commit(&mut self) -> TxnResult<()> {
        if self.finished {
            return Err(TxnError::Finished);
        }
        self.finished = true;

        let state = match self.write.take() {
            Some(state) => state,
            None => return Ok(()),
        };

        if self.store.is_closed() {
            self.changes = None;
            self.store.metrics.increment_aborts();
            return Err(TxnError::Closed);
        }

        let WriteState {
            _guard: guard,
            trees,
            tracker,
            deferred,
            inserted,
            deleted,
        } = state;

        let commit_id = self.base.commit_id().next();
        self.store.publish(Snapshot::new(commit_id, trees));
        drop(guard);

        let closed = tracker.close_all();

        let metrics = &self.store.metrics;
        metrics.increment_commits();
        metrics.add_inserts(inserted);
        metrics.add_deletes(deleted);
        metrics.add_watches_closed(closed as u64);

        if self.store.config.log_transactions {
            let commit = commit_id.to_string();
            let inserted = inserted.to_string();
            let deleted = deleted.to_string();
            let closed = closed.to_string();
            log_event_with_fields(
                Event::TxnCommitted,
                &[
                    ("commit_id", commit.as_str()),
                    ("deleted", deleted.as_str()),
                    ("inserted", inserted.as_str()),
                    ("store", self.store.config.name.as_str()),
                    ("watches_closed", closed.as_str()),
                ],
            );
        }

        for f in deferred.into_iter().rev() {
            f();
        }
        Ok(())
    }

    /// Discards pending writes. Aborting a finished transaction is a no-op.
    pub fn abort(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.changes = None;
        if self.write.take().is_some() {
            self.store.metrics.increment_aborts();
            if self.store.config.log_transactions {
                log_event_with_fields(
                    Event::TxnAborted,
                    &[("store", self.store.config.name.as_str())],
                );
            }
        }
    }

    /// Runs `f` after a successful commit; dropped on abort.
    pub fn defer<F>(&mut self, f: F) -> TxnResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.write_state()?.deferred.push(Box::new(f));
        Ok(())
    }

    /// Starts recording per-record changes.
    pub fn track_changes(&mut self) -> TxnResult<()> {
        self.write_state()?;
        if self.changes.is_none() {
            self.changes = Some(ChangeSet::new());
        }
        Ok(())
    }

    /// Changes recorded so far (also after commit). Empty unless
    /// `track_changes` was called.
    pub fn changes(&self) -> Vec<Change<R>> {
        self.changes.as_ref().map(ChangeSet::to_vec).unwrap_or_default()
    }

    // ==================
    // Writes
    // ==================

    /// Inserts `record`, replacing any record with the same id.
    pub fn insert(&mut self, table: &str, record: R) -> TxnResult<()> {
        let schema = Arc::clone(&self.store.schema);
        self.write_state()?;

        let table_pos = schema
            .table_position(table)
            .ok_or_else(|| TxnError::TableNotFound(table.to_string()))?;
        let table_schema = &schema.tables()[table_pos];
        let id_pos = table_schema.id_position().ok_or_else(|| TxnError::IndexNotFound {
            table: table.to_string(),
            index: "id".to_string(),
        })?;

        let record = Arc::new(record);
        let new_keys = record_keys(table_schema, record.as_ref())?;
        let id_key = new_keys[id_pos]
            .first()
            .cloned()
            .ok_or_else(|| TxnError::encoding(table, "id", IndexError::missing_value("id")))?;

        let state = self.write_state()?;
        let existing = state.trees[table_pos][id_pos].get(&id_key).cloned();
        let old_keys = match &existing {
            Some(old) => Some(record_keys(table_schema, old.as_ref())?),
            None => None,
        };

        // A unique key may only be held by the record being replaced
        for (i, index) in table_schema.indexes().iter().enumerate() {
            if i == id_pos || !index.is_unique() {
                continue;
            }
            for key in &new_keys[i] {
                if let Some(holder) = state.trees[table_pos][i].get(key) {
                    if record_id_key(table_schema, id_pos, holder.as_ref())? != id_key {
                        return Err(TxnError::UniqueViolation {
                            table: table.to_string(),
                            index: index.name().to_string(),
                        });
                    }
                }
            }
        }

        let tables = &mut state.trees[table_pos];
        for (i, index) in table_schema.indexes().iter().enumerate() {
            let mut tree = tables[i].clone();
            if let Some(old_keys) = &old_keys {
                for key in &old_keys[i] {
                    tree = tree
                        .delete_tracked(&tree_key(index, key, &id_key), &mut state.tracker)
                        .0;
                }
            }
            for key in &new_keys[i] {
                tree = tree
                    .insert_tracked(&tree_key(index, key, &id_key), Arc::clone(&record), &mut state.tracker)
                    .0;
            }
            tables[i] = tree;
        }
        state.inserted += 1;

        if let Some(changes) = self.changes.as_mut() {
            changes.record(table, &id_key, existing, Some(record));
        }
        Ok(())
    }

    /// Deletes the record whose id matches `record`'s.
    pub fn delete(&mut self, table: &str, record: &R) -> TxnResult<()> {
        let schema = Arc::clone(&self.store.schema);
        self.write_state()?;

        let table_pos = schema
            .table_position(table)
            .ok_or_else(|| TxnError::TableNotFound(table.to_string()))?;
        let table_schema = &schema.tables()[table_pos];
        let id_pos = table_schema.id_position().ok_or_else(|| TxnError::IndexNotFound {
            table: table.to_string(),
            index: "id".to_string(),
        })?;
        let id_key = record_id_key(table_schema, id_pos, record)?;
        self.delete_by_id(table_pos, &id_key)
    }

    /// Deletes every record matched by a `get` with the same arguments.
    /// Returns the number deleted.
    pub fn delete_all(&mut self, table: &str, index: &str, args: &[IndexArg]) -> TxnResult<usize> {
        self.write_state()?;
        let index_ref = self.resolve(table, split_prefix(index).0)?;
        let targets: Vec<Arc<R>> = self.get(table, index, args)?.collect();
        self.delete_records(index_ref.table(), &targets)
    }

    /// Deletes every record whose `<index>` key starts with the prefix built
    /// from `args`. `index` must carry the `_prefix` suffix.
    pub fn delete_prefix(&mut self, table: &str, index: &str, args: &[IndexArg]) -> TxnResult<usize> {
        self.write_state()?;
        let (base, prefix) = split_prefix(index);
        if !prefix {
            return Err(TxnError::IndexNotFound {
                table: table.to_string(),
                index: index.to_string(),
            });
        }
        let index_ref = self.resolve(table, base)?;
        let targets: Vec<Arc<R>> = self.get(table, index, args)?.collect();
        self.delete_records(index_ref.table(), &targets)
    }

    fn delete_records(&mut self, table_pos: usize, targets: &[Arc<R>]) -> TxnResult<usize> {
        let schema = Arc::clone(&self.store.schema);
        let table_schema = &schema.tables()[table_pos];
        let id_pos = table_schema.id_position().ok_or_else(|| TxnError::IndexNotFound {
            table: table_schema.name().to_string(),
            index: "id".to_string(),
        })?;
        // Resolve every id first so a failure deletes nothing
        let ids = targets
            .iter()
            .map(|record| record_id_key(table_schema, id_pos, record.as_ref()))
            .collect::<TxnResult<Vec<_>>>()?;

        let mut deleted = 0;
        for id_key in ids {
            match self.delete_by_id(table_pos, &id_key) {
                Ok(()) => deleted += 1,
                // Multi-valued matches may list a record more than once
                Err(TxnError::RecordNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(deleted)
    }

    fn delete_by_id(&mut self, table_pos: usize, id_key: &[u8]) -> TxnResult<()> {
        let schema = Arc::clone(&self.store.schema);
        let table_schema = &schema.tables()[table_pos];
        let id_pos = table_schema.id_position().ok_or_else(|| TxnError::IndexNotFound {
            table: table_schema.name().to_string(),
            index: "id".to_string(),
        })?;

        let state = self.write_state()?;
        let existing = state.trees[table_pos][id_pos]
            .get(id_key)
            .cloned()
            .ok_or_else(|| TxnError::RecordNotFound(table_schema.name().to_string()))?;
        let old_keys = record_keys(table_schema, existing.as_ref())?;

        let tables = &mut state.trees[table_pos];
        for (i, index) in table_schema.indexes().iter().enumerate() {
            let mut tree = tables[i].clone();
            for key in &old_keys[i] {
                tree = tree
                    .delete_tracked(&tree_key(index, key, id_key), &mut state.tracker)
                    .0;
            }
            tables[i] = tree;
        }
        state.deleted += 1;

        if let Some(changes) = self.changes.as_mut() {
            changes.record(table_schema.name(), id_key, Some(existing), None);
        }
        Ok(())
    }

    // ==================
    // Reads
    // ==================

    fn resolve(&self, table: &str, index: &str) -> TxnResult<IndexRef> {
        self.store.schema.resolve_index(table, index)
    }

    /// Schema entries behind `index_ref`. A ref resolved against another
    /// schema may point past this store's tables.
    fn index_schema(&self, index_ref: IndexRef) -> TxnResult<(&TableSchema<R>, &IndexSchema<R>)> {
        let schema = &self.store.schema;
        match (schema.table_at(index_ref), schema.index_at(index_ref)) {
            (Some(table), Some(index)) => Ok((table, index)),
            _ => Err(TxnError::IndexNotFound {
                table: format!("#{}", index_ref.table()),
                index: format!("#{}", index_ref.index()),
            }),
        }
    }

    fn lookup_key(&self, index_ref: IndexRef, prefix: bool, args: &[IndexArg]) -> TxnResult<Vec<u8>> {
        let (table, index) = self.index_schema(index_ref)?;
        let result = if prefix {
            index.indexer().prefix_from_args(args)
        } else {
            index.indexer().from_args(args)
        };
        result.map_err(|e| TxnError::encoding(table.name(), index.name(), e))
    }

    fn tree(&self, index_ref: IndexRef) -> TxnResult<&Tree<Arc<R>>> {
        let (table, index) = self.index_schema(index_ref)?;
        self.trees()?
            .get(index_ref.table())
            .and_then(|tables| tables.get(index_ref.index()))
            .ok_or_else(|| TxnError::IndexNotFound {
                table: table.name().to_string(),
                index: index.name().to_string(),
            })
    }

    fn query(&self, index_ref: IndexRef, prefix: bool, args: &[IndexArg], reverse: bool) -> TxnResult<ResultIterator<R>> {
        let tree = self.tree(index_ref)?;
        let values = |leaf: Arc<crate::radix::Leaf<Arc<R>>>| Arc::clone(leaf.value());

        if args.is_empty() {
            let watch = tree.root_watch().clone();
            let inner: Box<dyn Iterator<Item = Arc<R>> + Send> = if reverse {
                Box::new(tree.iter_rev().map(values))
            } else {
                Box::new(tree.iter().map(values))
            };
            return Ok(ResultIterator::new(inner, watch));
        }

        let key = self.lookup_key(index_ref, prefix, args)?;
        let unique = self.index_schema(index_ref)?.1.is_unique();

        if unique && !prefix {
            let (watch, value) = tree.get_watch(&key);
            let inner = Box::new(value.cloned().into_iter());
            return Ok(ResultIterator::new(inner, watch));
        }

        let (watch, forward) = tree.iter_prefix_watch(&key);
        let inner: Box<dyn Iterator<Item = Arc<R>> + Send> = if reverse {
            Box::new(tree.iter_rev_prefix(&key).map(values))
        } else {
            Box::new(forward.map(values))
        };
        Ok(ResultIterator::new(inner, watch))
    }

    /// Records matched by `args` on `index`, in index order.
    ///
    /// An index name ending in `_prefix` does a prefix match; no arguments
    /// iterate the whole index.
    pub fn get(&self, table: &str, index: &str, args: &[IndexArg]) -> TxnResult<ResultIterator<R>> {
        let (base, prefix) = split_prefix(index);
        let index_ref = self.resolve(table, base)?;
        self.query(index_ref, prefix, args, false)
    }

    /// Like `get`, for an already resolved index. A reference that does not
    /// fit this store's schema is `IndexNotFound`.
    pub fn get_ref(&self, index_ref: IndexRef, args: &[IndexArg]) -> TxnResult<ResultIterator<R>> {
        self.query(index_ref, false, args, false)
    }

    /// Like `get`, in descending index order.
    pub fn get_reverse(&self, table: &str, index: &str, args: &[IndexArg]) -> TxnResult<ResultIterator<R>> {
        let (base, prefix) = split_prefix(index);
        let index_ref = self.resolve(table, base)?;
        self.query(index_ref, prefix, args, true)
    }

    /// Records whose index key is `>=` the key built from `args`, ascending.
    pub fn lower_bound(&self, table: &str, index: &str, args: &[IndexArg]) -> TxnResult<ResultIterator<R>> {
        let (base, prefix) = split_prefix(index);
        let index_ref = self.resolve(table, base)?;
        let key = self.lookup_key(index_ref, prefix, args)?;
        let tree = self.tree(index_ref)?;
        let inner = Box::new(tree.iter_from(&key).map(|leaf| Arc::clone(leaf.value())));
        Ok(ResultIterator::new(inner, tree.root_watch().clone()))
    }

    /// Records whose index key is `<=` the key built from `args`, descending.
    ///
    /// On non-unique indexes every record whose index value equals the key
    /// is included.
    pub fn reverse_lower_bound(
        &self,
        table: &str,
        index: &str,
        args: &[IndexArg],
    ) -> TxnResult<ResultIterator<R>> {
        let (base, prefix) = split_prefix(index);
        let index_ref = self.resolve(table, base)?;
        let key = self.lookup_key(index_ref, prefix, args)?;
        let tree = self.tree(index_ref)?;
        let watch = tree.root_watch().clone();

        let inner: Box<dyn Iterator<Item = Arc<R>> + Send> =
            if self.index_schema(index_ref)?.1.is_unique() {
                Box::new(tree.iter_rev_to(&key).map(|leaf| Arc::clone(leaf.value())))
            } else {
                // Keys extending `key` sort directly above it
                let skip = key.clone();
                let below = tree
                    .iter_rev_to(&key)
                    .filter(move |leaf| leaf.key() != skip.as_slice());
                Box::new(
                    tree.iter_rev_prefix(&key)
                        .chain(below)
                        .map(|leaf| Arc::clone(leaf.value())),
                )
            };
        Ok(ResultIterator::new(inner, watch))
    }

    /// First record matched by `get`.
    pub fn first(&self, table: &str, index: &str, args: &[IndexArg]) -> TxnResult<Option<Arc<R>>> {
        Ok(self.get(table, index, args)?.next())
    }

    /// First record matched by `get_reverse`.
    pub fn last(&self, table: &str, index: &str, args: &[IndexArg]) -> TxnResult<Option<Arc<R>>> {
        Ok(self.get_reverse(table, index, args)?.next())
    }

    /// Like `first`, plus the channel covering the query.
    pub fn first_watch(
        &self,
        table: &str,
        index: &str,
        args: &[IndexArg],
    ) -> TxnResult<(WatchCh, Option<Arc<R>>)> {
        let mut iter = self.get(table, index, args)?;
        let first = iter.next();
        Ok((iter.watch_ch(), first))
    }

    /// Graphviz export of one index tree.
    pub fn export(&self, table: &str, index: &str) -> TxnResult<String> {
        let index_ref = self.resolve(table, index)?;
        Ok(self.tree(index_ref)?.to_dot())
    }
}

impl<R> Drop for Txn<R> {
    fn drop(&mut self) {
        if !self.finished && self.write.take().is_some() {
            self.store.metrics.increment_aborts();
            if self.store.config.log_transactions {
                log_event_with_fields(
                    Event::TxnAborted,
                    &[("store", self.store.config.name.as_str())],
                );
            }
        }
    }
}
