//! Store - the root of all index trees
//!
//! The store holds a single pointer to the current snapshot. Readers clone
//! it under a read lock held only for the clone, so they never wait on a
//! write transaction; writers are serialized by one lock and publish a new
//! snapshot on commit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::StoreConfig;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry, MetricsSnapshot};
use crate::schema::{DbSchema, SchemaResult};

use super::commit_id::CommitId;
use super::errors::{TxnError, TxnResult};
use super::snapshot::Snapshot;
use super::txn::Txn;

pub(crate) struct StoreInner<R> {
    pub(crate) schema: Arc<DbSchema<R>>,
    pub(crate) config: StoreConfig,
    root: RwLock<Arc<Snapshot<R>>>,
    pub(crate) writer: Arc<Mutex<()>>,
    closed: AtomicBool,
    pub(crate) metrics: MetricsRegistry,
}

impl<R> StoreInner<R> {
    pub(crate) fn current(&self) -> Arc<Snapshot<R>> {
        Arc::clone(&self.root.read())
    }

    /// Replaces the current snapshot. Callers hold the writer lock.
    ///
    /// Only the pointer store happens under the lock; the previous snapshot
    /// is released after it.
    pub(crate) fn publish(&self, snapshot: Snapshot<R>) {
        let next = Arc::new(snapshot);
        let previous = std::mem::replace(&mut *self.root.write(), next);
        drop(previous);
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// An in-memory, schema-driven table store.
///
/// Cloning a `Store` gives another handle to the same store.
pub struct Store<R> {
    inner: Arc<StoreInner<R>>,
}

impl<R> Clone for Store<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Send + Sync + 'static> Store<R> {
    /// Validates `schema` and opens an empty store.
    pub fn open(schema: DbSchema<R>) -> SchemaResult<Self> {
        Self::open_with_config(schema, StoreConfig::default())
    }

    pub fn open_with_config(schema: DbSchema<R>, config: StoreConfig) -> SchemaResult<Self> {
        schema.validate()?;

        let root = Snapshot::empty(&schema);
        let tables = schema.tables().len().to_string();
        log_event_with_fields(
            Event::StoreOpened,
            &[("store", config.name.as_str()), ("tables", tables.as_str())],
        );

        Ok(Self::from_parts(Arc::new(schema), config, root))
    }

    fn from_parts(schema: Arc<DbSchema<R>>, config: StoreConfig, root: Snapshot<R>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                schema,
                config,
                root: RwLock::new(Arc::new(root)),
                writer: Arc::new(Mutex::new(())),
                closed: AtomicBool::new(false),
                metrics: MetricsRegistry::new(),
            }),
        }
    }

    /// Opens a transaction; `write` selects the mode for its whole life.
    pub fn txn(&self, write: bool) -> TxnResult<Txn<R>> {
        if write {
            self.write_txn()
        } else {
            Ok(self.read_txn())
        }
    }

    /// A read transaction over the current snapshot. Never blocks.
    pub fn read_txn(&self) -> Txn<R> {
        self.inner.metrics.increment_read_txns();
        Txn::read(Arc::clone(&self.inner), self.inner.current())
    }

    /// A write transaction; blocks while another writer is active.
    pub fn write_txn(&self) -> TxnResult<Txn<R>> {
        if self.inner.is_closed() {
            return Err(TxnError::Closed);
        }
        let guard = self.inner.writer.lock_arc();
        // Closed while we waited for the lock
        if self.inner.is_closed() {
            return Err(TxnError::Closed);
        }
        self.inner.metrics.increment_write_txns();
        let base = self.inner.current();
        Ok(Txn::write(Arc::clone(&self.inner), base, guard))
    }

    /// An independent store starting from the current state.
    ///
    /// Both stores share every tree node until one of them writes; writes
    /// to either are invisible to the other.
    pub fn snapshot(&self) -> Store<R> {
        let current = self.inner.current();
        let root = Snapshot::new(current.commit_id(), current.trees().clone());
        let commit = current.commit_id().to_string();
        log_event_with_fields(
            Event::StoreSnapshot,
            &[("commit_id", commit.as_str()), ("store", self.inner.config.name.as_str())],
        );
        Self::from_parts(Arc::clone(&self.inner.schema), self.inner.config.clone(), root)
    }

    /// Refuses new writers and pending commits. Captured snapshots stay
    /// readable.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            log_event_with_fields(Event::StoreClosed, &[("store", self.inner.config.name.as_str())]);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    pub fn schema(&self) -> &DbSchema<R> {
        &self.inner.schema
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Version of the current snapshot
    pub fn commit_id(&self) -> CommitId {
        self.inner.current().commit_id()
    }

    /// Soft limit for `WatchSet::add_with_limit`
    pub fn watch_limit(&self) -> usize {
        self.inner.config.watch_limit
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Graphviz export of every index tree in the current snapshot.
    pub fn export(&self) -> String {
        self.inner.current().to_dot(&self.inner.schema)
    }
}
