//! Per-record change tracking for write transactions

use std::collections::HashMap;
use std::sync::Arc;

/// What a committed transaction did to one record.
///
/// `before` is the record as of the transaction's start, `after` as of its
/// end; `None` means absent. Both are never `None` at once.
pub struct Change<R> {
    pub table: String,
    pub primary_key: Vec<u8>,
    pub before: Option<Arc<R>>,
    pub after: Option<Arc<R>>,
}

impl<R> Change<R> {
    pub fn created(&self) -> bool {
        self.before.is_none() && self.after.is_some()
    }

    pub fn updated(&self) -> bool {
        self.before.is_some() && self.after.is_some()
    }

    pub fn deleted(&self) -> bool {
        self.before.is_some() && self.after.is_none()
    }
}

impl<R> Clone for Change<R> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            primary_key: self.primary_key.clone(),
            before: self.before.clone(),
            after: self.after.clone(),
        }
    }
}

impl<R: std::fmt::Debug> std::fmt::Debug for Change<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Change")
            .field("table", &self.table)
            .field("before", &self.before)
            .field("after", &self.after)
            .finish()
    }
}

/// Changes coalesced per (table, primary key), in first-touch order.
pub(crate) struct ChangeSet<R> {
    changes: Vec<Change<R>>,
    positions: HashMap<(String, Vec<u8>), usize>,
}

impl<R> ChangeSet<R> {
    pub(crate) fn new() -> Self {
        Self {
            changes: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub(crate) fn record(
        &mut self,
        table: &str,
        primary_key: &[u8],
        before: Option<Arc<R>>,
        after: Option<Arc<R>>,
    ) {
        let key = (table.to_string(), primary_key.to_vec());
        match self.positions.get(&key) {
            Some(&pos) => self.changes[pos].after = after,
            None => {
                self.positions.insert(key, self.changes.len());
                self.changes.push(Change {
                    table: table.to_string(),
                    primary_key: primary_key.to_vec(),
                    before,
                    after,
                });
            }
        }
    }

    /// Changes with a net effect.
    pub(crate) fn to_vec(&self) -> Vec<Change<R>> {
        self.changes
            .iter()
            .filter(|c| c.before.is_some() || c.after.is_some())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coalesce_update_chain() {
        let mut set = ChangeSet::new();
        set.record("t", b"1", Some(Arc::new(1)), Some(Arc::new(2)));
        set.record("t", b"1", Some(Arc::new(2)), Some(Arc::new(3)));

        let changes = set.to_vec();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].before.as_deref(), Some(&1));
        assert_eq!(changes[0].after.as_deref(), Some(&3));
        assert!(changes[0].updated());
    }

    #[test]
    fn test_insert_then_delete_vanishes() {
        let mut set = ChangeSet::new();
        set.record("t", b"1", None, Some(Arc::new(1)));
        set.record("t", b"1", Some(Arc::new(1)), None);
        assert!(set.to_vec().is_empty());
    }

    #[test]
    fn test_first_touch_order() {
        let mut set = ChangeSet::new();
        set.record("t", b"b", None, Some(Arc::new(2)));
        set.record("t", b"a", Some(Arc::new(0)), None);
        set.record("t", b"b", Some(Arc::new(2)), Some(Arc::new(3)));

        let changes = set.to_vec();
        assert_eq!(changes[0].primary_key, b"b".to_vec());
        assert!(changes[0].created());
        assert!(changes[1].deleted());
    }
}
