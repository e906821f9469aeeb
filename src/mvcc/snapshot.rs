//! Snapshot - one immutable version of every index tree

use std::sync::Arc;

use crate::radix::Tree;
use crate::schema::DbSchema;

use super::commit_id::CommitId;

/// Trees indexed by table position, then index position.
pub(crate) type Trees<R> = Vec<Vec<Tree<Arc<R>>>>;

/// A committed state of the store.
///
/// All trees of one snapshot describe the same record set. Snapshots are
/// never modified; a commit publishes a new one.
pub struct Snapshot<R> {
    commit_id: CommitId,
    trees: Trees<R>,
}

impl<R> Snapshot<R> {
    /// Empty trees for every index of `schema`.
    pub(crate) fn empty(schema: &DbSchema<R>) -> Self {
        let trees = schema
            .tables()
            .iter()
            .map(|table| table.indexes().iter().map(|_| Tree::new()).collect())
            .collect();
        Self {
            commit_id: CommitId::ZERO,
            trees,
        }
    }

    pub(crate) fn new(commit_id: CommitId, trees: Trees<R>) -> Self {
        Self { commit_id, trees }
    }

    pub fn commit_id(&self) -> CommitId {
        self.commit_id
    }

    pub(crate) fn trees(&self) -> &Trees<R> {
        &self.trees
    }

    /// Graphviz export of every tree, one subgraph per `table.index`.
    pub(crate) fn to_dot(&self, schema: &DbSchema<R>) -> String {
        let mut out = String::from("digraph G {\n");
        for (t, table) in schema.tables().iter().enumerate() {
            for (i, index) in table.indexes().iter().enumerate() {
                let name = format!("{}.{}", table.name(), index.name());
                self.trees[t][i].write_dot_subgraph(&mut out, &name, &format!("t{}i{}_", t, i));
            }
        }
        out.push_str("}\n");
        out
    }
}
