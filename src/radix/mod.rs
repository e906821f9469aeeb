//! Persistent radix tree for memdb indexes
//!
//! Every (table, index) pair of a snapshot is one `Tree`. Trees are immutable:
//! insert and delete return a new tree that owns freshly allocated nodes along
//! the modified path and shares every other node and leaf with the original.
//!
//! # Invariants
//!
//! - Keys are byte strings ordered lexicographically
//! - Edges of a node are sorted by their first byte
//! - A non-root node without a leaf has at least two children, so a key set
//!   has exactly one tree shape
//! - Published nodes are never mutated, which lets readers walk a tree
//!   without locks while a writer builds the next version
//!
//! # Watch channels
//!
//! Every node and leaf owns a `WatchCh`. The `*_tracked` mutations record the
//! channels of every node and leaf they replaced in a `WatchTracker`; the
//! transaction closes them once its commit is published.

mod dot;
mod iter;
mod node;
mod tree;

pub use iter::{Iter, RevIter};
pub use node::Leaf;
pub use tree::{Tree, WatchTracker};
