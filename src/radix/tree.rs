//! Copy-on-write tree operations

use std::fmt;
use std::sync::Arc;

use super::iter::{self, Iter, RevIter};
use super::node::{common_prefix_len, Leaf, Node};
use crate::watch::WatchCh;

/// Collects the watch channels of nodes and leaves replaced by mutations.
#[derive(Debug, Default)]
pub struct WatchTracker {
    channels: Vec<WatchCh>,
}

impl WatchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, ch: &WatchCh) {
        self.channels.push(ch.clone());
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Moves every tracked channel of `other` into this tracker.
    pub fn extend(&mut self, other: WatchTracker) {
        self.channels.extend(other.channels);
    }

    /// Closes every tracked channel. Returns how many were newly closed.
    pub fn close_all(self) -> usize {
        self.channels.into_iter().filter(|ch| ch.close()).count()
    }
}

/// An immutable radix tree.
///
/// Cloning a tree is an `Arc` clone; both handles share every node.
pub struct Tree<V> {
    root: Arc<Node<V>>,
    size: usize,
}

impl<V> Clone for Tree<V> {
    fn clone(&self) -> Self {
        Self {
            root: Arc::clone(&self.root),
            size: self.size,
        }
    }
}

impl<V> Default for Tree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for Tree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree").field("size", &self.size).finish()
    }
}

impl<V> Tree<V> {
    /// Creates an empty tree
    pub fn new() -> Self {
        Self {
            root: Arc::new(Node::empty()),
            size: 0,
        }
    }

    /// Number of keys stored
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub(crate) fn root(&self) -> &Arc<Node<V>> {
        &self.root
    }

    /// Channel closed by any commit that modifies this tree.
    pub fn root_watch(&self) -> &WatchCh {
        &self.root.watch
    }

    /// Returns true if both handles share the same root node.
    pub fn ptr_eq(&self, other: &Tree<V>) -> bool {
        Arc::ptr_eq(&self.root, &other.root)
    }

    /// Exact lookup.
    pub fn get(&self, key: &[u8]) -> Option<&V> {
        self.get_leaf(key).map(|leaf| leaf.value())
    }

    /// Exact lookup returning the shared leaf.
    pub fn get_leaf(&self, key: &[u8]) -> Option<&Arc<Leaf<V>>> {
        let mut n: &Node<V> = &self.root;
        let mut search = key;
        loop {
            if search.is_empty() {
                return n.leaf.as_ref();
            }
            let child = n.child(search[0])?;
            if !search.starts_with(&child.prefix) {
                return None;
            }
            search = &search[child.prefix.len()..];
            n = child;
        }
    }

    /// Exact lookup plus the channel to watch for changes to `key`.
    ///
    /// When the key is present the leaf's channel is returned, otherwise the
    /// channel of the deepest node on the key's path.
    pub fn get_watch(&self, key: &[u8]) -> (WatchCh, Option<&V>) {
        let mut n: &Node<V> = &self.root;
        let mut search = key;
        loop {
            if search.is_empty() {
                return match &n.leaf {
                    Some(leaf) => (leaf.watch_ch().clone(), Some(leaf.value())),
                    None => (n.watch.clone(), None),
                };
            }
            let child = match n.child(search[0]) {
                Some(child) if search.starts_with(&child.prefix) => child,
                _ => return (n.watch.clone(), None),
            };
            search = &search[child.prefix.len()..];
            n = child;
        }
    }

    /// Longest stored key that is a prefix of `key`.
    pub fn longest_prefix(&self, key: &[u8]) -> Option<(&[u8], &V)> {
        let mut n: &Node<V> = &self.root;
        let mut search = key;
        let mut best = n.leaf.as_ref();
        loop {
            if search.is_empty() {
                break;
            }
            let child = match n.child(search[0]) {
                Some(child) if search.starts_with(&child.prefix) => child,
                _ => break,
            };
            search = &search[child.prefix.len()..];
            n = child;
            if n.leaf.is_some() {
                best = n.leaf.as_ref();
            }
        }
        best.map(|leaf| (leaf.key(), leaf.value()))
    }

    /// Smallest key in the tree.
    pub fn minimum(&self) -> Option<(&[u8], &V)> {
        let mut n: &Node<V> = &self.root;
        loop {
            if let Some(leaf) = &n.leaf {
                return Some((leaf.key(), leaf.value()));
            }
            n = &n.edges.first()?.node;
        }
    }

    /// Largest key in the tree.
    pub fn maximum(&self) -> Option<(&[u8], &V)> {
        let mut n: &Node<V> = &self.root;
        while let Some(edge) = n.edges.last() {
            n = &edge.node;
        }
        n.leaf.as_ref().map(|leaf| (leaf.key(), leaf.value()))
    }

    /// Ascending iteration over every key.
    pub fn iter(&self) -> Iter<V> {
        Iter::from_stack(vec![Arc::clone(&self.root)])
    }

    /// Ascending iteration over keys starting with `prefix`.
    pub fn iter_prefix(&self, prefix: &[u8]) -> Iter<V> {
        self.iter_prefix_watch(prefix).1
    }

    /// Prefix iteration plus the channel covering the matched subtree.
    pub fn iter_prefix_watch(&self, prefix: &[u8]) -> (WatchCh, Iter<V>) {
        let (watch, node) = iter::seek_prefix(&self.root, prefix);
        (watch, Iter::from_stack(node.into_iter().collect()))
    }

    /// Ascending iteration over keys `>= key`.
    pub fn iter_from(&self, key: &[u8]) -> Iter<V> {
        Iter::from_stack(iter::lower_bound_stack(&self.root, key))
    }

    /// Descending iteration over every key.
    pub fn iter_rev(&self) -> RevIter<V> {
        RevIter::from_node(Some(Arc::clone(&self.root)))
    }

    /// Descending iteration over keys starting with `prefix`.
    pub fn iter_rev_prefix(&self, prefix: &[u8]) -> RevIter<V> {
        let (_, node) = iter::seek_prefix(&self.root, prefix);
        RevIter::from_node(node)
    }

    /// Descending iteration over keys `<= key`.
    pub fn iter_rev_to(&self, key: &[u8]) -> RevIter<V> {
        RevIter::from_stack(iter::reverse_lower_bound_stack(&self.root, key))
    }
}

impl<V: Clone> Tree<V> {
    /// Inserts or replaces `key`, returning the new tree and the old value.
    pub fn insert(&self, key: &[u8], value: V) -> (Tree<V>, Option<V>) {
        self.insert_tracked(key, value, &mut WatchTracker::new())
    }

    /// Like `insert`, recording replaced channels in `tracker`.
    pub fn insert_tracked(
        &self,
        key: &[u8],
        value: V,
        tracker: &mut WatchTracker,
    ) -> (Tree<V>, Option<V>) {
        let (root, old) = insert_node(&self.root, key, key, value, tracker);
        let size = if old.is_some() {
            self.size
        } else {
            self.size + 1
        };
        (
            Tree {
                root: Arc::new(root),
                size,
            },
            old,
        )
    }

    /// Removes `key`, returning the new tree and the removed value.
    ///
    /// When the key is absent the returned tree shares the original root.
    pub fn delete(&self, key: &[u8]) -> (Tree<V>, Option<V>) {
        self.delete_tracked(key, &mut WatchTracker::new())
    }

    /// Like `delete`, recording replaced channels in `tracker`.
    pub fn delete_tracked(&self, key: &[u8], tracker: &mut WatchTracker) -> (Tree<V>, Option<V>) {
        match delete_node(&self.root, true, key, tracker) {
            Some((root, leaf)) => (
                Tree {
                    root: Arc::new(root.unwrap_or_else(Node::empty)),
                    size: self.size - 1,
                },
                Some(leaf.value().clone()),
            ),
            None => (self.clone(), None),
        }
    }

    /// Removes every key starting with `prefix`. Returns the number removed.
    pub fn delete_prefix(&self, prefix: &[u8]) -> (Tree<V>, usize) {
        self.delete_prefix_tracked(prefix, &mut WatchTracker::new())
    }

    /// Like `delete_prefix`, recording replaced channels in `tracker`.
    pub fn delete_prefix_tracked(
        &self,
        prefix: &[u8],
        tracker: &mut WatchTracker,
    ) -> (Tree<V>, usize) {
        match delete_prefix_node(&self.root, true, prefix, tracker) {
            Some((root, removed)) => (
                Tree {
                    root: Arc::new(root.unwrap_or_else(Node::empty)),
                    size: self.size - removed,
                },
                removed,
            ),
            None => (self.clone(), 0),
        }
    }
}

fn insert_node<V: Clone>(
    n: &Node<V>,
    key: &[u8],
    search: &[u8],
    value: V,
    tracker: &mut WatchTracker,
) -> (Node<V>, Option<V>) {
    tracker.track(&n.watch);
    let mut nc = n.copy();

    if search.is_empty() {
        let old = n.leaf.as_ref().map(|leaf| {
            tracker.track(leaf.watch_ch());
            leaf.value().clone()
        });
        nc.leaf = Some(Arc::new(Leaf::new(key.to_vec(), value)));
        return (nc, old);
    }

    let idx = match n.edge_index(search[0]) {
        Ok(idx) => idx,
        Err(_) => {
            let mut child = Node::with_prefix(search.to_vec());
            child.leaf = Some(Arc::new(Leaf::new(key.to_vec(), value)));
            nc.add_edge(child);
            return (nc, None);
        }
    };

    let child = &n.edges[idx].node;
    let common = common_prefix_len(search, &child.prefix);
    if common == child.prefix.len() {
        let (new_child, old) = insert_node(child, key, &search[common..], value, tracker);
        nc.edges[idx].node = Arc::new(new_child);
        return (nc, old);
    }

    // The edge diverges from the key inside its label: split it.
    let mut split = Node::with_prefix(search[..common].to_vec());

    tracker.track(&child.watch);
    let mut moved = child.copy();
    moved.prefix = child.prefix[common..].to_vec();
    split.add_edge(moved);

    let leaf = Arc::new(Leaf::new(key.to_vec(), value));
    if common == search.len() {
        split.leaf = Some(leaf);
    } else {
        let mut rest = Node::with_prefix(search[common..].to_vec());
        rest.leaf = Some(leaf);
        split.add_edge(rest);
    }

    nc.edges[idx].node = Arc::new(split);
    (nc, None)
}

/// Returns `None` when the key is absent. Otherwise the replacement node
/// (`None` if the node disappears) and the removed leaf.
fn delete_node<V>(
    n: &Node<V>,
    is_root: bool,
    search: &[u8],
    tracker: &mut WatchTracker,
) -> Option<(Option<Node<V>>, Arc<Leaf<V>>)> {
    if search.is_empty() {
        let leaf = n.leaf.clone()?;
        tracker.track(&n.watch);
        tracker.track(leaf.watch_ch());

        let mut nc = n.copy();
        nc.leaf = None;
        if !is_root {
            if nc.edges.is_empty() {
                return Some((None, leaf));
            }
            if nc.edges.len() == 1 {
                merge_child(&mut nc, tracker);
            }
        }
        return Some((Some(nc), leaf));
    }

    let idx = n.edge_index(search[0]).ok()?;
    let child = &n.edges[idx].node;
    if !search.starts_with(&child.prefix) {
        return None;
    }

    let (new_child, leaf) = delete_node(child, false, &search[child.prefix.len()..], tracker)?;
    tracker.track(&n.watch);
    let mut nc = n.copy();
    match new_child {
        Some(c) => nc.edges[idx].node = Arc::new(c),
        None => {
            nc.edges.remove(idx);
            if !is_root && nc.leaf.is_none() {
                match nc.edges.len() {
                    0 => return Some((None, leaf)),
                    1 => merge_child(&mut nc, tracker),
                    _ => {}
                }
            }
        }
    }
    Some((Some(nc), leaf))
}

fn delete_prefix_node<V>(
    n: &Node<V>,
    is_root: bool,
    search: &[u8],
    tracker: &mut WatchTracker,
) -> Option<(Option<Node<V>>, usize)> {
    if search.is_empty() {
        let removed = track_subtree(n, tracker);
        if removed == 0 {
            return None;
        }
        return Some((if is_root { Some(Node::empty()) } else { None }, removed));
    }

    let idx = n.edge_index(search[0]).ok()?;
    let child = &n.edges[idx].node;
    let rest: &[u8] = if search.starts_with(&child.prefix) {
        &search[child.prefix.len()..]
    } else if child.prefix.starts_with(search) {
        &[]
    } else {
        return None;
    };

    let (new_child, removed) = delete_prefix_node(child, false, rest, tracker)?;
    tracker.track(&n.watch);
    let mut nc = n.copy();
    match new_child {
        Some(c) => nc.edges[idx].node = Arc::new(c),
        None => {
            nc.edges.remove(idx);
            if !is_root && nc.leaf.is_none() {
                match nc.edges.len() {
                    0 => return Some((None, removed)),
                    1 => merge_child(&mut nc, tracker),
                    _ => {}
                }
            }
        }
    }
    Some((Some(nc), removed))
}

/// Collapses a leafless node with a single child into that child.
fn merge_child<V>(nc: &mut Node<V>, tracker: &mut WatchTracker) {
    let child = Arc::clone(&nc.edges[0].node);
    tracker.track(&child.watch);
    nc.prefix.extend_from_slice(&child.prefix);
    nc.leaf = child.leaf.clone();
    nc.edges = child.edges.clone();
}

fn track_subtree<V>(n: &Node<V>, tracker: &mut WatchTracker) -> usize {
    tracker.track(&n.watch);
    let mut count = 0;
    if let Some(leaf) = &n.leaf {
        tracker.track(leaf.watch_ch());
        count += 1;
    }
    for edge in &n.edges {
        count += track_subtree(&edge.node, tracker);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(keys: &[&str]) -> Tree<u32> {
        let mut tree = Tree::new();
        for (i, key) in keys.iter().enumerate() {
            tree = tree.insert(key.as_bytes(), i as u32).0;
        }
        tree
    }

    fn keys(tree: &Tree<u32>) -> Vec<String> {
        tree.iter()
            .map(|leaf| String::from_utf8(leaf.key().to_vec()).unwrap())
            .collect()
    }

    #[test]
    fn test_empty_tree() {
        let tree: Tree<u32> = Tree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.get(b"a"), None);
        assert_eq!(tree.iter().count(), 0);
        assert!(tree.minimum().is_none());
        assert!(tree.maximum().is_none());
    }

    #[test]
    fn test_insert_and_get() {
        let tree = build(&["foo", "foobar", "fo", "bar"]);
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.get(b"foo"), Some(&0));
        assert_eq!(tree.get(b"foobar"), Some(&1));
        assert_eq!(tree.get(b"fo"), Some(&2));
        assert_eq!(tree.get(b"bar"), Some(&3));
        assert_eq!(tree.get(b"f"), None);
        assert_eq!(tree.get(b"foob"), None);
        assert_eq!(tree.get(b"foobarbaz"), None);
    }

    #[test]
    fn test_insert_does_not_mutate_receiver() {
        let before = build(&["a", "b"]);
        let (after, old) = before.insert(b"c", 9);
        assert!(old.is_none());
        assert_eq!(before.len(), 2);
        assert_eq!(before.get(b"c"), None);
        assert_eq!(after.get(b"c"), Some(&9));
    }

    #[test]
    fn test_insert_replaces_existing() {
        let tree = build(&["alpha", "beta"]);
        let shape = tree.to_dot();
        let (tree, old) = tree.insert(b"alpha", 42);
        assert_eq!(old, Some(0));
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.get(b"alpha"), Some(&42));
        assert_eq!(tree.to_dot(), shape);
    }

    #[test]
    fn test_empty_key() {
        let tree = build(&["", "a"]);
        assert_eq!(tree.get(b""), Some(&0));
        assert_eq!(keys(&tree), vec!["", "a"]);
        let (tree, old) = tree.delete(b"");
        assert_eq!(old, Some(0));
        assert_eq!(keys(&tree), vec!["a"]);
    }

    #[test]
    fn test_delete() {
        let tree = build(&["romane", "romanus", "romulus", "rubens"]);
        let (tree, old) = tree.delete(b"romanus");
        assert_eq!(old, Some(1));
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.get(b"romanus"), None);
        assert_eq!(tree.get(b"romane"), Some(&0));
        assert_eq!(keys(&tree), vec!["romane", "romulus", "rubens"]);
    }

    #[test]
    fn test_delete_missing_shares_root() {
        let tree = build(&["a", "b"]);
        let (after, old) = tree.delete(b"zzz");
        assert!(old.is_none());
        assert!(after.ptr_eq(&tree));
        let (after, old) = tree.delete(b"");
        assert!(old.is_none());
        assert!(after.ptr_eq(&tree));
    }

    #[test]
    fn test_shape_is_canonical() {
        let a = build(&["team", "tea", "test", "toast", "to", "t"]);
        let b = build(&["t", "to", "toast", "test", "tea", "team"]);
        assert_eq!(a.to_dot(), b.to_dot());

        // Deleting restores the shape of a tree that never held the key.
        let (without, _) = a.delete(b"tea");
        let direct = build(&["team", "test", "toast", "to", "t"]);
        assert_eq!(without.to_dot(), direct.to_dot());
    }

    #[test]
    fn test_delete_everything_leaves_empty_tree() {
        let mut tree = build(&["x", "xy", "xyz", "y"]);
        for key in ["xy", "x", "y", "xyz"] {
            tree = tree.delete(key.as_bytes()).0;
        }
        assert!(tree.is_empty());
        assert_eq!(tree.to_dot(), Tree::<u32>::new().to_dot());
    }

    #[test]
    fn test_unrelated_leaves_are_shared() {
        let before = build(&["apple", "apricot", "banana", "blueberry", "cherry"]);
        let (after, _) = before.insert(b"avocado", 99);

        for key in ["apple", "apricot", "banana", "blueberry", "cherry"] {
            let old = before.get_leaf(key.as_bytes()).unwrap();
            let new = after.get_leaf(key.as_bytes()).unwrap();
            assert!(Arc::ptr_eq(old, new), "leaf {} was copied", key);
        }
    }

    #[test]
    fn test_unrelated_subtrees_are_shared() {
        let before = build(&["apple", "banana", "blueberry"]);
        let (after, _) = before.insert(b"avocado", 9);

        let old_b = before.root().child(b'b').unwrap();
        let new_b = after.root().child(b'b').unwrap();
        assert!(Arc::ptr_eq(old_b, new_b));
    }

    #[test]
    fn test_longest_prefix() {
        let tree = build(&["", "foo", "foobar", "foozip"]);
        assert_eq!(tree.longest_prefix(b"foob").map(|(k, _)| k), Some(&b"foo"[..]));
        assert_eq!(
            tree.longest_prefix(b"foobarbaz").map(|(k, _)| k),
            Some(&b"foobar"[..])
        );
        assert_eq!(tree.longest_prefix(b"zzz").map(|(k, _)| k), Some(&b""[..]));
    }

    #[test]
    fn test_minimum_maximum() {
        let tree = build(&["m", "ma", "z", "b", "bz"]);
        assert_eq!(tree.minimum().map(|(k, _)| k), Some(&b"b"[..]));
        assert_eq!(tree.maximum().map(|(k, _)| k), Some(&b"z"[..]));
    }

    #[test]
    fn test_delete_prefix() {
        let tree = build(&["foo", "foo/a", "foo/b", "fob", "bar"]);
        let (after, removed) = tree.delete_prefix(b"foo");
        assert_eq!(removed, 3);
        assert_eq!(after.len(), 2);
        assert_eq!(keys(&after), vec!["bar", "fob"]);

        let (after, removed) = tree.delete_prefix(b"fo");
        assert_eq!(removed, 4);
        assert_eq!(keys(&after), vec!["bar"]);

        let (after, removed) = tree.delete_prefix(b"nope");
        assert_eq!(removed, 0);
        assert!(after.ptr_eq(&tree));

        let (after, removed) = tree.delete_prefix(b"");
        assert_eq!(removed, 5);
        assert!(after.is_empty());
    }

    #[test]
    fn test_get_watch_fires_on_change() {
        let tree = build(&["a", "b"]);
        let (watch, value) = tree.get_watch(b"a");
        assert_eq!(value, Some(&0));

        let mut tracker = WatchTracker::new();
        let (_, _) = tree.insert_tracked(b"a", 7, &mut tracker);
        assert!(!watch.is_closed());
        tracker.close_all();
        assert!(watch.is_closed());
    }

    #[test]
    fn test_unrelated_watch_not_fired() {
        let tree = build(&["apple", "banana"]);
        let (watch, _) = tree.get_watch(b"banana");

        let mut tracker = WatchTracker::new();
        let _ = tree.insert_tracked(b"apricot", 1, &mut tracker);
        tracker.close_all();
        assert!(!watch.is_closed());
    }

    #[test]
    fn test_missing_key_watch_fires_on_insert() {
        let tree = build(&["apple"]);
        let (watch, value) = tree.get_watch(b"avocado");
        assert!(value.is_none());

        let mut tracker = WatchTracker::new();
        let _ = tree.insert_tracked(b"avocado", 1, &mut tracker);
        tracker.close_all();
        assert!(watch.is_closed());
    }
}
