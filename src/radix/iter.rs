//! Lazy ordered iteration
//!
//! Iterators own `Arc`s to the nodes they still have to visit, so they stay
//! valid (and keep their snapshot alive) independently of the tree handle
//! they were created from.

use std::cmp::Ordering;
use std::sync::Arc;

use super::node::{Leaf, Node};
use crate::watch::WatchCh;

/// Ascending iterator over leaves.
pub struct Iter<V> {
    stack: Vec<Arc<Node<V>>>,
}

impl<V> Iter<V> {
    pub(crate) fn from_stack(stack: Vec<Arc<Node<V>>>) -> Self {
        Self { stack }
    }
}

impl<V> Iterator for Iter<V> {
    type Item = Arc<Leaf<V>>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(n) = self.stack.pop() {
            for edge in n.edges.iter().rev() {
                self.stack.push(Arc::clone(&edge.node));
            }
            // A node's own key is a prefix of every key below it.
            if let Some(leaf) = &n.leaf {
                return Some(Arc::clone(leaf));
            }
        }
        None
    }
}

pub(crate) enum RevFrame<V> {
    Node(Arc<Node<V>>),
    Leaf(Arc<Leaf<V>>),
}

/// Descending iterator over leaves.
pub struct RevIter<V> {
    stack: Vec<RevFrame<V>>,
}

impl<V> RevIter<V> {
    pub(crate) fn from_node(node: Option<Arc<Node<V>>>) -> Self {
        Self {
            stack: node.into_iter().map(RevFrame::Node).collect(),
        }
    }

    pub(crate) fn from_stack(stack: Vec<RevFrame<V>>) -> Self {
        Self { stack }
    }
}

impl<V> Iterator for RevIter<V> {
    type Item = Arc<Leaf<V>>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.stack.pop() {
            match frame {
                RevFrame::Leaf(leaf) => return Some(leaf),
                RevFrame::Node(n) => {
                    if let Some(leaf) = &n.leaf {
                        self.stack.push(RevFrame::Leaf(Arc::clone(leaf)));
                    }
                    for edge in &n.edges {
                        self.stack.push(RevFrame::Node(Arc::clone(&edge.node)));
                    }
                }
            }
        }
        None
    }
}

/// Finds the subtree holding every key that starts with `prefix`.
///
/// The returned channel belongs to that subtree, or to the deepest node
/// visited when nothing matches.
pub(crate) fn seek_prefix<V>(root: &Arc<Node<V>>, prefix: &[u8]) -> (WatchCh, Option<Arc<Node<V>>>) {
    let mut n = Arc::clone(root);
    let mut search = prefix;
    loop {
        if search.is_empty() {
            return (n.watch.clone(), Some(n));
        }
        let child = match n.child(search[0]) {
            Some(child) => Arc::clone(child),
            None => return (n.watch.clone(), None),
        };
        if search.starts_with(&child.prefix) {
            search = &search[child.prefix.len()..];
            n = child;
        } else if child.prefix.starts_with(search) {
            return (child.watch.clone(), Some(child));
        } else {
            return (n.watch.clone(), None);
        }
    }
}

/// Builds an ascending stack positioned at the first key `>= key`.
pub(crate) fn lower_bound_stack<V>(root: &Arc<Node<V>>, key: &[u8]) -> Vec<Arc<Node<V>>> {
    let mut stack = Vec::new();
    let mut n = Arc::clone(root);
    let mut search = key;
    loop {
        if search.is_empty() {
            stack.push(n);
            return stack;
        }

        // The node's own leaf is smaller than the key; edges with a larger
        // label are entirely greater.
        let label = search[0];
        for edge in n.edges.iter().rev() {
            if edge.label <= label {
                break;
            }
            stack.push(Arc::clone(&edge.node));
        }

        let child = match n.child(label) {
            Some(child) => Arc::clone(child),
            None => return stack,
        };
        let len = child.prefix.len().min(search.len());
        match child.prefix[..len].cmp(&search[..len]) {
            Ordering::Greater => {
                stack.push(child);
                return stack;
            }
            Ordering::Less => return stack,
            Ordering::Equal if child.prefix.len() > search.len() => {
                // The key ends inside this edge: every key below is longer.
                stack.push(child);
                return stack;
            }
            Ordering::Equal => {
                search = &search[child.prefix.len()..];
                n = child;
            }
        }
    }
}

/// Builds a descending stack positioned at the last key `<= key`.
pub(crate) fn reverse_lower_bound_stack<V>(root: &Arc<Node<V>>, key: &[u8]) -> Vec<RevFrame<V>> {
    let mut stack = Vec::new();
    let mut n = Arc::clone(root);
    let mut search = key;
    loop {
        if let Some(leaf) = &n.leaf {
            stack.push(RevFrame::Leaf(Arc::clone(leaf)));
        }
        if search.is_empty() {
            return stack;
        }

        let label = search[0];
        for edge in &n.edges {
            if edge.label >= label {
                break;
            }
            stack.push(RevFrame::Node(Arc::clone(&edge.node)));
        }

        let child = match n.child(label) {
            Some(child) => Arc::clone(child),
            None => return stack,
        };
        let len = child.prefix.len().min(search.len());
        match child.prefix[..len].cmp(&search[..len]) {
            Ordering::Less => {
                stack.push(RevFrame::Node(child));
                return stack;
            }
            Ordering::Greater => return stack,
            Ordering::Equal if child.prefix.len() > search.len() => return stack,
            Ordering::Equal => {
                search = &search[child.prefix.len()..];
                n = child;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::radix::Tree;

    fn build(keys: &[&str]) -> Tree<()> {
        let mut tree = Tree::new();
        for key in keys {
            tree = tree.insert(key.as_bytes(), ()).0;
        }
        tree
    }

    fn collect<I: Iterator<Item = std::sync::Arc<crate::radix::Leaf<()>>>>(iter: I) -> Vec<String> {
        iter.map(|leaf| String::from_utf8(leaf.key().to_vec()).unwrap())
            .collect()
    }

    const KEYS: &[&str] = &["", "a", "ab", "abc", "abd", "b", "ba", "bcd", "c"];

    #[test]
    fn test_iter_is_sorted_and_complete() {
        let mut shuffled = KEYS.to_vec();
        shuffled.reverse();
        let tree = build(&shuffled);
        assert_eq!(collect(tree.iter()), KEYS.to_vec());
    }

    #[test]
    fn test_iter_prefix() {
        let tree = build(KEYS);
        assert_eq!(collect(tree.iter_prefix(b"ab")), vec!["ab", "abc", "abd"]);
        assert_eq!(collect(tree.iter_prefix(b"b")), vec!["b", "ba", "bcd"]);
        assert_eq!(collect(tree.iter_prefix(b"bc")), vec!["bcd"]);
        assert!(collect(tree.iter_prefix(b"x")).is_empty());
        assert!(collect(tree.iter_prefix(b"abcd")).is_empty());
        assert_eq!(collect(tree.iter_prefix(b"")).len(), KEYS.len());
    }

    #[test]
    fn test_iter_from() {
        let tree = build(KEYS);
        assert_eq!(collect(tree.iter_from(b"abd")), vec!["abd", "b", "ba", "bcd", "c"]);
        assert_eq!(collect(tree.iter_from(b"abca")), vec!["abd", "b", "ba", "bcd", "c"]);
        assert_eq!(collect(tree.iter_from(b"bb")), vec!["bcd", "c"]);
        assert_eq!(collect(tree.iter_from(b"bc")), vec!["bcd", "c"]);
        assert_eq!(collect(tree.iter_from(b"")), KEYS.to_vec());
        assert!(collect(tree.iter_from(b"d")).is_empty());
    }

    #[test]
    fn test_iter_rev() {
        let tree = build(KEYS);
        let mut expected = KEYS.to_vec();
        expected.reverse();
        assert_eq!(collect(tree.iter_rev()), expected);
        assert_eq!(collect(tree.iter_rev_prefix(b"ab")), vec!["abd", "abc", "ab"]);
    }

    #[test]
    fn test_iter_rev_to() {
        let tree = build(KEYS);
        assert_eq!(collect(tree.iter_rev_to(b"abd")), vec!["abd", "abc", "ab", "a", ""]);
        assert_eq!(collect(tree.iter_rev_to(b"abca")), vec!["abc", "ab", "a", ""]);
        assert_eq!(collect(tree.iter_rev_to(b"bb")), vec!["ba", "b", "abd", "abc", "ab", "a", ""]);
        assert_eq!(collect(tree.iter_rev_to(b"bc")), vec!["ba", "b", "abd", "abc", "ab", "a", ""]);
        assert_eq!(collect(tree.iter_rev_to(b"")), vec![""]);
        assert_eq!(collect(tree.iter_rev_to(b"zz")).len(), KEYS.len());
    }

    #[test]
    fn test_iterators_are_independent() {
        let tree = build(KEYS);
        let mut first = tree.iter();
        first.next();
        let second = tree.iter();
        assert_eq!(collect(second), KEYS.to_vec());
        assert_eq!(collect(first).len(), KEYS.len() - 1);
    }

    #[test]
    fn test_iterator_outlives_newer_versions() {
        let tree = build(&["a", "b"]);
        let iter = tree.iter();
        let (tree, _) = tree.insert(b"c", ());
        let (_tree, _) = tree.delete(b"a");
        assert_eq!(collect(iter), vec!["a", "b"]);
    }

    #[test]
    fn test_prefix_watch_covers_subtree() {
        let tree = build(&["foo/a", "foo/b", "bar"]);
        let (watch, iter) = tree.iter_prefix_watch(b"foo/");
        assert_eq!(collect(iter).len(), 2);

        let mut tracker = crate::radix::WatchTracker::new();
        let _ = tree.insert_tracked(b"foo/c", (), &mut tracker);
        tracker.close_all();
        assert!(watch.is_closed());
    }
}
