//! Tree nodes, edges and leaves

use std::sync::Arc;

use crate::watch::WatchCh;

/// A stored key and its value.
///
/// Leaves are shared by reference between every tree version that did not
/// replace them.
#[derive(Debug)]
pub struct Leaf<V> {
    key: Vec<u8>,
    value: V,
    watch: WatchCh,
}

impl<V> Leaf<V> {
    pub(crate) fn new(key: Vec<u8>, value: V) -> Self {
        Self {
            key,
            value,
            watch: WatchCh::new(),
        }
    }

    /// Full key from the root
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    /// Channel closed when this leaf is replaced or removed
    pub fn watch_ch(&self) -> &WatchCh {
        &self.watch
    }
}

pub(crate) struct Edge<V> {
    pub(crate) label: u8,
    pub(crate) node: Arc<Node<V>>,
}

impl<V> Clone for Edge<V> {
    fn clone(&self) -> Self {
        Self {
            label: self.label,
            node: Arc::clone(&self.node),
        }
    }
}

pub(crate) struct Node<V> {
    /// Compressed edge label leading to this node; empty only at the root.
    pub(crate) prefix: Vec<u8>,
    pub(crate) leaf: Option<Arc<Leaf<V>>>,
    pub(crate) edges: Vec<Edge<V>>,
    pub(crate) watch: WatchCh,
}

impl<V> Node<V> {
    pub(crate) fn empty() -> Self {
        Self::with_prefix(Vec::new())
    }

    pub(crate) fn with_prefix(prefix: Vec<u8>) -> Self {
        Self {
            prefix,
            leaf: None,
            edges: Vec::new(),
            watch: WatchCh::new(),
        }
    }

    /// Shallow copy: same prefix, leaf and children, fresh watch channel.
    pub(crate) fn copy(&self) -> Self {
        Self {
            prefix: self.prefix.clone(),
            leaf: self.leaf.clone(),
            edges: self.edges.clone(),
            watch: WatchCh::new(),
        }
    }

    pub(crate) fn edge_index(&self, label: u8) -> Result<usize, usize> {
        self.edges.binary_search_by_key(&label, |e| e.label)
    }

    pub(crate) fn child(&self, label: u8) -> Option<&Arc<Node<V>>> {
        self.edge_index(label).ok().map(|idx| &self.edges[idx].node)
    }

    pub(crate) fn add_edge(&mut self, node: Node<V>) {
        let label = node.prefix[0];
        let edge = Edge {
            label,
            node: Arc::new(node),
        };
        match self.edge_index(label) {
            Ok(idx) => self.edges[idx] = edge,
            Err(idx) => self.edges.insert(idx, edge),
        }
    }
}

pub(crate) fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_prefix_len() {
        assert_eq!(common_prefix_len(b"abc", b"abd"), 2);
        assert_eq!(common_prefix_len(b"abc", b"abc"), 3);
        assert_eq!(common_prefix_len(b"", b"abc"), 0);
        assert_eq!(common_prefix_len(b"xyz", b"abc"), 0);
    }

    #[test]
    fn test_edges_stay_sorted() {
        let mut node: Node<u32> = Node::empty();
        node.add_edge(Node::with_prefix(b"m".to_vec()));
        node.add_edge(Node::with_prefix(b"a".to_vec()));
        node.add_edge(Node::with_prefix(b"z".to_vec()));

        let labels: Vec<u8> = node.edges.iter().map(|e| e.label).collect();
        assert_eq!(labels, b"amz".to_vec());
        assert!(node.child(b'm').is_some());
        assert!(node.child(b'q').is_none());
    }

    #[test]
    fn test_copy_shares_children_with_new_watch() {
        let mut node: Node<u32> = Node::empty();
        node.add_edge(Node::with_prefix(b"k".to_vec()));
        let copy = node.copy();

        assert!(Arc::ptr_eq(&node.edges[0].node, &copy.edges[0].node));
        assert!(!node.watch.same_channel(&copy.watch));
    }
}
