//! Graphviz export for diagnostics
//!
//! Output is a pure function of the tree shape: node ids follow depth-first
//! order, edges are visited in label order, and nothing about the stored
//! values is printed.

use super::node::Node;
use super::tree::Tree;

impl<V> Tree<V> {
    /// Renders the tree as a standalone `digraph`.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph G {\n");
        write_nodes(&mut out, self.root(), "n");
        out.push_str("}\n");
        out
    }

    /// Appends the tree as a `subgraph` named `name` to `out`.
    ///
    /// `id_prefix` keeps node ids unique when several trees share a document.
    pub fn write_dot_subgraph(&self, out: &mut String, name: &str, id_prefix: &str) {
        out.push_str(&format!("  subgraph \"cluster_{}\" {{\n", escape(name.as_bytes())));
        out.push_str(&format!("  label=\"{}\";\n", escape(name.as_bytes())));
        write_nodes(out, self.root(), id_prefix);
        out.push_str("  }\n");
    }
}

fn write_nodes<V>(out: &mut String, root: &Node<V>, id_prefix: &str) {
    let mut next_id = 0;
    visit(out, root, None, id_prefix, &mut next_id);
}

fn visit<V>(
    out: &mut String,
    node: &Node<V>,
    parent: Option<usize>,
    id_prefix: &str,
    next_id: &mut usize,
) {
    let id = *next_id;
    *next_id += 1;

    let mut label = if parent.is_none() {
        "<root>".to_string()
    } else {
        escape(&node.prefix)
    };
    let shape = match &node.leaf {
        Some(leaf) => {
            label.push_str("\\nkey=");
            label.push_str(&escape(leaf.key()));
            ", shape=box"
        }
        None => "",
    };
    out.push_str(&format!("  {}{} [label=\"{}\"{}];\n", id_prefix, id, label, shape));

    if let Some(parent) = parent {
        out.push_str(&format!(
            "  {}{} -> {}{} [label=\"{}\"];\n",
            id_prefix,
            parent,
            id_prefix,
            id,
            escape(&node.prefix[..1])
        ));
    }

    for edge in &node.edges {
        visit(out, &edge.node, Some(id), id_prefix, next_id);
    }
}

/// Printable ASCII passes through; quotes and backslashes are escaped and
/// every other byte is written as `\xNN`.
fn escape(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\\\x{:02x}", b)),
        }
    }
    out
}
