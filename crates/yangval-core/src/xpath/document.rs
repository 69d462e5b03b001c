//! XPath view of a `DataTree`
//!
//! List, choice and case wrappers are invisible: a list entry is a child of
//! the list's data parent, a leaf-list contributes one item node per value.

use crate::schema::{ModuleId, SchemaId, SchemaIndex, Value};
use crate::tree::{DataTree, NodeId, NodeKind};

/// A node as XPath sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum XNode {
    /// Container, list entry, leaf, opaque node, or the document root
    Node(NodeId),
    /// One value of a leaf-list
    Item(NodeId, u32),
    /// A node that does not exist yet, evaluated in place under `parent`
    Phantom { parent: NodeId, schema: SchemaId },
    /// Virtual root above a mount point; its only child is the mount point
    MountRoot(NodeId),
}

/// Sort key for document order
pub type OrderKey = (Vec<u32>, u8);

#[derive(Debug, Clone, Copy)]
pub struct Document<'a> {
    pub schema: &'a SchemaIndex,
    pub tree: &'a DataTree,
}

impl<'a> Document<'a> {
    pub fn new(schema: &'a SchemaIndex, tree: &'a DataTree) -> Self {
        Self { schema, tree }
    }

    pub fn root(&self) -> XNode {
        XNode::Node(DataTree::ROOT)
    }

    pub fn is_root(&self, node: XNode) -> bool {
        matches!(node, XNode::MountRoot(_)) || node == self.root()
    }

    /// Schema node of a named XPath node; roots have none
    pub fn schema_of(&self, node: XNode) -> Option<SchemaId> {
        match node {
            XNode::Node(id) if id == DataTree::ROOT => None,
            XNode::Node(id) | XNode::Item(id, _) => Some(self.tree.schema_of(id)),
            XNode::Phantom { schema, .. } => Some(schema),
            XNode::MountRoot(_) => None,
        }
    }

    pub fn name(&self, node: XNode) -> Option<(ModuleId, &'a str)> {
        let schema = self.schema;
        self.schema_of(node).map(|s| {
            let n = schema.node(s);
            (n.module, n.name.as_str())
        })
    }

    pub fn children(&self, node: XNode) -> Vec<XNode> {
        match node {
            XNode::Node(id) => match self.tree.node(id).kind {
                NodeKind::Container { .. } | NodeKind::Entry { .. } => {
                    let mut out = Vec::new();
                    for child in self.tree.child_nodes(id) {
                        match &self.tree.node(child).kind {
                            NodeKind::List { entries } => {
                                out.extend(entries.iter().map(|&e| XNode::Node(e)))
                            }
                            NodeKind::LeafList { values } => out.extend(
                                (0..values.len() as u32).map(|i| XNode::Item(child, i)),
                            ),
                            _ => out.push(XNode::Node(child)),
                        }
                    }
                    out
                }
                _ => Vec::new(),
            },
            XNode::MountRoot(mount) => vec![XNode::Node(mount)],
            XNode::Item(..) | XNode::Phantom { .. } => Vec::new(),
        }
    }

    pub fn parent(&self, node: XNode) -> Option<XNode> {
        match node {
            XNode::Node(id) | XNode::Item(id, _) => self.tree.data_parent(id).map(XNode::Node),
            XNode::Phantom { parent, .. } => Some(XNode::Node(parent)),
            XNode::MountRoot(_) => None,
        }
    }

    /// Typed value of a leaf or leaf-list item
    pub fn value(&self, node: XNode) -> Option<&'a Value> {
        let tree = self.tree;
        match node {
            XNode::Node(id) => tree.leaf_value(id),
            XNode::Item(id, i) => match &tree.node(id).kind {
                NodeKind::LeafList { values } => values.get(i as usize),
                _ => None,
            },
            _ => None,
        }
    }

    /// XPath string-value
    pub fn string_value(&self, node: XNode) -> String {
        match node {
            XNode::Item(..) => self.value(node).map(|v| v.to_string()).unwrap_or_default(),
            XNode::Node(id) => match &self.tree.node(id).kind {
                NodeKind::Leaf { value } => value.to_string(),
                NodeKind::Opaque { content } => match content {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                },
                _ => self
                    .children(node)
                    .into_iter()
                    .map(|c| self.string_value(c))
                    .collect(),
            },
            XNode::Phantom { schema, .. } => self
                .schema
                .node(schema)
                .defaults
                .first()
                .cloned()
                .unwrap_or_default(),
            XNode::MountRoot(mount) => self.string_value(XNode::Node(mount)),
        }
    }

    pub fn order_key(&self, node: XNode) -> OrderKey {
        match node {
            XNode::Node(id) => (self.tree.position_path(id), 1),
            XNode::MountRoot(id) => (self.tree.position_path(id), 0),
            XNode::Item(id, i) => {
                let mut path = self.tree.position_path(id);
                path.push(i);
                (path, 1)
            }
            XNode::Phantom { parent, schema } => {
                let mut path = self.tree.position_path(parent);
                path.push(u32::MAX);
                path.push(schema.0);
                (path, 1)
            }
        }
    }

    /// Sort into document order and drop duplicates
    pub fn sort_nodes(&self, nodes: &mut Vec<XNode>) {
        nodes.sort_by_cached_key(|n| self.order_key(*n));
        nodes.dedup();
    }

    /// All descendants in document order, excluding `node`
    pub fn descendants(&self, node: XNode) -> Vec<XNode> {
        let mut out = Vec::new();
        let mut stack: Vec<XNode> = self.children(node).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).into_iter().rev());
        }
        out
    }
}
