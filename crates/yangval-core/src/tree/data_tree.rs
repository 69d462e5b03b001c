//! Arena-backed configuration tree
//!
//! Nodes are addressed by `NodeId` and never move. Removing a subtree only
//! unlinks it from its holder; unreachable slots are dropped by
//! `compacted()` when a candidate is promoted.

use crate::schema::{SchemaId, SchemaIndex, Value};
use crate::tree::node::{DataNode, NodeId, NodeKind};

#[derive(Debug, Clone, PartialEq)]
pub struct DataTree {
    nodes: Vec<DataNode>,
}

impl Default for DataTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DataTree {
    pub const ROOT: NodeId = NodeId(0);

    pub fn new() -> Self {
        Self {
            nodes: vec![DataNode {
                schema: SchemaIndex::ROOT,
                parent: None,
                kind: NodeKind::container(),
            }],
        }
    }

    pub fn node(&self, id: NodeId) -> &DataNode {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut DataNode {
        &mut self.nodes[id.index()]
    }

    pub fn schema_of(&self, id: NodeId) -> SchemaId {
        self.node(id).schema
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Nodes directly held by `id`, wrappers included
    pub fn held(&self, id: NodeId) -> &[NodeId] {
        match &self.node(id).kind {
            NodeKind::Container { children }
            | NodeKind::Entry { children }
            | NodeKind::Case { children } => children,
            NodeKind::List { entries } => entries,
            NodeKind::Choice { case } => case.as_slice(),
            NodeKind::LeafList { .. } | NodeKind::Leaf { .. } | NodeKind::Opaque { .. } => &[],
        }
    }

    /// Children with choice and case flattened away; lists and leaf-lists
    /// stay as their wrapper node
    pub fn child_nodes(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_child_nodes(id, &mut out);
        out
    }

    fn collect_child_nodes(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for &child in self.held(id) {
            match self.node(child).kind {
                NodeKind::Choice { .. } | NodeKind::Case { .. } => {
                    self.collect_child_nodes(child, out)
                }
                _ => out.push(child),
            }
        }
    }

    /// Parent as seen by paths: list, choice and case wrappers are skipped
    pub fn data_parent(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            if !self.node(p).kind.is_wrapper() {
                return Some(p);
            }
            cur = self.parent(p);
        }
        None
    }

    pub fn find_child(&self, parent: NodeId, schema: SchemaId) -> Option<NodeId> {
        self.child_nodes(parent)
            .into_iter()
            .find(|&c| self.schema_of(c) == schema)
    }

    /// The choice wrapper for `choice` held directly by `holder`
    pub fn find_choice(&self, holder: NodeId, choice: SchemaId) -> Option<NodeId> {
        self.held(holder)
            .iter()
            .copied()
            .find(|&c| self.schema_of(c) == choice)
    }

    pub fn leaf_value(&self, id: NodeId) -> Option<&Value> {
        match &self.node(id).kind {
            NodeKind::Leaf { value } => Some(value),
            _ => None,
        }
    }

    pub fn child_value(&self, parent: NodeId, schema: SchemaId) -> Option<&Value> {
        self.find_child(parent, schema)
            .and_then(|c| self.leaf_value(c))
    }

    /// Entry of `list` whose key leaves equal `keys`
    pub fn find_entry(&self, list: NodeId, keys: &[(SchemaId, Value)]) -> Option<NodeId> {
        self.held(list).iter().copied().find(|&entry| {
            keys.iter()
                .all(|(k, v)| self.child_value(entry, *k) == Some(v))
        })
    }

    /// Link a new node under `holder`
    ///
    /// Container, entry and case children are kept in schema order, list
    /// entries in insertion order. A choice holds at most one case.
    pub(crate) fn add(&mut self, holder: NodeId, schema: SchemaId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(DataNode {
            schema,
            parent: Some(holder),
            kind,
        });

        let positions: Vec<SchemaId> = self.held(holder).iter().map(|&c| self.schema_of(c)).collect();
        match &mut self.nodes[holder.index()].kind {
            NodeKind::Container { children }
            | NodeKind::Entry { children }
            | NodeKind::Case { children } => {
                let at = positions
                    .iter()
                    .position(|s| *s > schema)
                    .unwrap_or(children.len());
                children.insert(at, id);
            }
            NodeKind::List { entries } => entries.push(id),
            NodeKind::Choice { case } => *case = Some(id),
            NodeKind::LeafList { .. } | NodeKind::Leaf { .. } | NodeKind::Opaque { .. } => {
                tracing::error!(holder = holder.0, "attempted to add a child under a terminal node");
            }
        }
        id
    }

    /// Unlink a subtree; wrappers left empty are unlinked too
    pub(crate) fn detach(&mut self, id: NodeId) {
        let Some(holder) = self.parent(id) else {
            return;
        };
        self.nodes[id.index()].parent = None;

        let now_empty = match &mut self.nodes[holder.index()].kind {
            NodeKind::Container { children } | NodeKind::Entry { children } => {
                children.retain(|&c| c != id);
                false
            }
            NodeKind::Case { children } => {
                children.retain(|&c| c != id);
                children.is_empty()
            }
            NodeKind::List { entries } => {
                entries.retain(|&c| c != id);
                entries.is_empty()
            }
            NodeKind::Choice { case } => {
                *case = None;
                true
            }
            _ => false,
        };

        if now_empty {
            self.detach(holder);
        }
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut cur = id;
        loop {
            if cur == Self::ROOT {
                return true;
            }
            match self.parent(cur) {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    /// All nodes under `from` (inclusive) in document order, wrappers
    /// included
    pub fn preorder(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.held(next).iter().rev().copied());
        }
        out
    }

    /// Holder-relative positions from the root; sorts in document order
    pub fn position_path(&self, id: NodeId) -> Vec<u32> {
        let mut path = Vec::new();
        let mut cur = id;
        while let Some(p) = self.parent(cur) {
            let pos = self
                .held(p)
                .iter()
                .position(|&c| c == cur)
                .unwrap_or(usize::MAX);
            path.push(pos as u32);
            cur = p;
        }
        path.reverse();
        path
    }

    /// Number of reachable nodes, wrappers included
    pub fn len(&self) -> usize {
        self.preorder(Self::ROOT).len()
    }

    pub fn is_empty(&self) -> bool {
        self.held(Self::ROOT).is_empty()
    }

    /// Copy of the tree holding only reachable nodes
    pub fn compacted(&self) -> DataTree {
        let mut out = DataTree {
            nodes: Vec::with_capacity(self.nodes.len()),
        };
        out.nodes.push(DataNode {
            schema: SchemaIndex::ROOT,
            parent: None,
            kind: self.remap_kind(Self::ROOT, &[]),
        });
        self.copy_into(Self::ROOT, Self::ROOT, &mut out);
        out
    }

    fn copy_into(&self, from: NodeId, to: NodeId, out: &mut DataTree) {
        let mut mapped = Vec::new();
        for &child in self.held(from) {
            let new_id = NodeId(out.nodes.len() as u32);
            out.nodes.push(DataNode {
                schema: self.schema_of(child),
                parent: Some(to),
                kind: self.remap_kind(child, &[]),
            });
            self.copy_into(child, new_id, out);
            mapped.push(new_id);
        }
        out.nodes[to.index()].kind = self.remap_kind(from, &mapped);
    }

    fn remap_kind(&self, id: NodeId, held: &[NodeId]) -> NodeKind {
        match &self.node(id).kind {
            NodeKind::Container { .. } => NodeKind::Container {
                children: held.to_vec(),
            },
            NodeKind::Entry { .. } => NodeKind::Entry {
                children: held.to_vec(),
            },
            NodeKind::Case { .. } => NodeKind::Case {
                children: held.to_vec(),
            },
            NodeKind::List { .. } => NodeKind::List {
                entries: held.to_vec(),
            },
            NodeKind::Choice { .. } => NodeKind::Choice {
                case: held.first().copied(),
            },
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{LeafType, SchemaBuilder};

    fn setup() -> (SchemaIndex, SchemaId, SchemaId, SchemaId, SchemaId) {
        let mut b = SchemaBuilder::new();
        b.module("m", "m", "urn:m");
        let top = b.container(b.root(), "m:top");
        let list = b.list(top, "item", &["id"]);
        let id = b.leaf(list, "id", LeafType::Int);
        let flag = b.leaf(top, "flag", LeafType::Boolean);
        (b.build().unwrap(), top, list, id, flag)
    }

    #[test]
    fn test_children_kept_in_schema_order() {
        let (_schema, top, list, _, flag) = setup();
        let mut tree = DataTree::new();
        let t = tree.add(DataTree::ROOT, top, NodeKind::container());
        let f = tree.add(t, flag, NodeKind::Leaf { value: Value::Boolean(true) });
        let l = tree.add(t, list, NodeKind::List { entries: vec![] });

        assert_eq!(tree.held(t), &[l, f]);
        assert_eq!(tree.position_path(f), vec![0, 1]);
    }

    #[test]
    fn test_detach_prunes_empty_list_wrapper() {
        let (_schema, top, list, id, _) = setup();
        let mut tree = DataTree::new();
        let t = tree.add(DataTree::ROOT, top, NodeKind::container());
        let l = tree.add(t, list, NodeKind::List { entries: vec![] });
        let e = tree.add(l, list, NodeKind::Entry { children: vec![] });
        tree.add(e, id, NodeKind::Leaf { value: Value::Int(1) });

        assert_eq!(tree.find_entry(l, &[(id, Value::Int(1))]), Some(e));
        assert_eq!(tree.data_parent(e), Some(t));

        tree.detach(e);
        assert!(!tree.is_attached(e));
        assert!(!tree.is_attached(l));
        assert!(tree.held(t).is_empty());
    }

    #[test]
    fn test_compacted_drops_detached_slots() {
        let (_schema, top, _, _, flag) = setup();
        let mut tree = DataTree::new();
        let t = tree.add(DataTree::ROOT, top, NodeKind::container());
        let f = tree.add(t, flag, NodeKind::Leaf { value: Value::Boolean(true) });
        tree.detach(f);
        tree.add(t, flag, NodeKind::Leaf { value: Value::Boolean(false) });

        let compact = tree.compacted();
        assert_eq!(compact.nodes.len(), 3);
        assert_eq!(compact.len(), 3);
        let t2 = compact.held(DataTree::ROOT)[0];
        let f2 = compact.find_child(t2, flag).unwrap();
        assert_eq!(compact.leaf_value(f2), Some(&Value::Boolean(false)));
    }
}
