//! Read-only handles into a data tree

use crate::report;
use crate::schema::{SchemaId, SchemaIndex, SchemaKind, Value};
use crate::tree::data_tree::DataTree;
use crate::tree::json;
use crate::tree::node::NodeId;
use crate::xpath::{Document, XNode};

/// A node together with the schema and tree it belongs to
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    schema: &'a SchemaIndex,
    tree: &'a DataTree,
    node: XNode,
}

impl<'a> NodeRef<'a> {
    pub fn new(schema: &'a SchemaIndex, tree: &'a DataTree, node: XNode) -> Self {
        Self { schema, tree, node }
    }

    pub fn node(&self) -> XNode {
        self.node
    }

    pub fn schema_id(&self) -> Option<SchemaId> {
        self.doc().schema_of(self.node)
    }

    pub fn kind(&self) -> Option<SchemaKind> {
        self.schema_id().map(|s| self.schema.node(s).kind)
    }

    /// Local name; empty for the document root
    pub fn name(&self) -> &'a str {
        self.doc().name(self.node).map_or("", |(_, name)| name)
    }

    /// Value of a leaf or leaf-list item
    pub fn value(&self) -> Option<&'a Value> {
        self.doc().value(self.node)
    }

    pub fn children(&self) -> Vec<NodeRef<'a>> {
        self.doc()
            .children(self.node)
            .into_iter()
            .map(|n| NodeRef::new(self.schema, self.tree, n))
            .collect()
    }

    /// First child with the given local name
    pub fn child(&self, name: &str) -> Option<NodeRef<'a>> {
        self.children().into_iter().find(|c| c.name() == name)
    }

    /// Instance identifier of this node
    pub fn path(&self) -> String {
        report::instance_path(&self.doc(), self.node)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self.node {
            XNode::Node(id) if id == DataTree::ROOT => json::render(self.schema, self.tree),
            XNode::Node(id) => json::render_node(self.schema, self.tree, id),
            XNode::Item(..) => self
                .value()
                .map_or(serde_json::Value::Null, Value::to_json),
            XNode::Phantom { .. } | XNode::MountRoot(_) => serde_json::Value::Null,
        }
    }

    pub fn node_id(&self) -> Option<NodeId> {
        match self.node {
            XNode::Node(id) | XNode::Item(id, _) => Some(id),
            XNode::Phantom { .. } | XNode::MountRoot(_) => None,
        }
    }

    fn doc(&self) -> Document<'a> {
        Document::new(self.schema, self.tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{LeafType, SchemaBuilder};
    use crate::tree::{apply, EditDiff, EditNode};

    #[test]
    fn test_navigate_entries_and_items() {
        let mut b = SchemaBuilder::new();
        b.module("m", "m", "urn:m");
        let top = b.container(b.root(), "m:top");
        let list = b.list(top, "item", &["id"]);
        b.leaf(list, "id", LeafType::Int);
        b.leaf_list(top, "tag", LeafType::String);
        let schema = b.build().unwrap();

        let diff = EditDiff::new().with_node(
            EditNode::new("m:top")
                .child(EditNode::new("item").child(EditNode::leaf("id", 4i64)))
                .child(EditNode::leaf("tag", "x")),
        );
        let (tree, _) = apply(DataTree::new(), &schema, &diff).unwrap();

        let root = NodeRef::new(&schema, &tree, XNode::Node(DataTree::ROOT));
        let top = root.child("top").unwrap();
        let item = top.child("item").unwrap();
        assert_eq!(item.path(), "/m:top/m:item[id='4']");
        assert_eq!(item.child("id").unwrap().value(), Some(&Value::Int(4)));
        assert_eq!(item.kind(), Some(SchemaKind::List));
        assert_eq!(top.child("tag").unwrap().to_json(), serde_json::json!("x"));
        assert_eq!(item.to_json(), serde_json::json!({"id": 4}));
        assert_eq!(root.name(), "");
    }
}
