//! Schema-mount resolution
//!
//! Beneath a mount point, absolute paths anchor at a virtual root whose only
//! child is the mount point, and prefixes resolve through the mounted module
//! set before the global one. Name functions need no interception: every
//! node already knows the module that defines it.

use crate::schema::{ModuleId, SchemaId, SchemaIndex};
use crate::tree::{DataTree, NodeId};
use crate::xpath::{Document, XNode};

/// Data instance of the nearest mount point strictly above `node`
pub fn mount_point_of(doc: &Document<'_>, node: XNode) -> Option<NodeId> {
    let schema_id = doc.schema_of(node)?;
    let mount = doc.schema.nearest_mount(schema_id)?;

    let mut cur = match node {
        XNode::Node(id) | XNode::Item(id, _) => doc.tree.parent(id),
        XNode::Phantom { parent, .. } => Some(parent),
        XNode::MountRoot(_) => None,
    };
    while let Some(id) = cur {
        if doc.tree.schema_of(id) == mount {
            return Some(id);
        }
        cur = doc.tree.parent(id);
    }
    None
}

/// Node that `/` denotes when evaluating in the context of `node`
pub fn absolute_root(doc: &Document<'_>, node: XNode) -> XNode {
    match mount_point_of(doc, node) {
        Some(mount) => XNode::MountRoot(mount),
        None => XNode::Node(DataTree::ROOT),
    }
}

/// Resolve a prefix in the scope of a schema node
///
/// Module names are accepted too, as JSON-encoded data uses them.
pub fn resolve_prefix(schema: &SchemaIndex, scope: SchemaId, prefix: &str) -> Option<ModuleId> {
    let mounted = schema
        .nearest_mount(scope)
        .and_then(|m| schema.mounted_modules(m))
        .and_then(|mods| mods.prefixes.get(prefix).copied());

    mounted
        .or_else(|| schema.module_by_prefix(prefix))
        .or_else(|| schema.module_by_name(prefix))
}

pub fn local_name(doc: &Document<'_>, node: XNode) -> String {
    doc.name(node)
        .map(|(_, name)| name.to_string())
        .unwrap_or_default()
}

pub fn namespace_uri(doc: &Document<'_>, node: XNode) -> String {
    doc.name(node)
        .map(|(module, _)| doc.schema.module(module).namespace.clone())
        .unwrap_or_default()
}

/// `prefix:local` as returned by `name()`
pub fn qualified_name(doc: &Document<'_>, node: XNode) -> String {
    doc.name(node)
        .map(|(module, name)| format!("{}:{}", doc.schema.module(module).prefix, name))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{LeafType, SchemaBuilder};
    use crate::tree::NodeKind;

    #[test]
    fn test_mounted_nodes_anchor_at_mount_root() {
        let mut b = SchemaBuilder::new();
        b.module("outer", "o", "urn:outer");
        b.module("inner", "in", "urn:inner");
        b.module("shadow", "sh", "urn:shadow");
        let mp = b.container(b.root(), "o:schemaMount");
        b.mount_point(mp, &["inner"]);
        let inner = b.container(mp, "in:classifiers");
        let leaf = b.leaf(inner, "name", LeafType::String);
        let outside = b.leaf(b.root(), "o:flag", LeafType::Boolean);
        let schema = b.build().unwrap();

        let mut tree = DataTree::new();
        let m = tree.add(DataTree::ROOT, mp, NodeKind::container());
        let c = tree.add(m, inner, NodeKind::container());
        let l = tree.add(c, leaf, NodeKind::Leaf { value: "x".into() });
        let f = tree.add(
            DataTree::ROOT,
            outside,
            NodeKind::Leaf {
                value: true.into(),
            },
        );
        let doc = Document::new(&schema, &tree);

        assert_eq!(absolute_root(&doc, XNode::Node(l)), XNode::MountRoot(m));
        assert_eq!(absolute_root(&doc, XNode::Node(m)), doc.root());
        assert_eq!(absolute_root(&doc, XNode::Node(f)), doc.root());
        assert_eq!(namespace_uri(&doc, XNode::Node(l)), "urn:inner");
        assert_eq!(local_name(&doc, XNode::Node(l)), "name");
        assert_eq!(qualified_name(&doc, XNode::Node(c)), "in:classifiers");
        assert_eq!(local_name(&doc, XNode::MountRoot(m)), "");

        assert!(resolve_prefix(&schema, leaf, "in").is_some());
        assert!(resolve_prefix(&schema, leaf, "sh").is_some());
        assert_eq!(resolve_prefix(&schema, leaf, "zz"), None);
    }
}
