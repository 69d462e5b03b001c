//! When-driven default instantiation and removal
//!
//! Each pass scans the whole candidate: nodes whose `when` is false are
//! removed (unless the edit supplied them or something beneath them), then
//! missing defaults are instantiated wherever their `when` holds. Passes
//! repeat until one changes nothing.

use crate::errors::{Result, ValidationError};
use crate::schema::{SchemaId, SchemaIndex, SchemaKind};
use crate::tree::{ChangeSet, DataTree, NodeId, NodeKind, TouchKind};
use crate::xpath::{Document, Evaluator, XNode};

pub(crate) fn run(
    schema: &SchemaIndex,
    tree: &mut DataTree,
    changes: &mut ChangeSet,
    max_passes: usize,
) -> Result<()> {
    for pass in 1..=max_passes {
        let removed = remove_when_false(schema, tree, changes);
        let created = instantiate(schema, tree, changes, DataTree::ROOT, DataTree::ROOT, SchemaIndex::ROOT);
        tracing::trace!(pass, removed, created, "default pass");
        if removed == 0 && created == 0 {
            return Ok(());
        }
    }
    Err(ValidationError::DefaultPassDiverged { passes: max_passes })
}

/// Whether `node`'s own `when` holds; nodes without one always exist
pub(crate) fn when_holds(schema: &SchemaIndex, tree: &DataTree, node: XNode) -> bool {
    let doc = Document::new(schema, tree);
    let Some(sid) = doc.schema_of(node) else {
        return true;
    };
    match &schema.node(sid).when {
        Some(when) => Evaluator::new(doc, node).evaluate_bool(&when.expr, node),
        None => true,
    }
}

/// Whether the `when` of a choice or case holds under `data_parent`, the
/// node it is evaluated at
pub(crate) fn wrapper_when_holds(
    schema: &SchemaIndex,
    tree: &DataTree,
    wrapper: SchemaId,
    data_parent: NodeId,
) -> bool {
    match &schema.node(wrapper).when {
        Some(when) => {
            let doc = Document::new(schema, tree);
            let context = XNode::Node(data_parent);
            Evaluator::new(doc, context).evaluate_bool(&when.expr, context)
        }
        None => true,
    }
}

/// XPath node a constraint on `id` is evaluated at
pub(crate) fn context_node(tree: &DataTree, id: NodeId) -> XNode {
    match &tree.node(id).kind {
        NodeKind::LeafList { .. } => XNode::Item(id, 0),
        _ => XNode::Node(id),
    }
}

fn remove_when_false(schema: &SchemaIndex, tree: &mut DataTree, changes: &mut ChangeSet) -> usize {
    let doomed: Vec<NodeId> = tree
        .preorder(DataTree::ROOT)
        .into_iter()
        .filter(|&id| id != DataTree::ROOT && !matches!(tree.node(id).kind, NodeKind::List { .. }))
        .filter(|&id| schema.node(tree.schema_of(id)).when.is_some())
        .filter(|&id| !node_when_holds(schema, tree, id))
        .filter(|&id| {
            !tree
                .preorder(id)
                .iter()
                .any(|n| changes.supplied.contains(n))
        })
        .collect();

    let mut removed = 0;
    for id in doomed {
        // gone with an ancestor already
        if !tree.is_attached(id) {
            continue;
        }
        tracing::debug!(
            node = %schema.schema_path(tree.schema_of(id)),
            "removing node whose when condition is false"
        );
        if tree.node(id).kind.is_wrapper() {
            for child in tree.child_nodes(id) {
                changes.record(tree, child, TouchKind::Deleted);
            }
        } else {
            changes.record(tree, id, TouchKind::Deleted);
        }
        tree.detach(id);
        removed += 1;
    }
    removed
}

/// `when` of a data node, or of a choice or case wrapper at its data parent
fn node_when_holds(schema: &SchemaIndex, tree: &DataTree, id: NodeId) -> bool {
    match tree.node(id).kind {
        NodeKind::Choice { .. } | NodeKind::Case { .. } => match tree.data_parent(id) {
            Some(parent) => wrapper_when_holds(schema, tree, tree.schema_of(id), parent),
            None => true,
        },
        _ => when_holds(schema, tree, context_node(tree, id)),
    }
}

/// Fill missing defaults below `holder`
///
/// `holder` is where new children are linked (a container, entry or case
/// node); `data_parent` is the node they appear under in paths.
fn instantiate(
    schema: &SchemaIndex,
    tree: &mut DataTree,
    changes: &mut ChangeSet,
    holder: NodeId,
    data_parent: NodeId,
    holder_schema: SchemaId,
) -> usize {
    let mut created = 0;
    for &child in &schema.node(holder_schema).children {
        let node = schema.node(child);
        match node.kind {
            SchemaKind::Leaf | SchemaKind::LeafList => {
                if node.defaults.is_empty() || tree.find_child(data_parent, child).is_some() {
                    continue;
                }
                if !phantom_exists(schema, tree, data_parent, child) {
                    continue;
                }
                let values: Vec<_> = node
                    .defaults
                    .iter()
                    .filter_map(|d| schema.parse_value(child, d).ok())
                    .collect();
                let kind = if node.kind == SchemaKind::Leaf {
                    match values.into_iter().next() {
                        Some(value) => NodeKind::Leaf { value },
                        None => continue,
                    }
                } else {
                    NodeKind::LeafList { values }
                };
                let id = tree.add(holder, child, kind);
                changes.record(tree, id, TouchKind::Created);
                created += 1;
            }
            SchemaKind::Container => match tree.find_child(data_parent, child) {
                Some(existing) => {
                    created += instantiate(schema, tree, changes, existing, existing, child);
                }
                None => {
                    if node.presence
                        || !node.has_defaults
                        || !phantom_exists(schema, tree, data_parent, child)
                    {
                        continue;
                    }
                    let id = tree.add(holder, child, NodeKind::container());
                    let inner = instantiate(schema, tree, changes, id, id, child);
                    if inner == 0 {
                        tree.detach(id);
                        continue;
                    }
                    changes.record(tree, id, TouchKind::Created);
                    created += inner + 1;
                }
            },
            SchemaKind::List => {
                if let Some(wrapper) = tree.find_child(data_parent, child) {
                    for entry in tree.held(wrapper).to_vec() {
                        created += instantiate(schema, tree, changes, entry, entry, child);
                    }
                }
            }
            SchemaKind::Choice => {
                if !wrapper_when_holds(schema, tree, child, data_parent) {
                    continue;
                }
                let active = tree
                    .find_choice(holder, child)
                    .and_then(|w| tree.held(w).first().copied());
                match (active, node.default_case) {
                    (Some(case), _) => {
                        let case_schema = tree.schema_of(case);
                        if wrapper_when_holds(schema, tree, case_schema, data_parent) {
                            created +=
                                instantiate(schema, tree, changes, case, data_parent, case_schema);
                        }
                    }
                    (None, Some(default_case))
                        if schema.node(default_case).has_defaults
                            && wrapper_when_holds(schema, tree, default_case, data_parent) =>
                    {
                        let wrapper = tree.add(holder, child, NodeKind::Choice { case: None });
                        let case = tree.add(wrapper, default_case, NodeKind::Case { children: vec![] });
                        let inner =
                            instantiate(schema, tree, changes, case, data_parent, default_case);
                        if inner == 0 {
                            tree.detach(case);
                        }
                        created += inner;
                    }
                    (None, _) => {}
                }
            }
            SchemaKind::Case | SchemaKind::Opaque => {}
        }
    }
    created
}

/// Evaluate the `when` of a node that does not exist yet
fn phantom_exists(schema: &SchemaIndex, tree: &DataTree, parent: NodeId, child: SchemaId) -> bool {
    when_holds(
        schema,
        tree,
        XNode::Phantom {
            parent,
            schema: child,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{LeafType, SchemaBuilder};
    use crate::tree::{apply, EditDiff, EditNode};

    struct Fixture {
        schema: SchemaIndex,
        traps: SchemaId,
        mybits: SchemaId,
    }

    fn fixture() -> Fixture {
        let mut b = SchemaBuilder::new();
        b.module("ietf-interfaces", "if", "urn:ietf:params:xml:ns:yang:ietf-interfaces");
        let top = b.container(b.root(), "if:interfaces");
        let list = b.list(top, "interface", &["name"]);
        b.leaf(list, "name", LeafType::String);
        b.leaf(list, "type", LeafType::enumeration(&["fastdsl", "ptm"]));
        let traps = b.container(list, "traps");
        b.when(traps, "../type = 'fastdsl'");
        let enabled = b.leaf(traps, "enabled", LeafType::Boolean);
        b.default_value(enabled, "true");
        let mybits = b.leaf(list, "mybits", LeafType::bits(&["a", "b"]));
        b.default_value(mybits, "a");
        Fixture {
            schema: b.build().unwrap(),
            traps,
            mybits,
        }
    }

    fn edit(ty: &str) -> EditDiff {
        EditDiff::new().with_node(
            EditNode::new("if:interfaces").child(
                EditNode::new("interface")
                    .child(EditNode::leaf("name", "eth0"))
                    .child(EditNode::leaf("type", ty)),
            ),
        )
    }

    fn settle(f: &Fixture, tree: DataTree, diff: EditDiff) -> (DataTree, ChangeSet) {
        let (mut tree, mut changes) = apply(tree, &f.schema, &diff).unwrap();
        run(&f.schema, &mut tree, &mut changes, 8).unwrap();
        (tree, changes)
    }

    fn entry(tree: &DataTree) -> NodeId {
        let top = tree.held(DataTree::ROOT)[0];
        let list = tree.held(top)[0];
        tree.held(list)[0]
    }

    #[test]
    fn test_when_gated_default_follows_condition() {
        let f = fixture();
        let (tree, _) = settle(&f, DataTree::new(), edit("fastdsl"));
        let e = entry(&tree);
        assert!(tree.find_child(e, f.traps).is_some());
        assert!(tree.find_child(e, f.mybits).is_some());

        let (tree, changes) = settle(&f, tree, edit("ptm"));
        let e = entry(&tree);
        assert_eq!(tree.find_child(e, f.traps), None);
        assert!(tree.find_child(e, f.mybits).is_some());
        assert!(changes
            .touched
            .iter()
            .any(|t| t.schema == f.traps && t.kind == TouchKind::Deleted));
    }

    #[test]
    fn test_false_when_default_is_never_created() {
        let f = fixture();
        let (tree, changes) = settle(&f, DataTree::new(), edit("ptm"));
        assert_eq!(tree.find_child(entry(&tree), f.traps), None);
        assert!(!changes.touched.iter().any(|t| t.schema == f.traps));
    }

    #[test]
    fn test_supplied_node_is_left_for_when_check() {
        let f = fixture();
        let diff = EditDiff::new().with_node(
            EditNode::new("if:interfaces").child(
                EditNode::new("interface")
                    .child(EditNode::leaf("name", "eth0"))
                    .child(EditNode::leaf("type", "ptm"))
                    .child(EditNode::new("traps").child(EditNode::leaf("enabled", false))),
            ),
        );
        let (tree, _) = settle(&f, DataTree::new(), diff);
        assert!(tree.find_child(entry(&tree), f.traps).is_some());
    }

    #[test]
    fn test_pass_cap_is_enforced() {
        let mut b = SchemaBuilder::new();
        b.module("m", "m", "urn:m");
        let top = b.container(b.root(), "m:top");
        let flip = b.leaf(top, "flip", LeafType::String);
        b.default_value(flip, "x");
        b.when(flip, "not(../flip)");
        b.leaf(top, "anchor", LeafType::String);
        let schema = b.build().unwrap();

        let diff = EditDiff::new()
            .with_node(EditNode::new("m:top").child(EditNode::leaf("anchor", "a")));
        let (mut tree, mut changes) = apply(DataTree::new(), &schema, &diff).unwrap();
        assert_eq!(
            run(&schema, &mut tree, &mut changes, 4),
            Err(ValidationError::DefaultPassDiverged { passes: 4 })
        );
    }
}
