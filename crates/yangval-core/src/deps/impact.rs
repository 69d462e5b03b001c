//! Impact sets: constraint instances an edit may have flipped

use std::collections::BTreeSet;

use crate::config::ImpactPolicy;
use crate::deps::{DependencyGraph, ExprRef};
use crate::schema::{SchemaId, SchemaIndex, SchemaKind};
use crate::tree::{DataTree, NodeId, NodeKind, TouchKind, Touched};
use crate::xpath::{Document, XNode};

/// Owner instances whose constraints read a touched location, in document
/// order
///
/// For each reference to a touched schema node, the owner instances are
/// searched below the instance of the nearest common data ancestor of the
/// referenced node and the owner that contains the touched location. When
/// that ancestor is or sits inside a list entry, the search covers every
/// entry of the list.
/// Created and deleted subtrees touch their descendants too. Owners inside
/// a touched subtree are skipped: created ones are checked directly and
/// deleted ones are gone.
pub fn impact_set(
    schema: &SchemaIndex,
    graph: &DependencyGraph,
    tree: &DataTree,
    touched: &[Touched],
    policy: ImpactPolicy,
) -> Vec<(XNode, ExprRef)> {
    let mut found: BTreeSet<(XNode, ExprRef)> = BTreeSet::new();
    let mut skipped = 0usize;

    for t in touched {
        let mut referenced = vec![t.schema];
        if t.kind != TouchKind::Modified {
            referenced.extend(schema.data_descendants(t.schema));
        }

        for s in referenced {
            for edge in graph.dependents(s) {
                if edge.unkeyed && policy == ImpactPolicy::PreserveUnkeyedSkip {
                    skipped += 1;
                    continue;
                }
                let owner = edge.expr.owner;
                let data_owner = if schema.node(owner).kind.is_data() {
                    owner
                } else {
                    schema.data_parent(owner).unwrap_or(SchemaIndex::ROOT)
                };
                let common = anchor_schema(schema, s, data_owner);
                if common == t.schema || schema.is_ancestor(t.schema, common) {
                    continue;
                }
                let Some(anchor) = anchor_instance(tree, t.parent, common) else {
                    continue;
                };
                for instance in owner_instances(schema, tree, anchor, common, data_owner) {
                    if t.kind == TouchKind::Created && within(tree, instance, t.node) {
                        continue;
                    }
                    if data_owner == owner {
                        found.insert((instance, edge.expr));
                    } else if let Some(member) = first_member(schema, tree, instance, owner) {
                        found.insert((member, edge.expr));
                    }
                }
            }
        }
    }

    let doc = Document::new(schema, tree);
    let mut ordered: Vec<(XNode, ExprRef)> = found.into_iter().collect();
    ordered.sort_by_cached_key(|(node, expr)| (doc.order_key(*node), *expr));
    tracing::debug!(
        impacted = ordered.len(),
        skipped_unkeyed = skipped,
        "impact set computed"
    );
    ordered
}

/// Schema node whose instance bounds the search for owners of a reference
///
/// This is the nearest common data ancestor, lifted above the nearest list
/// at or above it: entries of one list can read each other through `..`,
/// so the owner in every entry is a candidate.
fn anchor_schema(schema: &SchemaIndex, referenced: SchemaId, owner: SchemaId) -> SchemaId {
    let common = schema.common_data_ancestor(referenced, owner);
    schema
        .data_ancestors_or_self(common)
        .into_iter()
        .find(|s| schema.node(*s).kind == SchemaKind::List)
        .map_or(common, |list| {
            schema.data_parent(list).unwrap_or(SchemaIndex::ROOT)
        })
}

/// First data node under `parent` that belongs to the choice or case
/// `wrapper`; the constraint of a choice or case is reported there
fn first_member(
    schema: &SchemaIndex,
    tree: &DataTree,
    parent: XNode,
    wrapper: SchemaId,
) -> Option<XNode> {
    let XNode::Node(parent) = parent else {
        return None;
    };
    tree.child_nodes(parent)
        .into_iter()
        .find(|&c| schema.is_ancestor(wrapper, tree.schema_of(c)))
        .map(|c| match &tree.node(c).kind {
            NodeKind::LeafList { .. } => XNode::Item(c, 0),
            _ => XNode::Node(c),
        })
}

fn within(tree: &DataTree, instance: XNode, subtree: NodeId) -> bool {
    let mut cur = match instance {
        XNode::Node(id) | XNode::Item(id, _) => Some(id),
        XNode::Phantom { .. } | XNode::MountRoot(_) => None,
    };
    while let Some(id) = cur {
        if id == subtree {
            return true;
        }
        cur = tree.data_parent(id);
    }
    false
}

/// The attached instance of `target` at or above `from`
fn anchor_instance(tree: &DataTree, from: NodeId, target: SchemaId) -> Option<NodeId> {
    let mut cur = Some(from);
    while let Some(id) = cur {
        if tree.schema_of(id) == target {
            return tree.is_attached(id).then_some(id);
        }
        cur = tree.data_parent(id);
    }
    None
}

/// All instances of `owner` beneath `anchor`, an instance of `anchor_schema`
fn owner_instances(
    schema: &SchemaIndex,
    tree: &DataTree,
    anchor: NodeId,
    anchor_schema: SchemaId,
    owner: SchemaId,
) -> Vec<XNode> {
    if owner == anchor_schema {
        return vec![XNode::Node(anchor)];
    }

    let mut chain: Vec<SchemaId> = schema
        .data_ancestors_or_self(owner)
        .into_iter()
        .take_while(|s| *s != anchor_schema)
        .collect();
    chain.reverse();

    let mut instances = vec![anchor];
    for (i, step) in chain.iter().enumerate() {
        let last = i + 1 == chain.len();
        let mut next = Vec::new();
        for &inst in &instances {
            let Some(child) = tree.find_child(inst, *step) else {
                continue;
            };
            match &tree.node(child).kind {
                NodeKind::List { entries } => next.extend(entries.iter().copied()),
                _ => next.push(child),
            }
        }
        if last && schema.node(owner).kind == SchemaKind::LeafList {
            return next
                .into_iter()
                .flat_map(|ll| match &tree.node(ll).kind {
                    NodeKind::LeafList { values } => {
                        (0..values.len() as u32).map(|i| XNode::Item(ll, i)).collect()
                    }
                    _ => Vec::new(),
                })
                .collect();
        }
        instances = next;
    }
    instances.into_iter().map(XNode::Node).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::ConstraintRef;
    use crate::schema::{LeafType, SchemaBuilder};
    use crate::tree::{apply, EditDiff, EditNode, EditOperation};

    struct Fixture {
        schema: SchemaIndex,
        graph: DependencyGraph,
        limit: SchemaId,
    }

    fn fixture() -> Fixture {
        let mut b = SchemaBuilder::new();
        b.module("m", "m", "urn:m");
        let top = b.container(b.root(), "m:top");
        let list = b.list(top, "item", &["id"]);
        b.leaf(list, "id", LeafType::Int);
        b.leaf(list, "name", LeafType::String);
        b.leaf_list(top, "tag", LeafType::String);
        let limit = b.leaf(top, "limit", LeafType::Int);
        b.must(limit, "../item[id = current()]/name != 'x'");
        b.must(limit, "count(../tag) < 3");
        let schema = b.build().unwrap();
        let graph = DependencyGraph::build(&schema);
        Fixture {
            schema,
            graph,
            limit,
        }
    }

    fn item(id: i64, name: &str) -> EditNode {
        EditNode::new("item")
            .child(EditNode::leaf("id", id))
            .child(EditNode::leaf("name", name))
    }

    fn base(f: &Fixture) -> DataTree {
        let diff = EditDiff::new().with_node(
            EditNode::new("m:top")
                .child(item(1, "a"))
                .child(EditNode::leaf("limit", 1i64))
                .child(EditNode::leaf("tag", "t1")),
        );
        apply(DataTree::new(), &f.schema, &diff).unwrap().0
    }

    #[test]
    fn test_modified_leaf_impacts_owner_in_common_ancestor() {
        let f = fixture();
        let diff = EditDiff::new()
            .with_node(EditNode::new("m:top").child(item(1, "x")));
        let (tree, changes) = apply(base(&f), &f.schema, &diff).unwrap();

        let impacted = impact_set(
            &f.schema,
            &f.graph,
            &tree,
            &changes.touched,
            ImpactPolicy::PreserveUnkeyedSkip,
        );
        assert_eq!(impacted.len(), 1);
        assert_eq!(impacted[0].1.owner, f.limit);
        assert_eq!(impacted[0].1.constraint, ConstraintRef::Must(0));
    }

    #[test]
    fn test_sibling_entries_of_modified_entry_are_impacted() {
        let mut b = SchemaBuilder::new();
        b.module("m", "m", "urn:m");
        let top = b.container(b.root(), "m:top");
        let list = b.list(top, "item", &["id"]);
        b.leaf(list, "id", LeafType::Int);
        b.leaf(list, "peer", LeafType::Int);
        b.leaf(list, "name", LeafType::String);
        b.must(list, "not(peer) or ../item[id = current()/peer]/name != 'x'");
        let schema = b.build().unwrap();
        let graph = DependencyGraph::build(&schema);

        let seed = EditDiff::new().with_node(
            EditNode::new("m:top")
                .child(item(1, "a").child(EditNode::leaf("peer", 2i64)))
                .child(item(2, "b")),
        );
        let tree = apply(DataTree::new(), &schema, &seed).unwrap().0;
        let diff = EditDiff::new().with_node(EditNode::new("m:top").child(item(2, "x")));
        let (tree, changes) = apply(tree, &schema, &diff).unwrap();

        let impacted = impact_set(
            &schema,
            &graph,
            &tree,
            &changes.touched,
            ImpactPolicy::PreserveUnkeyedSkip,
        );
        assert_eq!(impacted.len(), 2);
        assert!(impacted.iter().all(|(_, e)| e.owner == list));
    }

    #[test]
    fn test_removed_entry_impacts_owner() {
        let f = fixture();
        let diff = EditDiff::new().with_node(
            EditNode::new("m:top").child(item(1, "a").with_operation(EditOperation::Remove)),
        );
        let (tree, changes) = apply(base(&f), &f.schema, &diff).unwrap();
        let impacted = impact_set(
            &f.schema,
            &f.graph,
            &tree,
            &changes.touched,
            ImpactPolicy::PreserveUnkeyedSkip,
        );
        assert_eq!(impacted.len(), 1);
    }

    #[test]
    fn test_bare_leaf_list_reference_depends_on_policy() {
        let f = fixture();
        let diff = EditDiff::new()
            .with_node(EditNode::new("m:top").child(EditNode::leaf("tag", "t2")));
        let (tree, changes) = apply(base(&f), &f.schema, &diff).unwrap();

        let skipped = impact_set(
            &f.schema,
            &f.graph,
            &tree,
            &changes.touched,
            ImpactPolicy::PreserveUnkeyedSkip,
        );
        assert!(skipped.is_empty());

        let full = impact_set(&f.schema, &f.graph, &tree, &changes.touched, ImpactPolicy::Full);
        assert_eq!(full.len(), 1);
        assert_eq!(full[0].1.constraint, ConstraintRef::Must(1));
    }
}
