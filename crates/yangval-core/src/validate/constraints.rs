//! `when` and `must` evaluation over touched and impacted nodes
//!
//! Directly touched nodes are checked first in document order, then the
//! impact set in its own document order. The first false constraint fails
//! the check.

use std::collections::BTreeSet;

use crate::deps::{ConstraintRef, ExprRef};
use crate::errors::Result;
use crate::report;
use crate::schema::SchemaIndex;
use crate::tree::{ChangeSet, DataTree, NodeId, NodeKind, TouchKind, Touched};
use crate::validate::defaults::context_node;
use crate::xpath::{Document, Evaluator, XNode};

/// Check `when` on touched ancestors-or-self, created subtrees and
/// impacted owners
pub(crate) fn check_when(
    schema: &SchemaIndex,
    tree: &DataTree,
    changes: &ChangeSet,
    impacted: &[(XNode, ExprRef)],
) -> Result<()> {
    let doc = Document::new(schema, tree);

    let mut direct = Vec::new();
    for t in live_touches(tree, changes) {
        let mut cur = Some(t.node);
        while let Some(id) = cur {
            if id == DataTree::ROOT {
                break;
            }
            direct.push(context_node(tree, id));
            cur = tree.data_parent(id);
        }
        if t.kind == TouchKind::Created {
            direct.extend(data_nodes(tree, t.node).map(|id| context_node(tree, id)));
        }
    }
    doc.sort_nodes(&mut direct);

    let targets = direct
        .into_iter()
        .flat_map(|node| governing_whens(&doc, node))
        .chain(impacted.iter().copied().filter(|(_, e)| e.constraint == ConstraintRef::When));

    evaluate(doc, targets)
}

/// Check `must` on touched nodes and their subtrees, then impacted owners
pub(crate) fn check_must(
    schema: &SchemaIndex,
    tree: &DataTree,
    changes: &ChangeSet,
    impacted: &[(XNode, ExprRef)],
) -> Result<()> {
    let doc = Document::new(schema, tree);

    let mut direct = Vec::new();
    for t in live_touches(tree, changes) {
        for id in data_nodes(tree, t.node) {
            match &tree.node(id).kind {
                NodeKind::LeafList { values } => {
                    direct.extend((0..values.len() as u32).map(|i| XNode::Item(id, i)));
                }
                _ => direct.push(XNode::Node(id)),
            }
        }
    }
    doc.sort_nodes(&mut direct);

    let targets = direct
        .into_iter()
        .flat_map(|node| {
            doc.schema_of(node).into_iter().flat_map(move |owner| {
                (0..schema.node(owner).musts.len()).map(move |i| {
                    (
                        node,
                        ExprRef {
                            owner,
                            constraint: ConstraintRef::Must(i),
                        },
                    )
                })
            })
        })
        .chain(
            impacted
                .iter()
                .copied()
                .filter(|(_, e)| matches!(e.constraint, ConstraintRef::Must(_))),
        );

    evaluate(doc, targets)
}

/// The `when`s deciding whether `node` may exist: those of its enclosing
/// choices and cases, outermost first, then its own
fn governing_whens(doc: &Document<'_>, node: XNode) -> Vec<(XNode, ExprRef)> {
    let Some(sid) = doc.schema_of(node) else {
        return Vec::new();
    };
    let schema = doc.schema;
    schema
        .choice_chain(sid)
        .into_iter()
        .flat_map(|(choice, case)| [choice, case])
        .chain(std::iter::once(sid))
        .filter(|&owner| schema.node(owner).when.is_some())
        .map(|owner| {
            (
                node,
                ExprRef {
                    owner,
                    constraint: ConstraintRef::When,
                },
            )
        })
        .collect()
}

/// Created and modified nodes that survived the default pass
fn live_touches<'c>(
    tree: &'c DataTree,
    changes: &'c ChangeSet,
) -> impl Iterator<Item = &'c Touched> + 'c {
    changes
        .touched
        .iter()
        .filter(|t| t.kind != TouchKind::Deleted)
        .filter(move |t| tree.is_attached(t.node))
}

/// `from` and every node under it, wrappers skipped
fn data_nodes(tree: &DataTree, from: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    tree.preorder(from)
        .into_iter()
        .filter(move |&id| !tree.node(id).kind.is_wrapper())
}

fn evaluate(doc: Document<'_>, targets: impl Iterator<Item = (XNode, ExprRef)>) -> Result<()> {
    let mut seen = BTreeSet::new();
    let mut evaluated = 0usize;

    for (node, expr) in targets {
        if !seen.insert((node, expr)) || !attached(&doc, node) {
            continue;
        }
        let owner = doc.schema.node(expr.owner);
        let constraint = match expr.constraint {
            ConstraintRef::When => owner.when.as_ref(),
            ConstraintRef::Must(i) => owner.musts.get(i),
        };
        let Some(constraint) = constraint else {
            continue;
        };

        // a choice or case is not a data node; its `when` reads from the
        // data parent and failures are reported at the member node
        let context = if owner.kind.is_data() {
            node
        } else {
            data_parent(&doc, node)
        };

        evaluated += 1;
        if Evaluator::new(doc, context).evaluate_bool(&constraint.expr, context) {
            continue;
        }

        tracing::debug!(
            node = %report::instance_path(&doc, node),
            expr = constraint.expr.text(),
            evaluated,
            "constraint failed"
        );
        return Err(match expr.constraint {
            ConstraintRef::When => report::when_violation(&doc, node, constraint),
            ConstraintRef::Must(_) => report::must_violation(&doc, node, constraint),
        });
    }

    tracing::trace!(evaluated, "constraints satisfied");
    Ok(())
}

fn data_parent(doc: &Document<'_>, node: XNode) -> XNode {
    match node {
        XNode::Node(id) | XNode::Item(id, _) => doc.tree.data_parent(id).map_or(node, XNode::Node),
        other => other,
    }
}

fn attached(doc: &Document<'_>, node: XNode) -> bool {
    match node {
        XNode::Node(id) | XNode::Item(id, _) | XNode::MountRoot(id) => doc.tree.is_attached(id),
        XNode::Phantom { .. } => false,
    }
}
