//! Error paths and constraint diagnostics
//!
//! Paths are instance identifiers from the top of the data tree. Every
//! segment is qualified with its module prefix and list entries carry one
//! `[key='value']` predicate per key, in key declaration order. Mount points
//! are crossed like any other container.

use crate::errors::{ValidationError, APP_TAG_MUST_VIOLATION};
use crate::schema::{Constraint, SchemaId, SchemaIndex, Value};
use crate::tree::{DataTree, NodeId, NodeKind, Touched};
use crate::xpath::{Document, XNode};

pub fn instance_path(doc: &Document<'_>, node: XNode) -> String {
    match node {
        XNode::Node(id) | XNode::MountRoot(id) if id == DataTree::ROOT => String::new(),
        XNode::MountRoot(mount) => parent_path(doc, mount),
        XNode::Node(id) => {
            let mut path = parent_path(doc, id);
            path.push_str(&node_segment(doc, id));
            path
        }
        XNode::Item(id, i) => {
            let mut path = parent_path(doc, id);
            path.push_str(&segment(doc.schema, doc.tree.schema_of(id)));
            if let Some(value) = doc.value(XNode::Item(id, i)) {
                path.push_str(&format!("[.={}]", quote(&value.to_string())));
            }
            path
        }
        XNode::Phantom { parent, schema } => child_path(doc, parent, schema),
    }
}

/// Path of a schema child that does not (yet) exist under `parent`
pub fn child_path(doc: &Document<'_>, parent: NodeId, child: SchemaId) -> String {
    let mut path = instance_path(doc, XNode::Node(parent));
    path.push_str(&segment(doc.schema, child));
    path
}

/// Path of a list entry identified by its key values
pub fn entry_path(
    doc: &Document<'_>,
    parent: NodeId,
    list: SchemaId,
    keys: &[(SchemaId, Value)],
) -> String {
    let mut path = child_path(doc, parent, list);
    for (key, value) in keys {
        path.push_str(&predicate(doc.schema, *key, value));
    }
    path
}

/// Path of a touched node; deleted nodes keep the path they had
pub fn touched_path(doc: &Document<'_>, touched: &Touched) -> String {
    let mut path = instance_path(doc, XNode::Node(touched.parent));
    path.push_str(&node_segment(doc, touched.node));
    path
}

/// Path of one leaf-list value under `parent`
pub fn value_path(doc: &Document<'_>, parent: NodeId, leaf_list: SchemaId, value: &Value) -> String {
    format!(
        "{}[.={}]",
        child_path(doc, parent, leaf_list),
        quote(&value.to_string())
    )
}

fn parent_path(doc: &Document<'_>, id: NodeId) -> String {
    match doc.tree.data_parent(id) {
        Some(p) => instance_path(doc, XNode::Node(p)),
        None => String::new(),
    }
}

fn node_segment(doc: &Document<'_>, id: NodeId) -> String {
    let schema_id = doc.tree.schema_of(id);
    let mut out = segment(doc.schema, schema_id);
    if let NodeKind::Entry { .. } = doc.tree.node(id).kind {
        for &key in &doc.schema.node(schema_id).keys {
            if let Some(value) = doc.tree.child_value(id, key) {
                out.push_str(&predicate(doc.schema, key, value));
            }
        }
    }
    out
}

/// `/prefix:name` for one schema node
pub fn segment(schema: &SchemaIndex, id: SchemaId) -> String {
    let node = schema.node(id);
    format!("/{}:{}", schema.module(node.module).prefix, node.name)
}

fn predicate(schema: &SchemaIndex, key: SchemaId, value: &Value) -> String {
    format!(
        "[{}={}]",
        schema.node(key).name,
        quote(&value.to_string())
    )
}

/// XPath literal; double quotes only when the value holds an apostrophe
fn quote(value: &str) -> String {
    if value.contains('\'') {
        format!("\"{}\"", value)
    } else {
        format!("'{}'", value)
    }
}

pub fn when_violation(doc: &Document<'_>, node: XNode, when: &Constraint) -> ValidationError {
    ValidationError::WhenViolation {
        path: instance_path(doc, node),
        expr: when.expr.text().to_string(),
    }
}

/// Custom error-message, error-app-tag and error-tag take precedence
pub fn must_violation(doc: &Document<'_>, node: XNode, must: &Constraint) -> ValidationError {
    ValidationError::MustViolation {
        path: instance_path(doc, node),
        message: must
            .error_message
            .clone()
            .unwrap_or_else(|| format!("Violate must constraints: {}", must.expr.text())),
        app_tag: must
            .error_app_tag
            .clone()
            .unwrap_or_else(|| APP_TAG_MUST_VIOLATION.to_string()),
        error_tag: must.error_tag,
    }
}
