//! JSON encoding of data trees (RFC 7951 flavoured)
//!
//! Member names are qualified with the module name wherever the module
//! changes from the parent, lists and leaf-lists render as arrays, and
//! choice/case wrappers do not appear. Object members are emitted in
//! sorted order, which makes the rendering canonical.

use sha2::{Digest, Sha256};

use crate::errors::{Result, ValidationError};
use crate::schema::{ModuleId, SchemaId, SchemaIndex, SchemaKind, Value};
use crate::tree::data_tree::DataTree;
use crate::tree::edit::{EditContent, EditDiff, EditNode};
use crate::tree::node::{NodeId, NodeKind};

pub fn render(schema: &SchemaIndex, tree: &DataTree) -> serde_json::Value {
    render_members(schema, tree, DataTree::ROOT, None)
}

/// Render the subtree under `node`; leaves render as their bare value
pub fn render_node(schema: &SchemaIndex, tree: &DataTree, node: NodeId) -> serde_json::Value {
    let module = Some(schema.node(tree.schema_of(node)).module);
    match &tree.node(node).kind {
        NodeKind::Leaf { value } => value.to_json(),
        NodeKind::LeafList { values } => {
            serde_json::Value::Array(values.iter().map(Value::to_json).collect())
        }
        NodeKind::Opaque { content } => content.clone(),
        NodeKind::List { entries } => serde_json::Value::Array(
            entries
                .iter()
                .map(|&e| render_members(schema, tree, e, module))
                .collect(),
        ),
        NodeKind::Container { .. }
        | NodeKind::Entry { .. }
        | NodeKind::Choice { .. }
        | NodeKind::Case { .. } => render_members(schema, tree, node, module),
    }
}

fn render_members(
    schema: &SchemaIndex,
    tree: &DataTree,
    holder: NodeId,
    parent_module: Option<ModuleId>,
) -> serde_json::Value {
    let mut members = serde_json::Map::new();
    for child in tree.child_nodes(holder) {
        let node = schema.node(tree.schema_of(child));
        let name = if parent_module == Some(node.module) {
            node.name.clone()
        } else {
            format!("{}:{}", schema.module(node.module).name, node.name)
        };
        members.insert(name, render_node(schema, tree, child));
    }
    serde_json::Value::Object(members)
}

/// SHA-256 of the canonical rendering, hex encoded
pub fn digest(schema: &SchemaIndex, tree: &DataTree) -> String {
    hash_string(&render(schema, tree).to_string())
}

fn hash_string(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    hex::encode(hasher.finalize())
}

/// Read a JSON document into a merge diff
///
/// # Errors
///
/// Returns `UnknownNode` for members the schema does not define and
/// `InvalidValue` for JSON shapes that do not fit the node kind. Leaf
/// values are type-checked later, when the diff is applied.
pub fn diff_from_json(schema: &SchemaIndex, json: &serde_json::Value) -> Result<EditDiff> {
    let nodes = members_to_edits(schema, SchemaIndex::ROOT, json)?;
    Ok(EditDiff {
        nodes,
        ..EditDiff::new()
    })
}

fn members_to_edits(
    schema: &SchemaIndex,
    parent: SchemaId,
    json: &serde_json::Value,
) -> Result<Vec<EditNode>> {
    let parent_path = if parent == SchemaIndex::ROOT {
        String::new()
    } else {
        schema.schema_path(parent)
    };
    let Some(members) = json.as_object() else {
        return Err(shape_error(&parent_path, "expected an object"));
    };

    let mut edits = Vec::new();
    for (name, value) in members {
        let Some(sid) = schema.resolve_child(parent, name) else {
            return Err(ValidationError::UnknownNode {
                path: parent_path,
                name: name.clone(),
            });
        };
        let path = schema.schema_path(sid);

        match schema.node(sid).kind {
            SchemaKind::Container => edits.push(EditNode {
                name: name.clone(),
                operation: None,
                content: EditContent::Children(members_to_edits(schema, sid, value)?),
            }),
            SchemaKind::List => {
                let Some(entries) = value.as_array() else {
                    return Err(shape_error(&path, "expected an array of entries"));
                };
                for entry in entries {
                    edits.push(EditNode {
                        name: name.clone(),
                        operation: None,
                        content: EditContent::Children(members_to_edits(schema, sid, entry)?),
                    });
                }
            }
            SchemaKind::LeafList => {
                let Some(values) = value.as_array() else {
                    return Err(shape_error(&path, "expected an array of values"));
                };
                for v in values {
                    let scalar = scalar(v).ok_or_else(|| shape_error(&path, "expected a scalar"))?;
                    edits.push(EditNode::leaf(name.clone(), scalar));
                }
            }
            SchemaKind::Leaf => {
                let scalar = scalar(value).ok_or_else(|| shape_error(&path, "expected a scalar"))?;
                edits.push(EditNode::leaf(name.clone(), scalar));
            }
            SchemaKind::Opaque => edits.push(EditNode::opaque(name.clone(), value.clone())),
            SchemaKind::Choice | SchemaKind::Case => {
                return Err(shape_error(&path, "choice and case carry no data"))
            }
        }
    }
    Ok(edits)
}

fn scalar(json: &serde_json::Value) -> Option<Value> {
    match json {
        serde_json::Value::String(s) => Some(Value::String(s.clone())),
        serde_json::Value::Number(n) => Some(Value::String(n.to_string())),
        serde_json::Value::Bool(b) => Some(Value::Boolean(*b)),
        serde_json::Value::Array(items) if items.len() == 1 && items[0].is_null() => {
            Some(Value::Empty)
        }
        _ => None,
    }
}

fn shape_error(path: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{LeafType, SchemaBuilder};
    use crate::tree::apply::apply;
    use serde_json::json;

    fn schema() -> SchemaIndex {
        let mut b = SchemaBuilder::new();
        b.module("ietf-interfaces", "if", "urn:ietf:params:xml:ns:yang:ietf-interfaces");
        b.module("example-ext", "ext", "urn:example:ext");
        let top = b.container(b.root(), "if:interfaces");
        let list = b.list(top, "interface", &["name"]);
        b.leaf(list, "name", LeafType::String);
        b.leaf(list, "mtu", LeafType::Uint);
        b.leaf(list, "ext:enabled", LeafType::Empty);
        b.leaf_list(top, "dns", LeafType::String);
        b.build().unwrap()
    }

    #[test]
    fn test_json_round_trip() {
        let schema = schema();
        let doc = json!({
            "ietf-interfaces:interfaces": {
                "interface": [
                    {"name": "eth0", "mtu": 1500, "example-ext:enabled": [null]},
                    {"name": "eth1"}
                ],
                "dns": ["1.1.1.1", "8.8.8.8"]
            }
        });

        let diff = diff_from_json(&schema, &doc).unwrap();
        let (tree, _) = apply(DataTree::new(), &schema, &diff).unwrap();
        assert_eq!(render(&schema, &tree), doc);
        assert_eq!(digest(&schema, &tree).len(), 64);
    }

    #[test]
    fn test_unknown_member_is_rejected() {
        let schema = schema();
        let err = diff_from_json(&schema, &json!({"ietf-interfaces:interfaces": {"bogus": 1}}))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownNode {
                path: "/if:interfaces".to_string(),
                name: "bogus".to_string()
            }
        );
    }

    #[test]
    fn test_digest_tracks_content() {
        let schema = schema();
        let a = diff_from_json(&schema, &json!({"ietf-interfaces:interfaces": {"dns": ["a"]}}))
            .unwrap();
        let b = diff_from_json(&schema, &json!({"ietf-interfaces:interfaces": {"dns": ["b"]}}))
            .unwrap();
        let (ta, _) = apply(DataTree::new(), &schema, &a).unwrap();
        let (tb, _) = apply(DataTree::new(), &schema, &b).unwrap();
        assert_ne!(digest(&schema, &ta), digest(&schema, &tb));
        assert_eq!(digest(&schema, &ta), digest(&schema, &ta.compacted()));
    }
}
