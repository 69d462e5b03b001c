//! Schema fixtures for datastore tests

use yangval_core::schema::{LeafType, SchemaBuilder, SchemaIndex};
use yangval_core::tree::{EditDiff, EditNode};

/// Interfaces with a when-gated `traps` default subtree, an unconditional
/// `mybits` default and a mandatory `mtu`
#[allow(dead_code)]
pub fn interfaces_schema() -> SchemaIndex {
    let mut b = SchemaBuilder::new();
    b.module("ietf-interfaces", "if", "urn:ietf:params:xml:ns:yang:ietf-interfaces");
    let top = b.container(b.root(), "if:interfaces");
    let list = b.list(top, "interface", &["name"]);
    b.leaf(list, "name", LeafType::String);
    b.leaf(list, "type", LeafType::enumeration(&["fastdsl", "ptm"]));
    let mtu = b.leaf(list, "mtu", LeafType::Uint);
    b.mandatory(mtu);
    b.must(mtu, ". >= 68");

    let traps = b.container(list, "traps");
    b.when(traps, "../type = 'fastdsl'");
    let enabled = b.leaf(traps, "enabled", LeafType::Boolean);
    b.default_value(enabled, "true");

    let bits = b.leaf(list, "mybits", LeafType::bits(&["one", "two", "three"]));
    b.default_value(bits, "one");

    b.build().unwrap()
}

#[allow(dead_code)]
pub fn interface(name: &str, ty: &str, mtu: Option<u64>) -> EditDiff {
    let mut entry = EditNode::new("interface")
        .child(EditNode::leaf("name", name))
        .child(EditNode::leaf("type", ty));
    if let Some(mtu) = mtu {
        entry = entry.child(EditNode::leaf("mtu", mtu.to_string()));
    }
    EditDiff::new().with_node(EditNode::new("if:interfaces").child(entry))
}
