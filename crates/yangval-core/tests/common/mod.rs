//! Shared schema fixtures for the validation scenarios

use yangval_core::config::EngineConfig;
use yangval_core::deps::DependencyGraph;
use yangval_core::errors::ErrorTag;
use yangval_core::schema::{LeafType, SchemaBuilder, SchemaIndex};
use yangval_core::tree::{DataTree, EditDiff, EditNode};
use yangval_core::validate::{Commit, Transaction};
use yangval_core::Result;
use yangval_core_types::TransactionId;

/// `val:validation` with single-key and multi-key must lists, a
/// string-length check and a when-gated leaf
#[allow(dead_code)]
pub fn validation_schema() -> SchemaIndex {
    let mut b = SchemaBuilder::new();
    b.module("validation", "val", "urn:example:validation");
    let top = b.container(b.root(), "val:validation");

    let list = b.list(top, "must-validation", &["name"]);
    b.leaf(list, "name", LeafType::String);
    b.leaf(list, "type", LeafType::String);
    b.must(list, "type = 'must-type'");

    let multi = b.list(top, "must-validation1", &["name", "name1"]);
    b.leaf(multi, "name", LeafType::String);
    b.leaf(multi, "name1", LeafType::String);
    b.leaf(multi, "type", LeafType::String);
    b.must(multi, "type = 'must-type'");

    let short = b.list(top, "short-name", &["id"]);
    b.leaf(short, "id", LeafType::Int);
    let name = b.leaf(short, "name", LeafType::String);
    b.must(name, "string-length(current()/../name) < 5");

    let mode = b.leaf(top, "mode", LeafType::enumeration(&["basic", "advanced"]));
    b.default_value(mode, "basic");
    let tuning = b.leaf(top, "tuning", LeafType::Int);
    b.when(tuning, "../mode = 'advanced'");

    b.build().unwrap()
}

/// `if:interfaces` with a when-gated `traps` default subtree and an
/// unconditional `mybits` default
#[allow(dead_code)]
pub fn interfaces_schema() -> SchemaIndex {
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
    let threshold = b.leaf(traps, "threshold", LeafType::Int);
    b.default_value(threshold, "10");

    let bits = b.leaf(list, "mybits", LeafType::bits(&["one", "two", "three"]));
    b.default_value(bits, "one three");

    b.build().unwrap()
}

/// `sm:schemaMount` mounting the classifier module, whose must refers back
/// through an absolute path anchored at the mount
#[allow(dead_code)]
pub fn mount_schema() -> SchemaIndex {
    let mut b = SchemaBuilder::new();
    b.module("schema-mount-test", "sm", "urn:example:schema-mount");
    b.module("classifiers", "cl", "urn:example:classifiers");
    let mp = b.container(b.root(), "sm:schemaMount");
    b.mount_point(mp, &["classifiers"]);

    let classifiers = b.container(mp, "cl:classifiers");
    let nodesets = b.list(classifiers, "nodeset-list", &["name"]);
    b.leaf(nodesets, "name", LeafType::String);

    let classifier = b.list(classifiers, "classifier", &["name"]);
    b.leaf(classifier, "name", LeafType::String);
    let nodeset = b.leaf(classifier, "nodeset", LeafType::String);
    b.must(nodeset, "/schemaMount/classifiers/nodeset-list/name = current()");

    b.build().unwrap()
}

/// A bare leaf-list count, the reference shape the impact policy governs
#[allow(dead_code)]
pub fn tag_limit_schema() -> SchemaIndex {
    let mut b = SchemaBuilder::new();
    b.module("tags", "t", "urn:example:tags");
    let top = b.container(b.root(), "t:tags");
    b.leaf_list(top, "tag", LeafType::String);
    let limit = b.leaf(top, "limit", LeafType::Int);
    b.must(limit, "count(../tag) <= current()");
    b.build().unwrap()
}

/// `p:peers` entries whose must reads a sibling entry of the same list
#[allow(dead_code)]
pub fn peer_schema() -> SchemaIndex {
    let mut b = SchemaBuilder::new();
    b.module("peers", "p", "urn:example:peers");
    let top = b.container(b.root(), "p:peers");
    let item = b.list(top, "item", &["id"]);
    b.leaf(item, "id", LeafType::Int);
    b.leaf(item, "peer", LeafType::Int);
    b.leaf(item, "enabled", LeafType::enumeration(&["yes", "no"]));
    b.must(item, "not(peer) or ../item[id = current()/peer]/enabled = 'yes'");
    b.build().unwrap()
}

/// `sp:link` with a when-gated case and an mtu must declaring its own
/// error-tag
#[allow(dead_code)]
pub fn link_schema() -> SchemaIndex {
    let mut b = SchemaBuilder::new();
    b.module("link", "sp", "urn:example:link");
    let top = b.container(b.root(), "sp:link");
    b.leaf(top, "mode", LeafType::enumeration(&["fast", "slow"]));

    let rate = b.choice(top, "rate");
    let fast = b.case(rate, "fast");
    b.when(fast, "mode = 'fast'");
    b.leaf(fast, "speed", LeafType::Int);
    let slow = b.case(rate, "slow");
    b.leaf(slow, "delay", LeafType::Int);

    let mtu = b.leaf(top, "mtu", LeafType::Int);
    b.must_with(
        mtu,
        ". >= 68",
        Some("mtu below 68"),
        Some("mtu-range"),
        Some(ErrorTag::InvalidValue),
    );

    b.build().unwrap()
}

/// Run one transaction against `committed`
#[allow(dead_code)]
pub fn run(
    schema: &SchemaIndex,
    config: &EngineConfig,
    committed: &DataTree,
    diff: &EditDiff,
) -> Result<Commit> {
    let graph = DependencyGraph::build(schema);
    Transaction::begin(schema, &graph, config, TransactionId::new()).run(committed, diff)
}

/// Run a transaction that is expected to commit, returning the new tree
#[allow(dead_code)]
pub fn commit(schema: &SchemaIndex, committed: &DataTree, diff: &EditDiff) -> DataTree {
    run(schema, &EngineConfig::default(), committed, diff)
        .expect("transaction should commit")
        .tree
}

/// Single-node diff under a top-level container
#[allow(dead_code)]
pub fn under(top: &str, child: EditNode) -> EditDiff {
    EditDiff::new().with_node(EditNode::new(top).child(child))
}
