#![allow(clippy::unwrap_used, clippy::expect_used)]

/// Validation scenarios: must, when, default instantiation and schema mount
///
/// Each scenario commits a baseline, applies one more edit and checks the
/// single error (or the committed tree) that results.
mod common;

use common::{commit, run, under};
use yangval_core::config::EngineConfig;
use yangval_core::errors::{ErrorTag, RpcError, ValidationError};
use yangval_core::tree::{DataTree, EditDiff, EditNode, EditOperation, NodeRef};
use yangval_core::xpath::XNode;

fn root<'a>(schema: &'a yangval_core::SchemaIndex, tree: &'a DataTree) -> NodeRef<'a> {
    NodeRef::new(schema, tree, XNode::Node(DataTree::ROOT))
}

// ===== MUST =====

#[test]
fn test_must_on_entry_without_referenced_leaf() {
    // GIVEN the validation schema and an empty datastore
    let schema = common::validation_schema();

    // WHEN creating must-validation[name='must3'] with no type
    let diff = under(
        "val:validation",
        EditNode::new("must-validation").child(EditNode::leaf("name", "must3")),
    );
    let err = run(&schema, &EngineConfig::default(), &DataTree::new(), &diff).unwrap_err();

    // THEN exactly one must violation is reported on the entry
    let rpc: RpcError = err.into();
    assert_eq!(
        rpc.error_path(),
        "/val:validation/val:must-validation[name='must3']"
    );
    assert_eq!(
        rpc.error_message(),
        "Violate must constraints: type = 'must-type'"
    );
    assert_eq!(rpc.error_app_tag(), "must-violation");
    assert_eq!(rpc.error_tag(), ErrorTag::OperationFailed);
    assert_eq!(rpc.error_type().as_str(), "application");
    assert_eq!(rpc.error_severity().as_str(), "error");
}

#[test]
fn test_multi_key_error_path_uses_key_order() {
    // GIVEN a list keyed by name then name1
    let schema = common::validation_schema();

    // WHEN creating an entry without a valid type
    let diff = under(
        "val:validation",
        EditNode::new("must-validation1")
            .child(EditNode::leaf("name1", "must33"))
            .child(EditNode::leaf("name", "must3"))
            .child(EditNode::leaf("type", "other")),
    );
    let err = run(&schema, &EngineConfig::default(), &DataTree::new(), &diff).unwrap_err();

    // THEN the path carries both key predicates in declaration order
    assert_eq!(
        err.path(),
        "/val:validation/val:must-validation1[name='must3'][name1='must33']"
    );
}

#[test]
fn test_string_length_sees_edited_value() {
    // GIVEN an entry whose name passes the length check
    let schema = common::validation_schema();
    let entry = |name: &str| {
        under(
            "val:validation",
            EditNode::new("short-name")
                .child(EditNode::leaf("id", 1i64))
                .child(EditNode::leaf("name", name)),
        )
    };
    let tree = commit(&schema, &DataTree::new(), &entry("abc"));

    // WHEN the name is lengthened in a later transaction
    let err = run(&schema, &EngineConfig::default(), &tree, &entry("abcdef")).unwrap_err();

    // THEN the new value is the one measured
    assert_eq!(
        err,
        ValidationError::MustViolation {
            path: "/val:validation/val:short-name[id='1']/val:name".to_string(),
            message: "Violate must constraints: string-length(current()/../name) < 5"
                .to_string(),
            app_tag: "must-violation".to_string(),
            error_tag: None,
        }
    );

    // AND a short enough edit commits
    assert!(run(&schema, &EngineConfig::default(), &tree, &entry("abcd")).is_ok());
}

#[test]
fn test_resubmitting_committed_diff_is_clean() {
    // GIVEN a valid entry
    let schema = common::validation_schema();
    let diff = under(
        "val:validation",
        EditNode::new("must-validation")
            .child(EditNode::leaf("name", "must3"))
            .child(EditNode::leaf("type", "must-type")),
    );
    let tree = commit(&schema, &DataTree::new(), &diff);

    // WHEN the same diff is applied again
    let again = run(&schema, &EngineConfig::default(), &tree, &diff).unwrap();

    // THEN nothing is touched and the tree is unchanged
    assert!(again.touched.is_empty());
    assert_eq!(again.tree, tree);
}

#[test]
fn test_sibling_entry_must_rechecked_after_peer_change() {
    // GIVEN item 1 requiring its peer, item 2, to be enabled
    let schema = common::peer_schema();
    let item = |id: i64, peer: Option<i64>, enabled: &str| {
        let mut e = EditNode::new("item")
            .child(EditNode::leaf("id", id))
            .child(EditNode::leaf("enabled", enabled));
        if let Some(peer) = peer {
            e = e.child(EditNode::leaf("peer", peer));
        }
        e
    };
    let seed = EditDiff::new().with_node(
        EditNode::new("p:peers")
            .child(item(1, Some(2), "yes"))
            .child(item(2, None, "yes")),
    );
    let tree = commit(&schema, &DataTree::new(), &seed);

    // WHEN only item 2 is disabled
    let disable = under(
        "p:peers",
        EditNode::new("item")
            .child(EditNode::leaf("id", 2i64))
            .child(EditNode::leaf("enabled", "no")),
    );
    let err = run(&schema, &EngineConfig::default(), &tree, &disable).unwrap_err();

    // THEN item 1's must is re-evaluated and fails on item 1
    assert_eq!(
        err,
        ValidationError::MustViolation {
            path: "/p:peers/p:item[id='1']".to_string(),
            message: "Violate must constraints: not(peer) or ../item[id = current()/peer]/enabled = 'yes'"
                .to_string(),
            app_tag: "must-violation".to_string(),
            error_tag: None,
        }
    );

    // AND the same final state is rejected when loaded in one transaction
    let fresh = EditDiff::new().with_node(
        EditNode::new("p:peers")
            .child(item(1, Some(2), "yes"))
            .child(item(2, None, "no")),
    );
    let loaded = run(&schema, &EngineConfig::default(), &DataTree::new(), &fresh).unwrap_err();
    assert_eq!(loaded, err);
}

#[test]
fn test_declared_must_error_tag_reaches_rpc_error() {
    // GIVEN an mtu must declared with its own message, app-tag and error-tag
    let schema = common::link_schema();

    // WHEN the mtu is too small
    let diff = under("sp:link", EditNode::leaf("mtu", 20i64));
    let err = run(&schema, &EngineConfig::default(), &DataTree::new(), &diff).unwrap_err();

    // THEN every declared field is reported
    let rpc: RpcError = err.into();
    assert_eq!(rpc.error_path(), "/sp:link/sp:mtu");
    assert_eq!(rpc.error_message(), "mtu below 68");
    assert_eq!(rpc.error_app_tag(), "mtu-range");
    assert_eq!(rpc.error_tag(), ErrorTag::InvalidValue);
}

// ===== WHEN =====

#[test]
fn test_supplied_leaf_under_false_when() {
    // GIVEN mode defaults to basic
    let schema = common::validation_schema();

    // WHEN tuning is supplied without switching mode
    let diff = under("val:validation", EditNode::leaf("tuning", 3i64));
    let err = run(&schema, &EngineConfig::default(), &DataTree::new(), &diff).unwrap_err();

    // THEN the when violation names the leaf and the expression
    let rpc: RpcError = err.into();
    assert_eq!(rpc.error_path(), "/val:validation/val:tuning");
    assert_eq!(
        rpc.error_message(),
        "Violate when constraints: ../mode = 'advanced'"
    );
    assert_eq!(rpc.error_app_tag(), "when-violation");
    assert_eq!(rpc.error_tag(), ErrorTag::UnknownElement);
}

#[test]
fn test_when_gated_defaults_follow_interface_type() {
    // GIVEN an interface of type fastdsl
    let schema = common::interfaces_schema();
    let iface = |ty: &str| {
        under(
            "if:interfaces",
            EditNode::new("interface")
                .child(EditNode::leaf("name", "dsl0"))
                .child(EditNode::leaf("type", ty)),
        )
    };
    let tree = commit(&schema, &DataTree::new(), &iface("fastdsl"));
    {
        let entry = root(&schema, &tree)
            .child("interfaces")
            .and_then(|i| i.child("interface"))
            .unwrap();
        let traps = entry.child("traps").expect("traps instantiated");
        assert_eq!(traps.to_json(), serde_json::json!({"enabled": true, "threshold": 10}));
        assert_eq!(
            entry.child("mybits").unwrap().to_json(),
            serde_json::json!("one three")
        );
    }

    // WHEN the type changes to ptm
    let tree = commit(&schema, &tree, &iface("ptm"));

    // THEN traps is gone and mybits stays
    let entry = root(&schema, &tree)
        .child("interfaces")
        .and_then(|i| i.child("interface"))
        .unwrap();
    assert!(entry.child("traps").is_none());
    assert!(entry.child("mybits").is_some());

    // AND switching back re-instantiates the defaults
    let tree = commit(&schema, &tree, &iface("fastdsl"));
    let entry = root(&schema, &tree)
        .child("interfaces")
        .and_then(|i| i.child("interface"))
        .unwrap();
    assert!(entry.child("traps").is_some());
}

#[test]
fn test_supplied_member_of_false_case_when() {
    // GIVEN the fast case is only allowed in fast mode
    let schema = common::link_schema();

    // WHEN speed is supplied in slow mode
    let diff = EditDiff::new().with_node(
        EditNode::new("sp:link")
            .child(EditNode::leaf("mode", "slow"))
            .child(EditNode::leaf("speed", 5i64)),
    );
    let err = run(&schema, &EngineConfig::default(), &DataTree::new(), &diff).unwrap_err();

    // THEN the case's when is reported on the supplied leaf
    assert_eq!(
        err,
        ValidationError::WhenViolation {
            path: "/sp:link/sp:speed".to_string(),
            expr: "mode = 'fast'".to_string(),
        }
    );
}

#[test]
fn test_case_removed_when_its_when_turns_false() {
    // GIVEN a link in fast mode with a speed
    let schema = common::link_schema();
    let link = |mode: &str| under("sp:link", EditNode::leaf("mode", mode));
    let fast = EditDiff::new().with_node(
        EditNode::new("sp:link")
            .child(EditNode::leaf("mode", "fast"))
            .child(EditNode::leaf("speed", 5i64)),
    );
    let tree = commit(&schema, &DataTree::new(), &fast);

    // WHEN the mode changes to slow
    let tree = commit(&schema, &tree, &link("slow"));

    // THEN the fast case and its speed are gone
    let top = root(&schema, &tree).child("link").unwrap();
    assert!(top.child("speed").is_none());
    assert_eq!(top.to_json(), serde_json::json!({"mode": "slow"}));

    // AND re-supplying speed in slow mode is rejected
    let again = EditDiff::new().with_node(
        EditNode::new("sp:link").child(EditNode::leaf("speed", 7i64)),
    );
    let err = run(&schema, &EngineConfig::default(), &tree, &again).unwrap_err();
    assert!(matches!(err, ValidationError::WhenViolation { .. }));
}

#[test]
fn test_case_when_rechecked_for_unchanged_member() {
    // GIVEN a link in fast mode with a speed
    let schema = common::link_schema();
    let fast = EditDiff::new().with_node(
        EditNode::new("sp:link")
            .child(EditNode::leaf("mode", "fast"))
            .child(EditNode::leaf("speed", 5i64)),
    );
    let tree = commit(&schema, &DataTree::new(), &fast);

    // WHEN mode becomes slow while the same speed is resubmitted
    let diff = EditDiff::new().with_node(
        EditNode::new("sp:link")
            .child(EditNode::leaf("mode", "slow"))
            .child(EditNode::leaf("speed", 5i64)),
    );
    let err = run(&schema, &EngineConfig::default(), &tree, &diff).unwrap_err();

    // THEN the case's when is re-evaluated through the mode dependency
    assert_eq!(err.path(), "/sp:link/sp:speed");
    assert_eq!(err.kind(), yangval_core::errors::ErrorKind::WhenViolation);
}

// ===== SCHEMA MOUNT =====

#[test]
fn test_absolute_must_across_mount_after_remove() {
    // GIVEN two nodesets and a classifier pointing at the first
    let schema = common::mount_schema();
    let nodeset = |name: &str| EditNode::new("nodeset-list").child(EditNode::leaf("name", name));
    let seed = under(
        "sm:schemaMount",
        EditNode::new("cl:classifiers")
            .child(nodeset("ns-a"))
            .child(nodeset("ns-b"))
            .child(
                EditNode::new("classifier")
                    .child(EditNode::leaf("name", "c1"))
                    .child(EditNode::leaf("nodeset", "ns-a")),
            ),
    );
    let tree = commit(&schema, &DataTree::new(), &seed);

    // WHEN the referenced nodeset entry is removed
    let remove = under(
        "sm:schemaMount",
        EditNode::new("cl:classifiers").child(nodeset("ns-a").with_operation(EditOperation::Remove)),
    );
    let err = run(&schema, &EngineConfig::default(), &tree, &remove).unwrap_err();

    // THEN the classifier's must is re-evaluated and fails
    assert_eq!(
        err,
        ValidationError::MustViolation {
            path: "/sm:schemaMount/cl:classifiers/cl:classifier[name='c1']/cl:nodeset"
                .to_string(),
            message: "Violate must constraints: /schemaMount/classifiers/nodeset-list/name = current()"
                .to_string(),
            app_tag: "must-violation".to_string(),
            error_tag: None,
        }
    );

    // AND removing the unreferenced one is fine
    let remove_b = under(
        "sm:schemaMount",
        EditNode::new("cl:classifiers").child(nodeset("ns-b").with_operation(EditOperation::Remove)),
    );
    assert!(run(&schema, &EngineConfig::default(), &tree, &remove_b).is_ok());
}

// ===== STRUCTURAL =====

#[test]
fn test_unknown_node_preempts_constraints() {
    // GIVEN an edit with both a must problem and an unknown node
    let schema = common::validation_schema();
    let diff = under(
        "val:validation",
        EditNode::new("must-validation")
            .child(EditNode::leaf("name", "must3"))
            .child(EditNode::leaf("colour", "red")),
    );

    // WHEN it is applied
    let err = run(&schema, &EngineConfig::default(), &DataTree::new(), &diff).unwrap_err();

    // THEN the structural error wins
    assert!(matches!(err, ValidationError::UnknownNode { .. }));
    assert!(err.kind().is_structural());
}
