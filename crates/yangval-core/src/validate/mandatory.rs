//! Mandatory-node check
//!
//! Walks every surviving container and list entry in document order and
//! reports the first mandatory child that is absent. Subtrees under a false
//! `when` are skipped, as are mandatory children whose own `when` (or that
//! of their choice or case) is false.
//! Top-level nodes have no parent instance and are never reported.

use crate::errors::{Result, ValidationError};
use crate::report;
use crate::schema::{SchemaId, SchemaIndex, SchemaKind};
use crate::tree::{ChangeSet, DataTree, NodeId, NodeKind};
use crate::validate::defaults::{when_holds, wrapper_when_holds};
use crate::xpath::{Document, XNode};

pub(crate) fn check(schema: &SchemaIndex, tree: &DataTree, changes: &ChangeSet) -> Result<()> {
    let walker = Walker {
        doc: Document::new(schema, tree),
        changes,
    };
    walker.descend(DataTree::ROOT)
}

struct Walker<'a> {
    doc: Document<'a>,
    changes: &'a ChangeSet,
}

impl Walker<'_> {
    fn visit(&self, node: NodeId) -> Result<()> {
        if !when_holds(self.doc.schema, self.doc.tree, XNode::Node(node)) {
            return Ok(());
        }
        self.check_holder(node, node, self.doc.tree.schema_of(node))?;
        self.descend(node)
    }

    fn descend(&self, node: NodeId) -> Result<()> {
        let tree = self.doc.tree;
        for child in tree.child_nodes(node) {
            match &tree.node(child).kind {
                NodeKind::Container { .. } => self.visit(child)?,
                NodeKind::List { entries } => {
                    for &entry in entries {
                        self.visit(entry)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Check the schema children of `holder_schema` held by `holder`
    fn check_holder(&self, holder: NodeId, data_parent: NodeId, holder_schema: SchemaId) -> Result<()> {
        let schema = self.doc.schema;
        let tree = self.doc.tree;

        for &child in &schema.node(holder_schema).children {
            let node = schema.node(child);
            match node.kind {
                SchemaKind::Leaf | SchemaKind::LeafList | SchemaKind::List | SchemaKind::Opaque => {
                    if node.mandatory
                        && tree.find_child(data_parent, child).is_none()
                        && self.phantom_exists(data_parent, child)
                    {
                        return Err(self.missing(
                            report::child_path(&self.doc, data_parent, child),
                            &node.name,
                            self.changes.was_created(data_parent),
                        ));
                    }
                }
                SchemaKind::Container => {
                    if !node.presence
                        && tree.find_child(data_parent, child).is_none()
                        && self.phantom_exists(data_parent, child)
                    {
                        let path = report::child_path(&self.doc, data_parent, child);
                        self.check_absent(path, child)?;
                    }
                }
                SchemaKind::Choice => {
                    if !wrapper_when_holds(schema, tree, child, data_parent) {
                        continue;
                    }
                    let active = tree
                        .find_choice(holder, child)
                        .and_then(|w| tree.held(w).first().copied());
                    match active {
                        Some(case)
                            if !wrapper_when_holds(schema, tree, tree.schema_of(case), data_parent) => {}
                        Some(case) => self.check_holder(case, data_parent, tree.schema_of(case))?,
                        None if node.mandatory => {
                            return Err(self.missing(
                                report::instance_path(&self.doc, XNode::Node(data_parent)),
                                &node.name,
                                self.changes.was_created(data_parent),
                            ));
                        }
                        None => {}
                    }
                }
                SchemaKind::Case => {}
            }
        }
        Ok(())
    }

    /// Mandatory nodes below a non-presence container that does not exist
    fn check_absent(&self, path: String, container: SchemaId) -> Result<()> {
        let schema = self.doc.schema;
        for &child in &schema.node(container).children {
            let node = schema.node(child);
            match node.kind {
                SchemaKind::Container if !node.presence => {
                    self.check_absent(format!("{}{}", path, report::segment(schema, child)), child)?;
                }
                SchemaKind::Container | SchemaKind::Case => {}
                _ if node.mandatory => {
                    let path = match node.kind {
                        SchemaKind::Choice => path,
                        _ => format!("{}{}", path, report::segment(schema, child)),
                    };
                    return Err(self.missing(path, &node.name, true));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn phantom_exists(&self, parent: NodeId, child: SchemaId) -> bool {
        when_holds(
            self.doc.schema,
            self.doc.tree,
            XNode::Phantom {
                parent,
                schema: child,
            },
        )
    }

    fn missing(&self, path: String, name: &str, parent_new: bool) -> ValidationError {
        let message = if parent_new {
            format!("Missing mandatory node - {}", name)
        } else {
            format!("Mandatory leaf '{}' is missing", name)
        };
        ValidationError::MandatoryMissing { path, message }
    }
}
