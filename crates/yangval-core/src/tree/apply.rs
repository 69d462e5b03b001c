//! Edit application
//!
//! `apply()` takes ownership of a candidate tree, applies every operation
//! of an `EditDiff` to it and hands the tree back together with the set of
//! directly touched locations. Structural problems abort with a typed error;
//! the caller's committed tree is never involved, so dropping the candidate
//! is the whole rollback.
//!
//! Only real changes are recorded as touched. Merging a value that is
//! already present marks the node as supplied but leaves it untouched.

use std::collections::{BTreeMap, BTreeSet};

use crate::errors::{Result, ValidationError};
use crate::report;
use crate::schema::{SchemaId, SchemaIndex, SchemaKind, Value};
use crate::tree::data_tree::DataTree;
use crate::tree::edit::{EditContent, EditDiff, EditNode, EditOperation};
use crate::tree::node::{NodeId, NodeKind};
use crate::xpath::{Document, XNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchKind {
    Created,
    Modified,
    Deleted,
}

/// A directly changed location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Touched {
    pub schema: SchemaId,
    /// The node itself; detached from the tree when `kind` is `Deleted`
    pub node: NodeId,
    /// Data parent the node hangs (or hung) under
    pub parent: NodeId,
    pub kind: TouchKind,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub touched: Vec<Touched>,
    /// Nodes that did not exist before this transaction
    pub created: BTreeSet<NodeId>,
    /// Nodes the edit named explicitly, changed or not
    pub supplied: BTreeSet<NodeId>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.touched.is_empty()
    }

    pub fn was_created(&self, id: NodeId) -> bool {
        self.created.contains(&id)
    }

    pub(crate) fn record(&mut self, tree: &DataTree, node: NodeId, kind: TouchKind) {
        let parent = tree.data_parent(node).unwrap_or(DataTree::ROOT);
        self.touched.push(Touched {
            schema: tree.schema_of(node),
            node,
            parent,
            kind,
        });
        if kind == TouchKind::Created {
            self.created.insert(node);
        }
    }
}

/// Apply an edit diff to a candidate tree
///
/// # Errors
///
/// Returns the first structural error: an unknown node, a missing or
/// duplicate list key, `create` on existing data, `delete` on missing data,
/// or a value that does not fit its leaf type. The candidate is consumed
/// either way.
pub fn apply(
    state: DataTree,
    schema: &SchemaIndex,
    diff: &EditDiff,
) -> Result<(DataTree, ChangeSet)> {
    let mut applier = Applier {
        schema,
        tree: state,
        changes: ChangeSet::default(),
    };
    applier.apply_children(
        DataTree::ROOT,
        SchemaIndex::ROOT,
        &diff.nodes,
        diff.default_operation,
    )?;

    tracing::debug!(
        touched = applier.changes.touched.len(),
        created = applier.changes.created.len(),
        "edit applied to candidate"
    );
    Ok((applier.tree, applier.changes))
}

struct Applier<'a> {
    schema: &'a SchemaIndex,
    tree: DataTree,
    changes: ChangeSet,
}

/// What an edit left in place under its parent, for `replace`
#[derive(Default)]
struct Mentioned {
    nodes: BTreeSet<NodeId>,
    values: BTreeMap<SchemaId, Vec<Value>>,
}

impl<'a> Applier<'a> {
    fn apply_children(
        &mut self,
        holder: NodeId,
        holder_schema: SchemaId,
        edits: &[EditNode],
        inherited: EditOperation,
    ) -> Result<()> {
        let mut seen_entries: BTreeSet<(SchemaId, Vec<String>)> = BTreeSet::new();
        let mut mentioned = Mentioned::default();

        for edit in edits {
            let op = edit.operation.unwrap_or(inherited);
            let Some(sid) = self.schema.resolve_child(holder_schema, &edit.name) else {
                return Err(ValidationError::UnknownNode {
                    path: report::instance_path(&self.doc(), XNode::Node(holder)),
                    name: edit.name.clone(),
                });
            };

            let kept = match self.schema.node(sid).kind {
                SchemaKind::Container => self.apply_container(holder, sid, edit, op)?,
                SchemaKind::List => self.apply_entry(holder, sid, edit, op, &mut seen_entries)?,
                SchemaKind::Leaf => self.apply_leaf(holder, sid, edit, op)?,
                SchemaKind::LeafList => {
                    self.apply_leaf_list(holder, sid, edit, op, &mut mentioned.values)?
                }
                SchemaKind::Opaque => self.apply_opaque(holder, sid, edit, op)?,
                SchemaKind::Choice | SchemaKind::Case => {
                    return Err(ValidationError::Internal {
                        message: format!("'{}' resolved to a non-data node", edit.name),
                    })
                }
            };
            if let Some(id) = kept {
                mentioned.nodes.insert(id);
            }
        }

        if inherited == EditOperation::Replace {
            self.prune_unmentioned(holder, holder_schema, &mentioned);
        }
        Ok(())
    }

    fn apply_container(
        &mut self,
        parent: NodeId,
        sid: SchemaId,
        edit: &EditNode,
        op: EditOperation,
    ) -> Result<Option<NodeId>> {
        let existing = self.tree.find_child(parent, sid);
        match (op, existing) {
            (EditOperation::Create, Some(_)) => Err(ValidationError::DataExists {
                path: self.path(parent, sid),
            }),
            (EditOperation::Delete, None) => Err(ValidationError::DataMissing {
                path: self.path(parent, sid),
            }),
            (EditOperation::Remove, None) => Ok(None),
            (EditOperation::Delete | EditOperation::Remove, Some(id)) => {
                self.delete(id);
                Ok(None)
            }
            (_, Some(id)) => {
                self.changes.supplied.insert(id);
                self.apply_children(id, sid, edit.children(), op)?;
                Ok(Some(id))
            }
            (_, None) => {
                let holder = self.holder_for(parent, sid);
                let id = self.tree.add(holder, sid, NodeKind::container());
                self.created(id);
                self.apply_children(id, sid, edit.children(), op)?;
                Ok(Some(id))
            }
        }
    }

    fn apply_entry(
        &mut self,
        parent: NodeId,
        sid: SchemaId,
        edit: &EditNode,
        op: EditOperation,
        seen: &mut BTreeSet<(SchemaId, Vec<String>)>,
    ) -> Result<Option<NodeId>> {
        let mut keys = Vec::new();
        for &key in &self.schema.node(sid).keys {
            let raw = edit
                .children()
                .iter()
                .find(|c| self.schema.resolve_child(sid, &c.name) == Some(key))
                .and_then(EditNode::value);
            let Some(raw) = raw else {
                return Err(ValidationError::MissingKey {
                    path: self.path(parent, sid),
                    key: self.schema.node(key).name.clone(),
                });
            };
            let value = self.parse(&self.path(parent, sid), key, raw)?;
            keys.push((key, value));
        }

        let entry_path = report::entry_path(&self.doc(), parent, sid, &keys);
        let signature = (sid, keys.iter().map(|(_, v)| v.to_string()).collect());
        if !seen.insert(signature) {
            return Err(ValidationError::DuplicateKey { path: entry_path });
        }

        let wrapper = self.tree.find_child(parent, sid);
        let existing = wrapper.and_then(|w| self.tree.find_entry(w, &keys));
        match (op, existing) {
            (EditOperation::Create, Some(_)) => {
                Err(ValidationError::DataExists { path: entry_path })
            }
            (EditOperation::Delete, None) => Err(ValidationError::DataMissing { path: entry_path }),
            (EditOperation::Remove, None) => Ok(None),
            (EditOperation::Delete | EditOperation::Remove, Some(entry)) => {
                self.delete(entry);
                Ok(None)
            }
            (_, Some(entry)) => {
                self.changes.supplied.insert(entry);
                self.apply_children(entry, sid, edit.children(), op)?;
                Ok(Some(entry))
            }
            (_, None) => {
                let wrapper = match wrapper {
                    Some(w) => w,
                    None => {
                        let holder = self.holder_for(parent, sid);
                        self.tree.add(holder, sid, NodeKind::List { entries: vec![] })
                    }
                };
                let entry = self.tree.add(wrapper, sid, NodeKind::Entry { children: vec![] });
                self.created(entry);
                for (key, value) in keys {
                    let k = self.tree.add(entry, key, NodeKind::Leaf { value });
                    self.changes.created.insert(k);
                    self.changes.supplied.insert(k);
                }
                self.apply_children(entry, sid, edit.children(), op)?;
                Ok(Some(entry))
            }
        }
    }

    fn apply_leaf(
        &mut self,
        parent: NodeId,
        sid: SchemaId,
        edit: &EditNode,
        op: EditOperation,
    ) -> Result<Option<NodeId>> {
        let path = self.path(parent, sid);
        let existing = self.tree.find_child(parent, sid);
        let is_key = self
            .schema
            .node(sid)
            .parent
            .map_or(false, |p| self.schema.node(p).is_key(sid));

        if op.is_removal() {
            return match existing {
                Some(_) if is_key => Err(ValidationError::InvalidValue {
                    path,
                    reason: "key leaf cannot be deleted".to_string(),
                }),
                Some(id) => {
                    self.delete(id);
                    Ok(None)
                }
                None if op == EditOperation::Delete => Err(ValidationError::DataMissing { path }),
                None => Ok(None),
            };
        }

        let Some(raw) = edit.value() else {
            return Err(ValidationError::InvalidValue {
                path,
                reason: "leaf requires a value".to_string(),
            });
        };
        let value = self.parse(&path, sid, raw)?;

        match existing {
            Some(_) if op == EditOperation::Create && !is_key => {
                Err(ValidationError::DataExists { path })
            }
            Some(id) => {
                if self.tree.leaf_value(id) != Some(&value) {
                    if is_key {
                        return Err(ValidationError::InvalidValue {
                            path,
                            reason: "key leaf cannot be modified".to_string(),
                        });
                    }
                    if let NodeKind::Leaf { value: current } = &mut self.tree.node_mut(id).kind {
                        *current = value;
                    }
                    self.changes.record(&self.tree, id, TouchKind::Modified);
                }
                self.changes.supplied.insert(id);
                Ok(Some(id))
            }
            None => {
                let holder = self.holder_for(parent, sid);
                let id = self.tree.add(holder, sid, NodeKind::Leaf { value });
                self.created(id);
                Ok(Some(id))
            }
        }
    }

    fn apply_leaf_list(
        &mut self,
        parent: NodeId,
        sid: SchemaId,
        edit: &EditNode,
        op: EditOperation,
        mentioned: &mut BTreeMap<SchemaId, Vec<Value>>,
    ) -> Result<Option<NodeId>> {
        let existing = self.tree.find_child(parent, sid);
        let value = match edit.value() {
            Some(raw) => Some(self.parse(&self.path(parent, sid), sid, raw)?),
            None => None,
        };

        let Some(value) = value else {
            if !op.is_removal() {
                return Err(ValidationError::InvalidValue {
                    path: self.path(parent, sid),
                    reason: "leaf-list entry requires a value".to_string(),
                });
            }
            // the whole leaf-list
            return match existing {
                Some(id) => {
                    self.delete(id);
                    Ok(None)
                }
                None if op == EditOperation::Delete => Err(ValidationError::DataMissing {
                    path: self.path(parent, sid),
                }),
                None => Ok(None),
            };
        };

        let position = existing.and_then(|id| match &self.tree.node(id).kind {
            NodeKind::LeafList { values } => values.iter().position(|v| *v == value),
            _ => None,
        });

        if op.is_removal() {
            return match (existing, position) {
                (Some(id), Some(at)) => {
                    self.remove_value(id, at);
                    Ok(None)
                }
                _ if op == EditOperation::Delete => Err(ValidationError::DataMissing {
                    path: report::value_path(&self.doc(), parent, sid, &value),
                }),
                _ => Ok(None),
            };
        }

        mentioned.entry(sid).or_default().push(value.clone());
        match (existing, position) {
            (Some(_), Some(_)) if op == EditOperation::Create => Err(ValidationError::DataExists {
                path: report::value_path(&self.doc(), parent, sid, &value),
            }),
            (Some(id), Some(_)) => {
                self.changes.supplied.insert(id);
                Ok(Some(id))
            }
            (Some(id), None) => {
                if let NodeKind::LeafList { values } = &mut self.tree.node_mut(id).kind {
                    values.push(value);
                }
                self.changes.record(&self.tree, id, TouchKind::Modified);
                self.changes.supplied.insert(id);
                Ok(Some(id))
            }
            (None, _) => {
                let holder = self.holder_for(parent, sid);
                let id = self.tree.add(
                    holder,
                    sid,
                    NodeKind::LeafList {
                        values: vec![value],
                    },
                );
                self.created(id);
                Ok(Some(id))
            }
        }
    }

    fn apply_opaque(
        &mut self,
        parent: NodeId,
        sid: SchemaId,
        edit: &EditNode,
        op: EditOperation,
    ) -> Result<Option<NodeId>> {
        let existing = self.tree.find_child(parent, sid);
        match (op, existing) {
            (EditOperation::Create, Some(_)) => Err(ValidationError::DataExists {
                path: self.path(parent, sid),
            }),
            (EditOperation::Delete, None) => Err(ValidationError::DataMissing {
                path: self.path(parent, sid),
            }),
            (EditOperation::Remove, None) => Ok(None),
            (EditOperation::Delete | EditOperation::Remove, Some(id)) => {
                self.delete(id);
                Ok(None)
            }
            (_, existing) => {
                let content = match &edit.content {
                    EditContent::Opaque(json) => json.clone(),
                    EditContent::Value(v) => v.to_json(),
                    EditContent::Children(_) | EditContent::None => serde_json::Value::Null,
                };
                match existing {
                    Some(id) => {
                        if let NodeKind::Opaque { content: current } =
                            &mut self.tree.node_mut(id).kind
                        {
                            if *current != content {
                                *current = content;
                                self.changes.record(&self.tree, id, TouchKind::Modified);
                            }
                        }
                        self.changes.supplied.insert(id);
                        Ok(Some(id))
                    }
                    None => {
                        let holder = self.holder_for(parent, sid);
                        let id = self.tree.add(holder, sid, NodeKind::Opaque { content });
                        self.created(id);
                        Ok(Some(id))
                    }
                }
            }
        }
    }

    /// Drop everything under `holder` that a `replace` did not mention
    fn prune_unmentioned(&mut self, holder: NodeId, holder_schema: SchemaId, mentioned: &Mentioned) {
        for child in self.tree.child_nodes(holder) {
            let sid = self.tree.schema_of(child);
            if self.schema.node(holder_schema).is_key(sid) {
                continue;
            }
            match &self.tree.node(child).kind {
                NodeKind::List { entries } => {
                    for entry in entries.clone() {
                        if !mentioned.nodes.contains(&entry) {
                            self.delete(entry);
                        }
                    }
                }
                NodeKind::LeafList { values } => match mentioned.values.get(&sid) {
                    Some(keep) => {
                        let stale: Vec<usize> = values
                            .iter()
                            .enumerate()
                            .filter(|(_, v)| !keep.contains(v))
                            .map(|(i, _)| i)
                            .collect();
                        for at in stale.into_iter().rev() {
                            self.remove_value(child, at);
                        }
                    }
                    None => self.delete(child),
                },
                _ => {
                    if !mentioned.nodes.contains(&child) {
                        self.delete(child);
                    }
                }
            }
        }
    }

    /// Holder for a new child of `parent`, selecting the cases on the way
    ///
    /// Selecting a case drops whichever other case of the same choice was
    /// present.
    fn holder_for(&mut self, parent: NodeId, sid: SchemaId) -> NodeId {
        let mut cur = parent;
        for (choice, case) in self.schema.choice_chain(sid) {
            let active = self
                .tree
                .find_choice(cur, choice)
                .and_then(|w| self.tree.held(w).first().copied());
            if let Some(old) = active {
                if self.tree.schema_of(old) != case {
                    self.drop_case(old);
                }
            }

            let wrapper = match self.tree.find_choice(cur, choice) {
                Some(w) => w,
                None => self.tree.add(cur, choice, NodeKind::Choice { case: None }),
            };
            cur = match self.tree.held(wrapper).first().copied() {
                Some(c) => c,
                None => self.tree.add(wrapper, case, NodeKind::Case { children: vec![] }),
            };
        }
        cur
    }

    fn drop_case(&mut self, case: NodeId) {
        tracing::debug!(
            case = %self.schema.node(self.tree.schema_of(case)).name,
            "switching choice case"
        );
        for child in self.tree.child_nodes(case) {
            self.changes.record(&self.tree, child, TouchKind::Deleted);
        }
        self.tree.detach(case);
    }

    fn delete(&mut self, id: NodeId) {
        self.changes.record(&self.tree, id, TouchKind::Deleted);
        self.tree.detach(id);
    }

    fn remove_value(&mut self, leaf_list: NodeId, at: usize) {
        let emptied = match &mut self.tree.node_mut(leaf_list).kind {
            NodeKind::LeafList { values } if values.len() > 1 => {
                values.remove(at);
                false
            }
            _ => true,
        };
        if emptied {
            self.delete(leaf_list);
        } else {
            self.changes.record(&self.tree, leaf_list, TouchKind::Modified);
        }
    }

    fn created(&mut self, id: NodeId) {
        self.changes.record(&self.tree, id, TouchKind::Created);
        self.changes.supplied.insert(id);
    }

    fn parse(&self, path: &str, sid: SchemaId, raw: &Value) -> Result<Value> {
        self.schema
            .parse_value(sid, &raw.to_string())
            .map_err(|reason| ValidationError::InvalidValue {
                path: path.to_string(),
                reason,
            })
    }

    fn path(&self, parent: NodeId, sid: SchemaId) -> String {
        report::child_path(&self.doc(), parent, sid)
    }

    fn doc(&self) -> Document<'_> {
        Document::new(self.schema, &self.tree)
    }
}
