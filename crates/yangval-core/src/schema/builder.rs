//! Programmatic construction of a `SchemaIndex`
//!
//! Stands in for a compiled module set. Node names are written
//! `prefix:local`; an unprefixed name inherits its parent's module.
//! Problems are collected while building and the first one is reported by
//! `build()`.
//!
//! ```
//! use yangval_core::schema::{LeafType, SchemaBuilder};
//!
//! let mut b = SchemaBuilder::new();
//! b.module("validation", "val", "urn:example:validation");
//! let top = b.container(b.root(), "val:validation");
//! let list = b.list(top, "must-validation", &["name"]);
//! b.leaf(list, "name", LeafType::String);
//! b.leaf(list, "type", LeafType::String);
//! b.must(list, "type = 'must-type'");
//! let schema = b.build().unwrap();
//! assert_eq!(schema.schema_path(list), "/val:validation/val:must-validation");
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

use crate::errors::ErrorTag;
use crate::schema::index::{MountedModules, SchemaIndex};
use crate::schema::node::{
    Constraint, Identity, Module, ModuleId, SchemaId, SchemaKind, SchemaNode,
};
use crate::schema::value::LeafType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Unknown module or prefix '{name}'")]
    UnknownModule { name: String },

    #[error("Top-level node '{name}' must be module-qualified")]
    Unqualified { name: String },

    #[error("Duplicate node {path}")]
    DuplicateNode { path: String },

    #[error("'{child}' cannot be placed under {parent}")]
    InvalidParent { parent: String, child: String },

    #[error("List {list} has no key leaf '{key}'")]
    UnknownKey { list: String, key: String },

    #[error("Invalid default for {path}: {reason}")]
    InvalidDefault { path: String, reason: String },

    #[error("Unknown identity '{name}'")]
    UnknownIdentity { name: String },

    #[error("{path} has no case '{case}'")]
    UnknownCase { path: String, case: String },
}

pub struct SchemaBuilder {
    index: SchemaIndex,
    errors: Vec<SchemaError>,
    pending_keys: Vec<(SchemaId, Vec<String>)>,
    pending_bases: Vec<(usize, Vec<String>)>,
    pending_mounts: Vec<(SchemaId, Vec<String>)>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            index: SchemaIndex::empty(),
            errors: Vec::new(),
            pending_keys: Vec::new(),
            pending_bases: Vec::new(),
            pending_mounts: Vec::new(),
        }
    }

    pub fn root(&self) -> SchemaId {
        SchemaIndex::ROOT
    }

    pub fn module(&mut self, name: &str, prefix: &str, namespace: &str) -> ModuleId {
        self.index.modules.push(Module {
            name: name.to_string(),
            prefix: prefix.to_string(),
            namespace: namespace.to_string(),
        });
        ModuleId(self.index.modules.len() as u32 - 1)
    }

    /// Declare an identity; bases are resolved at build time
    pub fn identity(&mut self, qname: &str, bases: &[&str]) -> &mut Self {
        let Some((prefix, name)) = qname.split_once(':') else {
            self.errors.push(SchemaError::Unqualified {
                name: qname.to_string(),
            });
            return self;
        };
        let Some(module) = self.lookup_module(prefix) else {
            self.errors.push(SchemaError::UnknownModule {
                name: prefix.to_string(),
            });
            return self;
        };
        self.index.identities.push(Identity {
            module,
            name: name.to_string(),
            bases: Vec::new(),
        });
        let idx = self.index.identities.len() - 1;
        self.pending_bases
            .push((idx, bases.iter().map(|b| b.to_string()).collect()));
        self
    }

    pub fn container(&mut self, parent: SchemaId, name: &str) -> SchemaId {
        self.add(parent, name, SchemaKind::Container)
    }

    pub fn presence_container(&mut self, parent: SchemaId, name: &str) -> SchemaId {
        let id = self.add(parent, name, SchemaKind::Container);
        self.index.nodes[id.index()].presence = true;
        id
    }

    /// Declare a list; key leaves may be added afterwards
    pub fn list(&mut self, parent: SchemaId, name: &str, keys: &[&str]) -> SchemaId {
        let id = self.add(parent, name, SchemaKind::List);
        self.pending_keys
            .push((id, keys.iter().map(|k| k.to_string()).collect()));
        id
    }

    pub fn leaf(&mut self, parent: SchemaId, name: &str, leaf_type: LeafType) -> SchemaId {
        let id = self.add(parent, name, SchemaKind::Leaf);
        self.index.nodes[id.index()].leaf_type = Some(leaf_type);
        id
    }

    pub fn leaf_list(&mut self, parent: SchemaId, name: &str, leaf_type: LeafType) -> SchemaId {
        let id = self.add(parent, name, SchemaKind::LeafList);
        self.index.nodes[id.index()].leaf_type = Some(leaf_type);
        id
    }

    pub fn choice(&mut self, parent: SchemaId, name: &str) -> SchemaId {
        self.add(parent, name, SchemaKind::Choice)
    }

    pub fn case(&mut self, choice: SchemaId, name: &str) -> SchemaId {
        self.add(choice, name, SchemaKind::Case)
    }

    pub fn opaque(&mut self, parent: SchemaId, name: &str) -> SchemaId {
        self.add(parent, name, SchemaKind::Opaque)
    }

    /// Mark a container as a mount point governed by the named modules
    pub fn mount_point(&mut self, id: SchemaId, modules: &[&str]) -> &mut Self {
        self.index.nodes[id.index()].mount_point = true;
        self.pending_mounts
            .push((id, modules.iter().map(|m| m.to_string()).collect()));
        self
    }

    pub fn mandatory(&mut self, id: SchemaId) -> &mut Self {
        self.index.nodes[id.index()].mandatory = true;
        self
    }

    /// Add a lexical default (repeatable for leaf-lists)
    pub fn default_value(&mut self, id: SchemaId, text: &str) -> &mut Self {
        self.index.nodes[id.index()].defaults.push(text.to_string());
        self
    }

    pub fn default_case(&mut self, choice: SchemaId, case_name: &str) -> &mut Self {
        let case = self.index.nodes[choice.index()]
            .children
            .iter()
            .copied()
            .find(|&c| self.index.node(c).name == case_name);
        match case {
            Some(case) => self.index.nodes[choice.index()].default_case = Some(case),
            None => self.errors.push(SchemaError::UnknownCase {
                path: self.index.schema_path(choice),
                case: case_name.to_string(),
            }),
        }
        self
    }

    pub fn when(&mut self, id: SchemaId, text: &str) -> &mut Self {
        self.index.nodes[id.index()].when = Some(Constraint::new(text));
        self
    }

    pub fn must(&mut self, id: SchemaId, text: &str) -> &mut Self {
        self.index.nodes[id.index()].musts.push(Constraint::new(text));
        self
    }

    /// `must` with a custom error-message, error-app-tag and/or error-tag
    pub fn must_with(
        &mut self,
        id: SchemaId,
        text: &str,
        message: Option<&str>,
        app_tag: Option<&str>,
        error_tag: Option<ErrorTag>,
    ) -> &mut Self {
        let mut constraint = Constraint::new(text);
        constraint.error_message = message.map(str::to_string);
        constraint.error_app_tag = app_tag.map(str::to_string);
        constraint.error_tag = error_tag;
        self.index.nodes[id.index()].musts.push(constraint);
        self
    }

    /// Finish the index
    ///
    /// # Errors
    ///
    /// Returns the first problem recorded while building, or found while
    /// resolving keys, identity bases, mount module sets and defaults.
    pub fn build(mut self) -> Result<SchemaIndex, SchemaError> {
        self.resolve_keys();
        self.resolve_bases();
        self.resolve_mounts();
        self.check_defaults();
        self.compute_has_defaults();

        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.index),
        }
    }

    fn lookup_module(&self, name: &str) -> Option<ModuleId> {
        self.index
            .module_by_prefix(name)
            .or_else(|| self.index.module_by_name(name))
    }

    fn add(&mut self, parent: SchemaId, name: &str, kind: SchemaKind) -> SchemaId {
        let parent_node = self.index.node(parent);
        let parent_ok = match kind {
            SchemaKind::Case => parent_node.kind == SchemaKind::Choice,
            _ => matches!(
                parent_node.kind,
                SchemaKind::Container | SchemaKind::List | SchemaKind::Case
            ),
        };
        if !parent_ok {
            self.errors.push(SchemaError::InvalidParent {
                parent: self.index.schema_path(parent),
                child: name.to_string(),
            });
        }

        let (module, local) = match name.split_once(':') {
            Some((prefix, local)) => match self.lookup_module(prefix) {
                Some(m) => (m, local),
                None => {
                    self.errors.push(SchemaError::UnknownModule {
                        name: prefix.to_string(),
                    });
                    (parent_node.module, local)
                }
            },
            None => {
                if parent == SchemaIndex::ROOT {
                    self.errors.push(SchemaError::Unqualified {
                        name: name.to_string(),
                    });
                }
                (parent_node.module, name)
            }
        };

        if kind.is_data() {
            let data_parent = if self.index.node(parent).kind.is_data() {
                Some(parent)
            } else {
                self.index.data_parent(parent)
            };
            if let Some(dp) = data_parent {
                if self.index.find_data_child(dp, Some(module), local).is_some() {
                    self.errors.push(SchemaError::DuplicateNode {
                        path: format!("{}/{}", self.index.schema_path(dp), local),
                    });
                }
            }
        }

        let id = SchemaId(self.index.nodes.len() as u32);
        self.index
            .nodes
            .push(SchemaNode::new(id, module, local, kind, Some(parent)));
        self.index.nodes[parent.index()].children.push(id);
        id
    }

    fn resolve_keys(&mut self) {
        for (list, keys) in std::mem::take(&mut self.pending_keys) {
            let mut resolved = Vec::new();
            for key in keys {
                let found = self.index.node(list).children.iter().copied().find(|&c| {
                    let n = self.index.node(c);
                    n.name == key && n.kind == SchemaKind::Leaf
                });
                match found {
                    Some(k) => resolved.push(k),
                    None => self.errors.push(SchemaError::UnknownKey {
                        list: self.index.schema_path(list),
                        key,
                    }),
                }
            }
            self.index.nodes[list.index()].keys = resolved;
        }
    }

    fn resolve_bases(&mut self) {
        for (idx, bases) in std::mem::take(&mut self.pending_bases) {
            let module = self.index.identities[idx].module;
            for base in bases {
                let resolved = match base.split_once(':') {
                    Some((prefix, name)) => self.lookup_module(prefix).and_then(|m| {
                        self.index
                            .identities
                            .iter()
                            .position(|i| i.module == m && i.name == name)
                    }),
                    None => self
                        .index
                        .identities
                        .iter()
                        .position(|i| i.module == module && i.name == base),
                };
                match resolved {
                    Some(b) => self.index.identities[idx].bases.push(b),
                    None => self.errors.push(SchemaError::UnknownIdentity { name: base }),
                }
            }
        }
    }

    fn resolve_mounts(&mut self) {
        for (mount, modules) in std::mem::take(&mut self.pending_mounts) {
            let mut prefixes = BTreeMap::new();
            for name in modules {
                match self.lookup_module(&name) {
                    Some(m) => {
                        prefixes.insert(self.index.module(m).prefix.clone(), m);
                    }
                    None => self.errors.push(SchemaError::UnknownModule { name }),
                }
            }
            self.index.mounts.insert(mount, MountedModules { prefixes });
        }
    }

    fn check_defaults(&mut self) {
        for id in self.index.ids().collect::<Vec<_>>() {
            for text in &self.index.node(id).defaults {
                if let Err(reason) = self.index.parse_value(id, text) {
                    self.errors.push(SchemaError::InvalidDefault {
                        path: self.index.schema_path(id),
                        reason,
                    });
                }
            }
        }
    }

    /// Children always carry larger ids than their parents, so one reverse
    /// sweep settles the flag bottom-up
    fn compute_has_defaults(&mut self) {
        for i in (0..self.index.nodes.len()).rev() {
            let node = &self.index.nodes[i];
            let any_child = |index: &SchemaIndex| {
                node.children
                    .iter()
                    .any(|&c| index.node(c).has_defaults)
            };
            let has = match node.kind {
                SchemaKind::Leaf | SchemaKind::LeafList => !node.defaults.is_empty(),
                SchemaKind::Container => !node.presence && any_child(&self.index),
                SchemaKind::Case => any_child(&self.index),
                SchemaKind::Choice => node
                    .default_case
                    .map_or(false, |c| self.index.node(c).has_defaults),
                SchemaKind::List | SchemaKind::Opaque => false,
            };
            self.index.nodes[i].has_defaults = has;
        }
    }
}
