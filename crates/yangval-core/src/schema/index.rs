//! Read-only schema index
//!
//! Nodes live in one vector addressed by `SchemaId`; id 0 is a nameless
//! container standing for the document root. Ids are assigned in
//! declaration order, so siblings sort by id in schema order.

use std::collections::BTreeMap;

use crate::mount;
use crate::schema::node::{Identity, Module, ModuleId, SchemaId, SchemaKind, SchemaNode};
use crate::schema::value::{LeafType, Value};

/// Module set governing the data beneath a mount point
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountedModules {
    pub prefixes: BTreeMap<String, ModuleId>,
}

#[derive(Debug, Clone)]
pub struct SchemaIndex {
    pub(crate) nodes: Vec<SchemaNode>,
    pub(crate) modules: Vec<Module>,
    pub(crate) identities: Vec<Identity>,
    pub(crate) mounts: BTreeMap<SchemaId, MountedModules>,
}

impl SchemaIndex {
    pub const ROOT: SchemaId = SchemaId(0);
    pub(crate) const ROOT_MODULE: ModuleId = ModuleId(0);

    pub(crate) fn empty() -> Self {
        Self {
            nodes: vec![SchemaNode::new(
                Self::ROOT,
                Self::ROOT_MODULE,
                "",
                SchemaKind::Container,
                None,
            )],
            modules: vec![Module {
                name: String::new(),
                prefix: String::new(),
                namespace: String::new(),
            }],
            identities: Vec::new(),
            mounts: BTreeMap::new(),
        }
    }

    pub fn node(&self, id: SchemaId) -> &SchemaNode {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn ids(&self) -> impl Iterator<Item = SchemaId> + '_ {
        (0..self.nodes.len() as u32).map(SchemaId)
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.index()]
    }

    /// Module owning a node
    pub fn module_of(&self, id: SchemaId) -> &Module {
        self.module(self.node(id).module)
    }

    pub fn module_by_name(&self, name: &str) -> Option<ModuleId> {
        self.modules
            .iter()
            .skip(1)
            .position(|m| m.name == name)
            .map(|i| ModuleId(i as u32 + 1))
    }

    pub fn module_by_prefix(&self, prefix: &str) -> Option<ModuleId> {
        self.modules
            .iter()
            .skip(1)
            .position(|m| m.prefix == prefix)
            .map(|i| ModuleId(i as u32 + 1))
    }

    pub fn mounted_modules(&self, mount_point: SchemaId) -> Option<&MountedModules> {
        self.mounts.get(&mount_point)
    }

    /// Children as they appear in data: choice and case are flattened away
    pub fn data_children(&self, id: SchemaId) -> Vec<SchemaId> {
        let mut out = Vec::new();
        self.collect_data_children(id, &mut out);
        out
    }

    fn collect_data_children(&self, id: SchemaId, out: &mut Vec<SchemaId>) {
        for &child in &self.node(id).children {
            if self.node(child).kind.is_data() {
                out.push(child);
            } else {
                self.collect_data_children(child, out);
            }
        }
    }

    /// Find a data child by local name, optionally restricted to a module
    pub fn find_data_child(
        &self,
        parent: SchemaId,
        module: Option<ModuleId>,
        local: &str,
    ) -> Option<SchemaId> {
        self.data_children(parent).into_iter().find(|&c| {
            let node = self.node(c);
            node.name == local && module.map_or(true, |m| node.module == m)
        })
    }

    /// Resolve `prefix:local` or a bare `local` name below `parent`
    ///
    /// The prefix may be a module prefix or a module name.
    pub fn resolve_child(&self, parent: SchemaId, qname: &str) -> Option<SchemaId> {
        match qname.split_once(':') {
            Some((prefix, local)) => {
                let module = mount::resolve_prefix(self, parent, prefix)?;
                self.find_data_child(parent, Some(module), local)
            }
            None => self.find_data_child(parent, None, qname),
        }
    }

    /// Nearest data ancestor; `None` only for the root
    pub fn data_parent(&self, id: SchemaId) -> Option<SchemaId> {
        let mut cur = self.node(id).parent;
        while let Some(p) = cur {
            if self.node(p).kind.is_data() {
                return Some(p);
            }
            cur = self.node(p).parent;
        }
        None
    }

    /// `(choice, case)` pairs between a node and its data parent, outermost
    /// first
    pub fn choice_chain(&self, id: SchemaId) -> Vec<(SchemaId, SchemaId)> {
        let mut chain = Vec::new();
        let mut cur = id;
        while let Some(p) = self.node(cur).parent {
            match self.node(p).kind {
                SchemaKind::Case => {
                    if let Some(choice) = self.node(p).parent {
                        chain.push((choice, p));
                        cur = choice;
                        continue;
                    }
                    break;
                }
                _ => break,
            }
        }
        chain.reverse();
        chain
    }

    /// Strict ancestor test along schema parent links
    pub fn is_ancestor(&self, ancestor: SchemaId, id: SchemaId) -> bool {
        let mut cur = self.node(id).parent;
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.node(p).parent;
        }
        false
    }

    /// Data ancestors from the node itself up to and including the root
    pub fn data_ancestors_or_self(&self, id: SchemaId) -> Vec<SchemaId> {
        let mut out = vec![id];
        let mut cur = id;
        while let Some(p) = self.data_parent(cur) {
            out.push(p);
            cur = p;
        }
        out
    }

    /// Nearest common data ancestor-or-self of two nodes
    pub fn common_data_ancestor(&self, a: SchemaId, b: SchemaId) -> SchemaId {
        let chain_a = self.data_ancestors_or_self(a);
        let chain_b = self.data_ancestors_or_self(b);
        chain_a
            .into_iter()
            .find(|x| chain_b.contains(x))
            .unwrap_or(Self::ROOT)
    }

    /// All strict data descendants in schema order
    pub fn data_descendants(&self, id: SchemaId) -> Vec<SchemaId> {
        let mut out = Vec::new();
        let mut stack: Vec<SchemaId> = self.data_children(id).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.data_children(next).into_iter().rev());
        }
        out
    }

    /// Nearest strict ancestor that is a mount point
    pub fn nearest_mount(&self, id: SchemaId) -> Option<SchemaId> {
        let mut cur = self.node(id).parent;
        while let Some(p) = cur {
            if self.node(p).mount_point {
                return Some(p);
            }
            cur = self.node(p).parent;
        }
        None
    }

    pub fn identity(&self, idx: usize) -> &Identity {
        &self.identities[idx]
    }

    /// `prefix:name` form of an identity
    pub fn identity_qname(&self, idx: usize) -> String {
        let identity = self.identity(idx);
        format!("{}:{}", self.module(identity.module).prefix, identity.name)
    }

    /// Resolve `prefix:name` (or `module:name`, or a bare name in
    /// `default_module`) in the prefix scope of `scope`
    pub fn resolve_identity(
        &self,
        scope: SchemaId,
        default_module: ModuleId,
        text: &str,
    ) -> Option<usize> {
        let (module, name) = match text.split_once(':') {
            Some((prefix, name)) => (mount::resolve_prefix(self, scope, prefix)?, name),
            None => (default_module, text),
        };
        self.identities
            .iter()
            .position(|i| i.module == module && i.name == name)
    }

    /// `derived-from` / `derived-from-or-self` over the identity graph
    pub fn identity_derived_from(&self, identity: usize, base: usize, or_self: bool) -> bool {
        if identity == base {
            return or_self;
        }
        let mut stack = self.identity(identity).bases.clone();
        let mut seen = Vec::new();
        while let Some(next) = stack.pop() {
            if next == base {
                return true;
            }
            if !seen.contains(&next) {
                seen.push(next);
                stack.extend(self.identity(next).bases.iter().copied());
            }
        }
        false
    }

    /// Parse a lexical value for a leaf or leaf-list
    ///
    /// # Errors
    ///
    /// Returns the reason the text is not a value of the node's type.
    pub fn parse_value(&self, id: SchemaId, text: &str) -> Result<Value, String> {
        let node = self.node(id);
        let leaf_type = node
            .leaf_type
            .as_ref()
            .ok_or_else(|| format!("'{}' does not take a value", node.name))?;

        match leaf_type {
            LeafType::IdentityRef { base } => {
                let identity = self
                    .resolve_identity(id, node.module, text)
                    .ok_or_else(|| format!("unknown identity '{}'", text))?;
                let base_idx = self
                    .resolve_identity(id, node.module, base)
                    .ok_or_else(|| format!("unknown identity base '{}'", base))?;
                if !self.identity_derived_from(identity, base_idx, false) {
                    return Err(format!("identity '{}' is not derived from '{}'", text, base));
                }
                Ok(Value::Identity(self.identity_qname(identity)))
            }
            other => other.parse(text),
        }
    }

    /// Schema path with module prefixes, for diagnostics
    pub fn schema_path(&self, id: SchemaId) -> String {
        let mut segments = Vec::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            if c == Self::ROOT {
                break;
            }
            let node = self.node(c);
            segments.push(format!("{}:{}", self.module(node.module).prefix, node.name));
            cur = node.parent;
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }
}
