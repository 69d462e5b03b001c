//! Schema node metadata

use crate::errors::ErrorTag;
use crate::schema::value::LeafType;
use crate::xpath::CompiledExpr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(pub(crate) u32);

impl SchemaId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub(crate) u32);

impl ModuleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    Container,
    List,
    LeafList,
    Leaf,
    Choice,
    Case,
    Opaque,
}

impl SchemaKind {
    /// Choice and case never appear in paths or XPath node-sets
    pub fn is_data(&self) -> bool {
        !matches!(self, SchemaKind::Choice | SchemaKind::Case)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub prefix: String,
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub module: ModuleId,
    pub name: String,
    /// Direct bases, as indices into the identity table
    pub bases: Vec<usize>,
}

/// A compiled `when` or `must` expression with its diagnostic metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub expr: CompiledExpr,
    pub error_message: Option<String>,
    pub error_app_tag: Option<String>,
    /// Overrides the `operation-failed` tag of a must violation
    pub error_tag: Option<ErrorTag>,
}

impl Constraint {
    pub fn new(text: &str) -> Self {
        Self {
            expr: CompiledExpr::compile(text),
            error_message: None,
            error_app_tag: None,
            error_tag: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub id: SchemaId,
    pub module: ModuleId,
    pub name: String,
    pub kind: SchemaKind,
    pub parent: Option<SchemaId>,
    pub children: Vec<SchemaId>,
    /// Key leaves in declaration order (lists only)
    pub keys: Vec<SchemaId>,
    pub mandatory: bool,
    pub presence: bool,
    /// Lexical defaults; leaf-lists may carry several
    pub defaults: Vec<String>,
    pub leaf_type: Option<LeafType>,
    pub when: Option<Constraint>,
    pub musts: Vec<Constraint>,
    pub mount_point: bool,
    pub default_case: Option<SchemaId>,
    /// Instantiating this node (if absent) would produce default data
    pub has_defaults: bool,
}

impl SchemaNode {
    pub(crate) fn new(
        id: SchemaId,
        module: ModuleId,
        name: &str,
        kind: SchemaKind,
        parent: Option<SchemaId>,
    ) -> Self {
        Self {
            id,
            module,
            name: name.to_string(),
            kind,
            parent,
            children: Vec::new(),
            keys: Vec::new(),
            mandatory: false,
            presence: false,
            defaults: Vec::new(),
            leaf_type: None,
            when: None,
            musts: Vec::new(),
            mount_point: false,
            default_case: None,
            has_defaults: false,
        }
    }

    pub fn is_key(&self, child: SchemaId) -> bool {
        self.keys.contains(&child)
    }

    /// Non-presence containers exist only to hold children
    pub fn is_np_container(&self) -> bool {
        self.kind == SchemaKind::Container && !self.presence
    }
}
