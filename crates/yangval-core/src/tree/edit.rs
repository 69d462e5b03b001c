//! Edit diffs: the inventory of structural operations a client submits
//!
//! An `EditDiff` mirrors the shape of the data tree. Each node names a
//! schema child of its parent and optionally carries an explicit operation;
//! without one it inherits its parent's effective operation, and top-level
//! nodes inherit the diff's default operation.
//!
//! ```
//! use yangval_core::tree::{EditDiff, EditNode, EditOperation};
//!
//! let diff = EditDiff::new().with_node(
//!     EditNode::new("val:validation").child(
//!         EditNode::new("must-validation")
//!             .child(EditNode::leaf("name", "must3"))
//!             .with_operation(EditOperation::Create),
//!     ),
//! );
//! assert_eq!(diff.nodes.len(), 1);
//! ```

use std::fmt;

use crate::schema::Value;

/// NETCONF edit-config operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditOperation {
    /// Add the node; fails if it already exists
    Create,
    /// Add or update the node, leaving unmentioned content alone
    Merge,
    /// Merge, then drop unmentioned non-key children
    Replace,
    /// Drop the node; fails if it does not exist
    Delete,
    /// Drop the node if it exists
    Remove,
}

impl EditOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditOperation::Create => "create",
            EditOperation::Merge => "merge",
            EditOperation::Replace => "replace",
            EditOperation::Delete => "delete",
            EditOperation::Remove => "remove",
        }
    }

    pub fn is_removal(&self) -> bool {
        matches!(self, EditOperation::Delete | EditOperation::Remove)
    }
}

impl fmt::Display for EditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditContent {
    /// Container or list entry content; list entries carry their keys here
    Children(Vec<EditNode>),
    /// Leaf value, or one leaf-list value
    Value(Value),
    /// Untyped content for an opaque node
    Opaque(serde_json::Value),
    /// Nothing; used to address a whole leaf or leaf-list for removal
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditNode {
    /// `prefix:local`, `module-name:local` or bare `local`
    pub name: String,
    pub operation: Option<EditOperation>,
    pub content: EditContent,
}

impl EditNode {
    /// Container or list entry
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operation: None,
            content: EditContent::Children(Vec::new()),
        }
    }

    /// Leaf, or one value of a leaf-list
    pub fn leaf(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            operation: None,
            content: EditContent::Value(value.into()),
        }
    }

    pub fn opaque(name: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            operation: None,
            content: EditContent::Opaque(content),
        }
    }

    /// Address a node by name alone, typically with `delete` or `remove`
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operation: None,
            content: EditContent::None,
        }
    }

    /// Append a child; turns value content into children
    pub fn child(mut self, child: EditNode) -> Self {
        match &mut self.content {
            EditContent::Children(children) => children.push(child),
            _ => self.content = EditContent::Children(vec![child]),
        }
        self
    }

    pub fn with_operation(mut self, operation: EditOperation) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn children(&self) -> &[EditNode] {
        match &self.content {
            EditContent::Children(children) => children,
            _ => &[],
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match &self.content {
            EditContent::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// A complete edit-config request body
#[derive(Debug, Clone, PartialEq)]
pub struct EditDiff {
    pub nodes: Vec<EditNode>,
    pub default_operation: EditOperation,
}

impl Default for EditDiff {
    fn default() -> Self {
        Self::new()
    }
}

impl EditDiff {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            default_operation: EditOperation::Merge,
        }
    }

    pub fn with_node(mut self, node: EditNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_default_operation(mut self, operation: EditOperation) -> Self {
        self.default_operation = operation;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
