use crate::schema::{SchemaId, Value};

/// Stable index of a node in a `DataTree` arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataNode {
    pub schema: SchemaId,
    /// Location-only back link; ownership flows from parent to child
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

/// One variant per schema kind, plus `Entry` for the members of a list
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Container { children: Vec<NodeId> },
    List { entries: Vec<NodeId> },
    Entry { children: Vec<NodeId> },
    LeafList { values: Vec<Value> },
    Leaf { value: Value },
    Choice { case: Option<NodeId> },
    Case { children: Vec<NodeId> },
    Opaque { content: serde_json::Value },
}

impl NodeKind {
    pub fn container() -> Self {
        NodeKind::Container {
            children: Vec::new(),
        }
    }

    /// Wrappers hold instances but are invisible to paths and XPath
    pub fn is_wrapper(&self) -> bool {
        matches!(
            self,
            NodeKind::List { .. } | NodeKind::Choice { .. } | NodeKind::Case { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Container { .. } => "container",
            NodeKind::List { .. } => "list",
            NodeKind::Entry { .. } => "entry",
            NodeKind::LeafList { .. } => "leaf-list",
            NodeKind::Leaf { .. } => "leaf",
            NodeKind::Choice { .. } => "choice",
            NodeKind::Case { .. } => "case",
            NodeKind::Opaque { .. } => "opaque",
        }
    }
}
