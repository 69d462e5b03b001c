//! Configuration data trees and the edits applied to them

pub mod apply;
pub mod data_tree;
pub mod edit;
pub mod json;
pub mod node;
pub mod view;

pub use apply::{apply, ChangeSet, TouchKind, Touched};
pub use data_tree::DataTree;
pub use edit::{EditContent, EditDiff, EditNode, EditOperation};
pub use node::{DataNode, NodeId, NodeKind};
pub use view::NodeRef;
