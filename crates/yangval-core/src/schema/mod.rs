//! Compiled schema: module set, node metadata and compiled constraints

pub mod builder;
pub mod index;
pub mod node;
pub mod value;

pub use builder::{SchemaBuilder, SchemaError};
pub use index::{MountedModules, SchemaIndex};
pub use node::{Constraint, Identity, Module, ModuleId, SchemaId, SchemaKind, SchemaNode};
pub use value::{LeafType, Value};
