//! yangval Core - constraint validation for YANG-modelled configuration
//!
//! This crate provides the in-memory validation kernel for a configuration
//! datastore, including:
//! - A schema index and builder standing in for compiled YANG modules
//! - An arena-backed data tree with NETCONF edit-config application
//! - An XPath 1.0 compiler and evaluator with YANG extension functions
//! - Static dependency tracking between constraints and the data they read
//! - The transaction state machine that injects defaults and checks
//!   mandatory, `when` and `must` constraints
//! - Schema-mount aware prefix and root resolution
//! - NETCONF `rpc-error` construction with instance-identifier paths

pub mod config;
pub mod deps;
pub mod errors;
pub mod logging_facility;
pub mod mount;
pub mod report;
pub mod schema;
pub mod tree;
pub mod validate;
pub mod xpath;

// Re-export commonly used types
pub use config::{EngineConfig, ImpactPolicy};
pub use deps::DependencyGraph;
pub use errors::{ErrorKind, ErrorTag, Result, RpcError, ValidationError};
pub use schema::{SchemaBuilder, SchemaIndex};
pub use tree::{DataTree, EditDiff, EditNode, EditOperation, NodeRef};
pub use validate::{Commit, Transaction, TxnState};
