//! XPath 1.0 with the YANG extension functions
//!
//! Expressions are compiled once, when the schema is built, and evaluated
//! over a `Document` view of a data tree.

pub mod ast;
pub mod document;
pub mod eval;
mod functions;
pub mod parser;
pub mod value;

pub use ast::CompiledExpr;
pub use document::{Document, XNode};
pub use eval::{Context, Evaluator};
pub use value::XValue;
