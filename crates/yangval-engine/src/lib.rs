//! yangval Engine - datastore facade
//!
//! Owns the committed configuration tree and runs every edit through a
//! validation transaction from `yangval-core`. A failed edit leaves the
//! committed tree exactly as it was.
//!
//! ## Logging Ownership
//!
//! The engine layer owns lifecycle logging for datastore operations:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure
//!
//! Lower layers use only `tracing::debug!()`/`trace!()` for internal details.

pub mod datastore;
pub mod history;

pub use datastore::{Datastore, EditResult};
pub use history::{CommitHistory, CommitRecord};
