//! Field keys and event names shared by every structured log line
//!
//! `tracing` field names are identifiers at the call site, so the macros in
//! `yangval-core` spell them out literally; readers of captured events use
//! these constants.

pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_TXN_ID: &str = "txn_id";
pub const FIELD_REQUEST_ID: &str = "request_id";

// Failure fields, emitted by `log_op_error!`
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";
pub const FIELD_ERROR_PATH: &str = "error_path";

pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
