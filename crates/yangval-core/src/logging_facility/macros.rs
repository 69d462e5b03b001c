//! Canonical logging macros
//!
//! Every public datastore operation logs exactly one start event and exactly
//! one end or end_error event.

/// Log the start of an operation
///
/// ```
/// # use yangval_core::log_op_start;
/// log_op_start!("apply_edit_config");
/// log_op_start!("apply_edit_config", txn_id = "t-1");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = yangval_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = yangval_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// ```
/// # use yangval_core::log_op_end;
/// log_op_end!("apply_edit_config", duration_ms = 3);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = yangval_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = yangval_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation failure with its stable error code
///
/// `$err` is anything convertible into `RpcError`.
///
/// ```
/// # use yangval_core::{log_op_error, errors::ValidationError};
/// let err = ValidationError::DataMissing { path: "/a:x".to_string() };
/// log_op_error!("apply_edit_config", err, duration_ms = 1);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let rpc: $crate::errors::RpcError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = yangval_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?rpc.kind(),
            err.code = rpc.code(),
            error_path = rpc.error_path(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let rpc: $crate::errors::RpcError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = yangval_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?rpc.kind(),
            err.code = rpc.code(),
            error_path = rpc.error_path(),
            $($field)*
        );
    }};
}
