use thiserror::Error;
use yangval_core_types::{RequestId, TransactionId};

/// Result type alias using ValidationError
pub type Result<T> = std::result::Result<T, ValidationError>;

pub const APP_TAG_WHEN_VIOLATION: &str = "when-violation";
pub const APP_TAG_MUST_VIOLATION: &str = "must-violation";
pub const APP_TAG_INSTANCE_REQUIRED: &str = "instance-required";

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every kind maps to a stable error code used for programmatic handling,
/// log correlation and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // Structural
    UnknownNode,
    DuplicateKey,
    MissingKey,
    DataExists,
    DataMissing,
    InvalidValue,

    // Constraint phase
    MandatoryMissing,
    WhenViolation,
    MustViolation,

    // Engine
    DefaultPassDiverged,
    Internal,
}

impl ErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::UnknownNode => "ERR_UNKNOWN_NODE",
            ErrorKind::DuplicateKey => "ERR_DUPLICATE_KEY",
            ErrorKind::MissingKey => "ERR_MISSING_KEY",
            ErrorKind::DataExists => "ERR_DATA_EXISTS",
            ErrorKind::DataMissing => "ERR_DATA_MISSING",
            ErrorKind::InvalidValue => "ERR_INVALID_VALUE",
            ErrorKind::MandatoryMissing => "ERR_MANDATORY_MISSING",
            ErrorKind::WhenViolation => "ERR_WHEN_VIOLATION",
            ErrorKind::MustViolation => "ERR_MUST_VIOLATION",
            ErrorKind::DefaultPassDiverged => "ERR_DEFAULT_PASS_DIVERGED",
            ErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Structural errors pre-empt the constraint phase entirely
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ErrorKind::UnknownNode
                | ErrorKind::DuplicateKey
                | ErrorKind::MissingKey
                | ErrorKind::DataExists
                | ErrorKind::DataMissing
                | ErrorKind::InvalidValue
        )
    }
}

/// NETCONF `error-tag` values emitted by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorTag {
    OperationFailed,
    DataMissing,
    UnknownElement,
    DataExists,
    InvalidValue,
    MissingElement,
}

impl ErrorTag {
    /// Wire spelling of the tag
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorTag::OperationFailed => "operation-failed",
            ErrorTag::DataMissing => "data-missing",
            ErrorTag::UnknownElement => "unknown-element",
            ErrorTag::DataExists => "data-exists",
            ErrorTag::InvalidValue => "invalid-value",
            ErrorTag::MissingElement => "missing-element",
        }
    }
}

impl std::fmt::Display for ErrorTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// NETCONF `error-type`. Validation only ever reports application errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    Application,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Application => "application",
        }
    }
}

/// NETCONF `error-severity`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    Error,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Error => "error",
        }
    }
}

/// Canonical structured error returned across the datastore boundary
///
/// Carries the wire fields of an `rpc-error` plus classification and
/// correlation context.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    kind: ErrorKind,
    error_type: ErrorType,
    error_tag: ErrorTag,
    error_severity: ErrorSeverity,
    error_app_tag: String,
    error_path: String,
    error_message: String,
    txn_id: Option<TransactionId>,
    request_id: Option<RequestId>,
}

impl RpcError {
    /// Create a new error of the given kind with the kind's default tag
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            error_type: ErrorType::Application,
            error_tag: default_tag(kind),
            error_severity: ErrorSeverity::Error,
            error_app_tag: String::new(),
            error_path: String::new(),
            error_message: String::new(),
            txn_id: None,
            request_id: None,
        }
    }

    /// Override the error tag
    pub fn with_tag(mut self, tag: ErrorTag) -> Self {
        self.error_tag = tag;
        self
    }

    /// Add the error-app-tag
    pub fn with_app_tag(mut self, app_tag: impl Into<String>) -> Self {
        self.error_app_tag = app_tag.into();
        self
    }

    /// Add the instance-identifier error path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.error_path = path.into();
        self
    }

    /// Add the error message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    /// Add transaction context
    pub fn with_txn_id(mut self, txn_id: TransactionId) -> Self {
        self.txn_id = Some(txn_id);
        self
    }

    /// Add request context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    pub fn error_tag(&self) -> ErrorTag {
        self.error_tag
    }

    pub fn error_severity(&self) -> ErrorSeverity {
        self.error_severity
    }

    pub fn error_app_tag(&self) -> &str {
        &self.error_app_tag
    }

    pub fn error_path(&self) -> &str {
        &self.error_path
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn txn_id(&self) -> Option<&TransactionId> {
        self.txn_id.as_ref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }
}

fn default_tag(kind: ErrorKind) -> ErrorTag {
    match kind {
        ErrorKind::UnknownNode => ErrorTag::UnknownElement,
        ErrorKind::DuplicateKey => ErrorTag::OperationFailed,
        ErrorKind::MissingKey => ErrorTag::MissingElement,
        ErrorKind::DataExists => ErrorTag::DataExists,
        ErrorKind::DataMissing => ErrorTag::DataMissing,
        ErrorKind::InvalidValue => ErrorTag::InvalidValue,
        ErrorKind::MandatoryMissing => ErrorTag::DataMissing,
        ErrorKind::WhenViolation => ErrorTag::UnknownElement,
        ErrorKind::MustViolation => ErrorTag::OperationFailed,
        ErrorKind::DefaultPassDiverged => ErrorTag::OperationFailed,
        ErrorKind::Internal => ErrorTag::OperationFailed,
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.error_tag)?;
        if !self.error_app_tag.is_empty() {
            write!(f, " ({})", self.error_app_tag)?;
        }
        if !self.error_message.is_empty() {
            write!(f, ": {}", self.error_message)?;
        }
        if !self.error_path.is_empty() {
            write!(f, " at {}", self.error_path)?;
        }
        Ok(())
    }
}

impl std::error::Error for RpcError {}

// ========== End Error Facility ==========

/// Error taxonomy for a single edit transaction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    // ===== Structural Errors =====
    /// The edit names a node the schema does not define at that location
    #[error("Unknown element '{name}' at {path}")]
    UnknownNode { path: String, name: String },

    /// Two list entries in one edit carry the same key values
    #[error("Duplicate list entry {path}")]
    DuplicateKey { path: String },

    /// A list entry in the edit does not carry all of its keys
    #[error("List entry {path} is missing key '{key}'")]
    MissingKey { path: String, key: String },

    /// `create` targeted a node that already exists
    #[error("Data already exists: {path}")]
    DataExists { path: String },

    /// `delete` targeted a node that does not exist
    #[error("Data does not exist: {path}")]
    DataMissing { path: String },

    /// A value does not conform to the leaf type, or a key was changed
    #[error("Invalid value at {path}: {reason}")]
    InvalidValue { path: String, reason: String },

    // ===== Constraint Errors =====
    /// A mandatory node is absent from a surviving parent
    #[error("{message}")]
    MandatoryMissing { path: String, message: String },

    /// A node exists although its `when` condition is false
    #[error("Violate when constraints: {expr}")]
    WhenViolation { path: String, expr: String },

    /// A `must` expression evaluated false
    #[error("{message}")]
    MustViolation {
        path: String,
        message: String,
        app_tag: String,
        /// Declared error-tag; `operation-failed` when absent
        error_tag: Option<ErrorTag>,
    },

    // ===== Engine Errors =====
    /// Default instantiation and when-removal never settled
    #[error("Default pass did not settle after {passes} passes")]
    DefaultPassDiverged { passes: usize },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::UnknownNode { .. } => ErrorKind::UnknownNode,
            ValidationError::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            ValidationError::MissingKey { .. } => ErrorKind::MissingKey,
            ValidationError::DataExists { .. } => ErrorKind::DataExists,
            ValidationError::DataMissing { .. } => ErrorKind::DataMissing,
            ValidationError::InvalidValue { .. } => ErrorKind::InvalidValue,
            ValidationError::MandatoryMissing { .. } => ErrorKind::MandatoryMissing,
            ValidationError::WhenViolation { .. } => ErrorKind::WhenViolation,
            ValidationError::MustViolation { .. } => ErrorKind::MustViolation,
            ValidationError::DefaultPassDiverged { .. } => ErrorKind::DefaultPassDiverged,
            ValidationError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Error path of the offending node, empty for engine errors
    pub fn path(&self) -> &str {
        match self {
            ValidationError::UnknownNode { path, .. }
            | ValidationError::DuplicateKey { path }
            | ValidationError::MissingKey { path, .. }
            | ValidationError::DataExists { path }
            | ValidationError::DataMissing { path }
            | ValidationError::InvalidValue { path, .. }
            | ValidationError::MandatoryMissing { path, .. }
            | ValidationError::WhenViolation { path, .. }
            | ValidationError::MustViolation { path, .. } => path,
            ValidationError::DefaultPassDiverged { .. } | ValidationError::Internal { .. } => "",
        }
    }
}

/// Conversion from ValidationError to the wire-level RpcError
impl From<ValidationError> for RpcError {
    fn from(err: ValidationError) -> Self {
        let message = err.to_string();
        match err {
            ValidationError::UnknownNode { path, .. } => RpcError::new(ErrorKind::UnknownNode)
                .with_path(path)
                .with_app_tag("unknown-element")
                .with_message(message),

            ValidationError::DuplicateKey { path } => RpcError::new(ErrorKind::DuplicateKey)
                .with_path(path)
                .with_app_tag("data-not-unique")
                .with_message(message),

            ValidationError::MissingKey { path, .. } => RpcError::new(ErrorKind::MissingKey)
                .with_path(path)
                .with_app_tag("missing-key")
                .with_message(message),

            ValidationError::DataExists { path } => RpcError::new(ErrorKind::DataExists)
                .with_path(path)
                .with_app_tag("data-exists")
                .with_message(message),

            ValidationError::DataMissing { path } => RpcError::new(ErrorKind::DataMissing)
                .with_path(path)
                .with_app_tag("data-missing")
                .with_message(message),

            ValidationError::InvalidValue { path, .. } => RpcError::new(ErrorKind::InvalidValue)
                .with_path(path)
                .with_app_tag("invalid-value")
                .with_message(message),

            ValidationError::MandatoryMissing { path, message } => {
                RpcError::new(ErrorKind::MandatoryMissing)
                    .with_path(path)
                    .with_app_tag(APP_TAG_INSTANCE_REQUIRED)
                    .with_message(message)
            }

            ValidationError::WhenViolation { path, .. } => RpcError::new(ErrorKind::WhenViolation)
                .with_path(path)
                .with_app_tag(APP_TAG_WHEN_VIOLATION)
                .with_message(message),

            ValidationError::MustViolation {
                path,
                message,
                app_tag,
                error_tag,
            } => {
                let rpc = RpcError::new(ErrorKind::MustViolation)
                    .with_path(path)
                    .with_app_tag(app_tag)
                    .with_message(message);
                match error_tag {
                    Some(tag) => rpc.with_tag(tag),
                    None => rpc,
                }
            }

            ValidationError::DefaultPassDiverged { .. } => {
                RpcError::new(ErrorKind::DefaultPassDiverged).with_message(message)
            }

            ValidationError::Internal { .. } => {
                RpcError::new(ErrorKind::Internal).with_message(message)
            }
        }
    }
}
