//! Correlation identifiers
//!
//! Every edit transaction gets a `TransactionId`; the session layer may
//! attach its own `RequestId` (typically the NETCONF `message-id`) and a
//! `TraceId` so that validation diagnostics can be joined with transport
//! logs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! correlation_id {
    ($(#[$doc:meta])* $name:ident, $generate:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new() -> Self {
                Self($generate.to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Wrap an identifier minted elsewhere
            pub fn from_string(s: String) -> Self {
                Self(s)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

correlation_id!(
    /// One edit transaction (one candidate tree); UUIDv7, so ids sort by
    /// creation time
    TransactionId,
    Uuid::now_v7()
);

correlation_id!(
    /// One request as seen by the session layer
    RequestId,
    Uuid::new_v4()
);

correlation_id!(
    /// Distributed trace spanning several requests
    TraceId,
    Uuid::now_v7()
);

/// Identifiers carried through one `apply_edit_config` call
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub txn_id: TransactionId,
    pub request_id: Option<RequestId>,
    pub trace_id: Option<TraceId>,
}

impl RequestContext {
    /// Fresh transaction id, no caller identifiers
    pub fn new() -> Self {
        Self {
            txn_id: TransactionId::new(),
            request_id: None,
            trace_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
