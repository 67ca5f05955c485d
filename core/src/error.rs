use serde::Serialize;

/// Structured failure body, designed for agents reading tool and resource results.
/// Every failure carries a machine code plus the message that should be surfaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (see [`codes`])
    pub error: String,
    /// Human/agent-readable description of what went wrong
    pub message: String,
    /// Which argument caused the error (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// HTTP status returned by the remote, when the failure came from the wire
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Non-zero `code` from the remote response envelope
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_code: Option<i64>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            field: None,
            http_status: None,
            remote_code: None,
        }
    }
}

/// Error codes used across the adapter
pub mod codes {
    pub const INVALID_REQUEST: &str = "invalid_request";
    pub const TRANSPORT_ERROR: &str = "transport_error";
    pub const REMOTE_API_ERROR: &str = "remote_api_error";
    pub const NOT_FOUND: &str = "not_found";
}
