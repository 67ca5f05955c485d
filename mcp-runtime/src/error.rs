use emlog_core::error::{ErrorBody, codes};
use serde_json::Value;

/// Every failure an adapter call can produce.
///
/// `InvalidRequest` and `NotFound` are raised locally before any network
/// call. `Transport` and `RemoteApi` come back from the wire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    #[error("{message}")]
    InvalidRequest {
        message: String,
        field: Option<String>,
    },
    #[error("{}", transport_display(*status, message))]
    Transport { status: Option<u16>, message: String },
    #[error("{message}")]
    RemoteApi { code: i64, message: String },
    #[error("File not found: {path}")]
    NotFound { path: String },
}

fn transport_display(status: Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("HTTP {status}: {message}"),
        None => message.to_string(),
    }
}

impl AdapterError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        AdapterError::InvalidRequest {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AdapterError::InvalidRequest { .. } => codes::INVALID_REQUEST,
            AdapterError::Transport { .. } => codes::TRANSPORT_ERROR,
            AdapterError::RemoteApi { .. } => codes::REMOTE_API_ERROR,
            AdapterError::NotFound { .. } => codes::NOT_FOUND,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let mut body = ErrorBody::new(self.code(), self.to_string());
        match self {
            AdapterError::InvalidRequest { field, .. } => body.field = field.clone(),
            AdapterError::Transport { status, .. } => body.http_status = *status,
            AdapterError::RemoteApi { code, .. } => body.remote_code = Some(*code),
            AdapterError::NotFound { .. } => {}
        }
        body
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self.to_body()).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_api_error_displays_remote_message_verbatim() {
        let err = AdapterError::RemoteApi {
            code: 7,
            message: "bad password".to_string(),
        };
        assert_eq!(err.to_string(), "bad password");
        assert_eq!(err.code(), "remote_api_error");
        assert_eq!(err.to_value()["remote_code"], 7);
    }

    #[test]
    fn transport_error_prefixes_http_status_when_known() {
        let with_status = AdapterError::Transport {
            status: Some(502),
            message: "Bad Gateway".to_string(),
        };
        assert_eq!(with_status.to_string(), "HTTP 502: Bad Gateway");
        assert_eq!(with_status.to_value()["http_status"], 502);

        let without = AdapterError::Transport {
            status: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(without.to_string(), "connection refused");
        assert!(without.to_value().get("http_status").is_none());
    }

    #[test]
    fn invalid_request_carries_field() {
        let err = AdapterError::invalid("title", "Missing required field 'title'");
        let body = err.to_value();
        assert_eq!(body["error"], "invalid_request");
        assert_eq!(body["field"], "title");
    }
}
