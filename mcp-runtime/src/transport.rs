//! HTTP transport against the Emlog REST plugin.
//!
//! Every call is described by a [`RequestSpec`] and sent through a
//! [`Transport`]. The HTTP implementation injects the API key, picks the
//! body encoding, and strips the remote `{code, msg, data}` envelope so
//! callers only ever see the payload or a typed [`AdapterError`].

use std::future::Future;
use std::time::Duration;

use emlog_core::models::Flag;
use reqwest::Method;
use serde_json::{Map, Value};

use crate::config::{Credentials, RuntimeConfig};
use crate::error::AdapterError;

const USER_AGENT: &str = concat!("emlog-mcp/", env!("CARGO_PKG_VERSION"));
const API_KEY_FIELD: &str = "api_key";
const GENERIC_REMOTE_FAILURE: &str = "API request failed";

/// Where a call lands on the remote. REST plugin endpoints are selected with
/// `?rest-api=`, the legacy front controller with `/index.php?action=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Rest(&'static str),
    Action(&'static str),
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Rest(_) => "/",
            Endpoint::Action(_) => "/index.php",
        }
    }

    pub fn selector(&self) -> (&'static str, &'static str) {
        match self {
            Endpoint::Rest(name) => ("rest-api", name),
            Endpoint::Action(name) => ("action", name),
        }
    }

    pub fn name(&self) -> &'static str {
        self.selector().1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Text(String),
    List(Vec<String>),
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Text(value)
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Text(value.to_string())
    }
}

impl From<u64> for Param {
    fn from(value: u64) -> Self {
        Param::Text(value.to_string())
    }
}

impl From<Flag> for Param {
    fn from(value: Flag) -> Self {
        Param::Text(value.as_str().to_string())
    }
}

impl From<Vec<String>> for Param {
    fn from(value: Vec<String>) -> Self {
        Param::List(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoding {
    Query,
    Form,
    Multipart(FilePart),
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Query => "query",
            Encoding::Form => "form",
            Encoding::Multipart(_) => "multipart",
        }
    }
}

/// One outbound call, built fresh per operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub method: Method,
    pub endpoint: Endpoint,
    pub params: Vec<(String, Param)>,
    pub encoding: Encoding,
}

impl RequestSpec {
    pub fn read(endpoint: Endpoint) -> Self {
        Self {
            method: Method::GET,
            endpoint,
            params: Vec::new(),
            encoding: Encoding::Query,
        }
    }

    pub fn write(endpoint: Endpoint) -> Self {
        Self {
            method: Method::POST,
            endpoint,
            params: Vec::new(),
            encoding: Encoding::Form,
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<Param>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }

    pub fn optional<V: Into<Param>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    /// Attaching binary content switches the body to multipart.
    pub fn file(mut self, part: FilePart) -> Self {
        self.encoding = Encoding::Multipart(part);
        self
    }

    pub fn get_param(&self, key: &str) -> Option<&Param> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    /// Flattened key/value pairs as they go on the wire, API key last.
    /// List values become repeated `key[]` entries.
    pub fn wire_pairs(&self, api_key: &str) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.params.len() + 1);
        for (key, value) in &self.params {
            match value {
                Param::Text(text) => pairs.push((key.clone(), text.clone())),
                Param::List(items) => {
                    for item in items {
                        pairs.push((format!("{key}[]"), item.clone()));
                    }
                }
            }
        }
        pairs.push((API_KEY_FIELD.to_string(), api_key.to_string()));
        pairs
    }
}

pub trait Transport: Send + Sync {
    fn send(&self, spec: RequestSpec) -> impl Future<Output = Result<Value, AdapterError>> + Send;
}

/// The remote's uniform reply wrapper. `code` 0 or absent means success.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub code: i64,
    pub msg: Option<String>,
    pub data: Value,
}

impl ResponseEnvelope {
    pub fn from_object(mut object: Map<String, Value>) -> Self {
        let code = match object.get("code") {
            None | Some(Value::Null) => 0,
            Some(Value::Number(n)) => n.as_i64().unwrap_or(-1),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(-1),
            Some(_) => -1,
        };
        let msg = object
            .get("msg")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let data = object.remove("data").unwrap_or(Value::Null);
        Self { code, msg, data }
    }

    pub fn into_payload(self) -> Result<Value, AdapterError> {
        if self.code != 0 {
            return Err(AdapterError::RemoteApi {
                code: self.code,
                message: self
                    .msg
                    .unwrap_or_else(|| GENERIC_REMOTE_FAILURE.to_string()),
            });
        }
        Ok(self.data)
    }
}

/// Normalize a raw HTTP reply into the payload or a typed failure.
pub fn decode_response(
    status: u16,
    reason: Option<&str>,
    bytes: &[u8],
) -> Result<Value, AdapterError> {
    let body = serde_json::from_slice::<Value>(bytes).ok();

    if !(200..=299).contains(&status) {
        let message = body
            .as_ref()
            .and_then(|b| b.get("msg"))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .or(reason)
            .unwrap_or("request failed")
            .to_string();
        return Err(AdapterError::Transport {
            status: Some(status),
            message,
        });
    }

    match body {
        Some(Value::Object(object)) => ResponseEnvelope::from_object(object).into_payload(),
        _ => Err(AdapterError::Transport {
            status: Some(status),
            message: "response body is not a JSON envelope".to_string(),
        }),
    }
}

/// reqwest-backed transport bound to one set of credentials.
pub struct HttpTransport {
    http: reqwest::Client,
    credentials: Credentials,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &RuntimeConfig) -> Result<Self, AdapterError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AdapterError::Transport {
                status: None,
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            credentials: config.credentials.clone(),
            timeout: config.timeout,
        })
    }

    fn target_url(&self, endpoint: Endpoint) -> Result<reqwest::Url, AdapterError> {
        let mut url = reqwest::Url::parse(&format!(
            "{}{}",
            self.credentials.base_url(),
            endpoint.path()
        ))
        .map_err(|e| AdapterError::Transport {
            status: None,
            message: format!("Invalid API URL: {e}"),
        })?;
        let (key, value) = endpoint.selector();
        url.query_pairs_mut().append_pair(key, value);
        Ok(url)
    }

    fn connection_error(&self, err: reqwest::Error) -> AdapterError {
        let message = if err.is_timeout() {
            format!(
                "Request to {} timed out after {}s",
                self.credentials.base_url(),
                self.timeout.as_secs()
            )
        } else {
            format!(
                "Failed to reach Emlog API at {}: {err}",
                self.credentials.base_url()
            )
        };
        AdapterError::Transport {
            status: err.status().map(|s| s.as_u16()),
            message,
        }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, spec: RequestSpec) -> Result<Value, AdapterError> {
        let mut url = self.target_url(spec.endpoint)?;
        let pairs = spec.wire_pairs(self.credentials.api_key());

        tracing::debug!(
            endpoint = spec.endpoint.name(),
            method = %spec.method,
            encoding = spec.encoding.as_str(),
            "sending emlog request"
        );

        let request = match spec.encoding {
            Encoding::Query => {
                {
                    let mut query = url.query_pairs_mut();
                    for (key, value) in &pairs {
                        query.append_pair(key, value);
                    }
                }
                self.http.request(spec.method, url)
            }
            Encoding::Form => self.http.request(spec.method, url).form(&pairs),
            Encoding::Multipart(file) => {
                let mut form = reqwest::multipart::Form::new();
                for (key, value) in pairs {
                    form = form.text(key, value);
                }
                let part = reqwest::multipart::Part::bytes(file.bytes).file_name(file.file_name);
                form = form.part(file.field, part);
                self.http.request(spec.method, url).multipart(form)
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| self.connection_error(e))?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| AdapterError::Transport {
            status: Some(status.as_u16()),
            message: format!("Failed to read API response body: {e}"),
        })?;

        let result = decode_response(status.as_u16(), status.canonical_reason(), &bytes);
        if let Err(err) = &result {
            tracing::warn!(
                endpoint = spec.endpoint.name(),
                error = err.code(),
                message = %err,
                "emlog request failed"
            );
        }
        result
    }
}
