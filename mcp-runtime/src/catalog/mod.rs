//! Static table of resources and tools, bound to client operations.
//!
//! Every failure raised below this point is caught here and rendered; nothing
//! escapes as an unhandled fault.

pub mod resources;
pub mod schema;
pub mod tools;

use serde_json::{Map, Value, json};

use crate::client::EmlogClient;
use crate::error::AdapterError;
use crate::transport::Transport;
use resources::{JSON_MIME, RESOURCES, TEMPLATES};
use tools::{TOOLS, find_tool};

/// How a successful payload becomes response text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Render {
    /// Pretty-printed JSON.
    Structured,
    /// Short human-readable summary.
    Narrated,
}

impl Render {
    pub fn apply(self, payload: &Value, narrate: impl FnOnce(&Value) -> String) -> String {
        match self {
            Render::Structured => to_pretty_json(payload),
            Render::Narrated => narrate(payload),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    pub text: String,
    pub is_error: bool,
    pub failure: Option<AdapterError>,
}

impl CallOutcome {
    fn success(text: String) -> Self {
        Self {
            text,
            is_error: false,
            failure: None,
        }
    }

    fn failure(err: AdapterError) -> Self {
        Self {
            text: format!("Error: {err}"),
            is_error: true,
            failure: Some(err),
        }
    }

    /// `tools/call` result body.
    pub fn to_value(&self) -> Value {
        let mut payload = json!({
            "content": [{ "type": "text", "text": self.text }],
            "isError": self.is_error,
        });
        if let Some(failure) = &self.failure {
            payload["structuredContent"] = json!({ "error": failure.to_value() });
        }
        payload
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceContents {
    pub uri: String,
    pub mime_type: &'static str,
    pub text: String,
}

impl ResourceContents {
    /// `resources/read` result body.
    pub fn to_value(&self) -> Value {
        json!({
            "contents": [{
                "uri": self.uri,
                "mimeType": self.mime_type,
                "text": self.text,
            }]
        })
    }
}

pub struct Catalog<T> {
    client: EmlogClient<T>,
}

impl<T: Transport> Catalog<T> {
    pub fn new(client: EmlogClient<T>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &EmlogClient<T> {
        &self.client
    }

    pub fn tools_list(&self) -> Value {
        let tools: Vec<Value> = TOOLS
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "title": tool.title,
                    "description": tool.description,
                    "inputSchema": schema::input_schema(tool.fields),
                })
            })
            .collect();
        json!({ "tools": tools })
    }

    pub fn resources_list(&self) -> Value {
        let resources: Vec<Value> = RESOURCES
            .iter()
            .map(|resource| {
                json!({
                    "uri": resource.uri,
                    "name": resource.name,
                    "description": resource.description,
                    "mimeType": JSON_MIME,
                })
            })
            .collect();
        json!({ "resources": resources })
    }

    pub fn resource_templates_list(&self) -> Value {
        let templates: Vec<Value> = TEMPLATES
            .iter()
            .map(|template| {
                json!({
                    "uriTemplate": template.uri_template,
                    "name": template.name,
                    "description": template.description,
                    "mimeType": JSON_MIME,
                })
            })
            .collect();
        json!({ "resourceTemplates": templates })
    }

    /// Validates, invokes and narrates one tool call. Always returns an
    /// outcome; failures carry `is_error`.
    pub async fn call_tool(&self, name: &str, args: &Map<String, Value>) -> CallOutcome {
        let Some(tool) = find_tool(name) else {
            return CallOutcome::failure(AdapterError::invalid(
                "name",
                format!("Unknown tool '{name}'"),
            ));
        };
        let args = match schema::validate(tool.fields, args) {
            Ok(args) => args,
            Err(err) => {
                tracing::debug!(tool = name, error = %err, "tool arguments rejected");
                return CallOutcome::failure(err);
            }
        };

        match tools::execute(&self.client, tool.kind, &args).await {
            Ok(payload) => CallOutcome::success(
                tool.render
                    .apply(&payload, |payload| tools::narrate(tool.kind, &args, payload)),
            ),
            Err(err) => {
                tracing::warn!(tool = name, code = err.code(), error = %err, "tool call failed");
                CallOutcome::failure(err)
            }
        }
    }

    /// Renders through the strategy of the entry the URI resolves to; a
    /// narrated resource gets compact JSON.
    pub async fn read_resource(&self, uri: &str) -> Result<ResourceContents, AdapterError> {
        let target = resources::resolve(uri)?;
        let payload = resources::read(&self.client, &target).await.map_err(|err| {
            tracing::warn!(uri, code = err.code(), error = %err, "resource read failed");
            err
        })?;
        Ok(ResourceContents {
            uri: uri.to_string(),
            mime_type: JSON_MIME,
            text: target.render().apply(&payload, Value::to_string),
        })
    }
}

pub fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
