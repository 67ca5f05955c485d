//! MCP runtime for an Emlog blog: HTTP transport, call catalog, and the
//! stdio JSON-RPC server.

use clap::Subcommand;
use serde_json::{Value, json};

pub mod catalog;
pub mod client;
pub mod config;
pub mod draft_state;
pub mod error;
pub mod server;
pub mod transport;

#[cfg(test)]
mod testing;

use catalog::{Catalog, to_pretty_json};
use client::EmlogClient;
use config::RuntimeConfig;
use server::{MCP_SERVER_NAME, McpServer};
use transport::{HttpTransport, Transport};

#[derive(Subcommand, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum McpCommands {
    /// Run the MCP server over stdio (default)
    #[default]
    Serve,
    /// Check the configured endpoint and key by reading the current user
    Diagnose,
}

pub async fn run(config: RuntimeConfig, command: McpCommands) -> i32 {
    let transport = match HttpTransport::new(&config) {
        Ok(transport) => transport,
        Err(err) => {
            let payload = json!({
                "error": "mcp_server_error",
                "message": err.to_string(),
            });
            eprintln!("{}", to_pretty_json(&payload));
            return 1;
        }
    };
    let client = EmlogClient::new(transport);

    match command {
        McpCommands::Serve => {
            let server = McpServer::new(Catalog::new(client));
            match server.serve_stdio().await {
                Ok(()) => 0,
                Err(err) => {
                    let payload = json!({
                        "error": "mcp_server_error",
                        "message": err,
                    });
                    eprintln!("{}", to_pretty_json(&payload));
                    1
                }
            }
        }
        McpCommands::Diagnose => {
            let report = diagnose(&client, config.credentials.base_url()).await;
            println!("{}", to_pretty_json(&report));
            if report
                .get("status")
                .and_then(Value::as_str)
                .is_some_and(|status| status == "ready")
            {
                0
            } else {
                2
            }
        }
    }
}

/// One authenticated read against the remote, summarized as a report.
pub async fn diagnose<T: Transport>(client: &EmlogClient<T>, api_url: &str) -> Value {
    let mut report = json!({
        "server": MCP_SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "api_url": api_url,
        "checked_at": chrono::Utc::now().to_rfc3339(),
    });
    match client.get_current_user().await {
        Ok(payload) => {
            report["status"] = json!("ready");
            report["user"] = payload.get("userinfo").cloned().unwrap_or(payload);
        }
        Err(err) => {
            tracing::warn!(code = err.code(), error = %err, "diagnose read failed");
            report["status"] = json!("unreachable");
            report["error"] = err.to_value();
        }
    }
    report
}
