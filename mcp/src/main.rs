use clap::Parser;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use emlog_mcp_runtime::config::{DEFAULT_TIMEOUT_SECS, RuntimeConfig};
use emlog_mcp_runtime::{McpCommands, run as run_mcp};

#[derive(Parser)]
#[command(
    name = "emlog-mcp",
    version,
    about = "Emlog MCP server: blog REST API as MCP resources and tools over stdio"
)]
struct Cli {
    /// Blog base URL, e.g. https://blog.example.com
    #[arg(long, env = "EMLOG_API_URL")]
    api_url: String,

    /// API key from the Emlog REST API plugin settings
    #[arg(long, env = "EMLOG_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "EMLOG_HTTP_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Option<McpCommands>,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // stdout carries protocol frames; logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emlog_mcp=info,emlog_mcp_runtime=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let config = match RuntimeConfig::new(&cli.api_url, &cli.api_key, cli.timeout_secs) {
        Ok(config) => config,
        Err(err) => {
            let payload = json!({
                "error": "invalid_config",
                "message": err.to_string(),
            });
            eprintln!("{payload}");
            std::process::exit(1);
        }
    };
    tracing::info!(
        api_url = config.credentials.base_url(),
        timeout_secs = cli.timeout_secs,
        "configuration loaded"
    );

    let code = run_mcp(config, cli.command.unwrap_or_default()).await;
    std::process::exit(code);
}
