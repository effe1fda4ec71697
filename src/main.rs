use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use redis_key_browser::browser::DEFAULT_MAX_KEYS;
use redis_key_browser::server::McpBrowserServer;
use redis_key_browser::{EndpointConfig, KeyBrowser, RedisConnector};
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::EnvFilter;

/// MCP server for browsing Redis keys and values without a native client
#[derive(Parser)]
#[command(name = "redis-key-browser", version, about)]
struct Cli {
    /// Default Redis endpoint for tool calls that don't pass one.
    /// Example: redis://127.0.0.1:6379/0
    #[arg(long)]
    url: Option<String>,

    /// Read the default Redis URL from an environment variable.
    /// Example: --url-env REDIS_URL
    #[arg(long = "url-env", conflicts_with = "url")]
    url_env: Option<String>,

    /// Connect timeout in milliseconds
    #[arg(long, default_value = "5000")]
    connect_timeout_ms: u64,

    /// Per-command timeout in milliseconds
    #[arg(long, default_value = "10000")]
    command_timeout_ms: u64,

    /// Upper bound on keys collected by scan_all_keys
    #[arg(long, default_value_t = DEFAULT_MAX_KEYS)]
    max_keys: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let default_url = match (&cli.url, &cli.url_env) {
        (Some(url), _) => Some(url.clone()),
        (None, Some(env_name)) => match std::env::var(env_name) {
            Ok(url) => {
                tracing::info!(env = env_name, "Read Redis URL from environment variable");
                Some(url)
            }
            Err(_) => {
                bail!("Environment variable '{env_name}' is not set");
            }
        },
        (None, None) => None,
    };

    let default_endpoint = match default_url {
        Some(url) => {
            let endpoint = EndpointConfig::from_url(&url)?;
            tracing::info!(endpoint = %endpoint, "Using default endpoint");
            Some(endpoint)
        }
        None => {
            tracing::info!("No default endpoint; every tool call must pass one");
            None
        }
    };

    let connector = RedisConnector::new(
        Duration::from_millis(cli.connect_timeout_ms),
        Duration::from_millis(cli.command_timeout_ms),
    );

    tracing::info!(
        connect_timeout_ms = connector.connect_timeout().as_millis() as u64,
        command_timeout_ms = connector.command_timeout().as_millis() as u64,
        max_keys = cli.max_keys,
        "Starting redis-key-browser server"
    );

    let service = McpBrowserServer::new(KeyBrowser::new(connector), default_endpoint, cli.max_keys);
    let running = service.serve(stdio()).await?;
    running.waiting().await?;

    Ok(())
}
