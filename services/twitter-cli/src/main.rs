//! Twitter client CLI
//!
//! Loads credentials from a TOML file and `TWITTER_*` env vars, then runs
//! one REST call, one stream subscription, or one token invalidation. Results
//! go to stdout as JSON, logs go to stderr.

mod cli;
mod config;

use anyhow::{Context, Result};
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twitter_service::CredentialedClient;

use crate::cli::Command;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = cli::parse(&args)?;

    let config_path = Config::resolve_path(invocation.config_path.as_deref());
    let config = if invocation.config_path.is_some() || config_path.exists() {
        info!(path = %config_path.display(), "loading configuration");
        Config::load(&config_path)
            .with_context(|| format!("failed to load config from {}", config_path.display()))?
    } else {
        info!("no config file, using environment only");
        Config::from_env().context("invalid configuration")?
    };

    let timeout = Duration::from_secs(config.timeout_secs);
    let http = match &invocation.command {
        // A whole-request timeout would cut a long-lived stream
        Command::Stream { .. } => reqwest::Client::builder().connect_timeout(timeout),
        _ => reqwest::Client::builder().timeout(timeout),
    }
    .build()
    .context("failed to build HTTP client")?;

    let client = CredentialedClient::builder(config.twitter)
        .http_client(http)
        .build()
        .context("failed to construct client")?;
    info!(state = client.state_label().await, "client ready");

    match invocation.command {
        Command::Rest {
            method,
            endpoint,
            params,
        } => {
            let result = client
                .call_rest(method, &endpoint, params)
                .await
                .with_context(|| format!("{method} {endpoint} failed"))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Stream { endpoint, params } => {
            let task = client
                .get_stream(
                    &endpoint,
                    params,
                    |value| println!("{value}"),
                    |err| warn!(endpoint = %err.endpoint, error = %err.message, "stream error"),
                )
                .await
                .with_context(|| format!("failed to open stream {endpoint}"))?;

            let abort = task.abort_handle();
            tokio::select! {
                _ = task => info!("stream ended"),
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted, closing stream");
                    abort.abort();
                }
            }
        }
        Command::Invalidate => {
            let fresh = client
                .invalidate_token()
                .await
                .context("token invalidation failed")?;
            let state = fresh.state_label().await;
            println!("{}", json!({ "invalidated": true, "state": state }));
        }
    }

    if let Some(log) = client.log_output().await {
        info!(calls = %log.to_json(), "call log");
    }

    Ok(())
}
