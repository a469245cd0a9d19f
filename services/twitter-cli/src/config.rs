//! Configuration types and loading
//!
//! Precedence: env vars > config file > defaults. Credentials may live in
//! the `[twitter]` table, but the `TWITTER_*` variables are the usual place
//! for them so they stay out of files on disk.

use common::Secret;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use twitter_service::Config as ClientConfig;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Credentials, feature flags and endpoint overrides for the client
    #[serde(default)]
    pub twitter: ClientConfig,
    /// Whole-request timeout for REST and token calls. Streams only use it as
    /// the connect timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            twitter: ClientConfig::default(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.overlay_env();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment variables, for running without a file.
    pub fn from_env() -> common::Result<Self> {
        let mut config = Config::default();
        config.overlay_env();
        config.validate()?;
        Ok(config)
    }

    fn overlay_env(&mut self) {
        let twitter = &mut self.twitter;
        if let Some(key) = env_value("TWITTER_CONSUMER_KEY") {
            twitter.consumer_key = Some(key);
        }
        if let Some(secret) = env_value("TWITTER_CONSUMER_SECRET") {
            twitter.consumer_secret = Some(Secret::new(secret));
        }
        if let Some(token) = env_value("TWITTER_BEARER_TOKEN") {
            twitter.bearer_token = Some(Secret::new(token));
        }
        if let Some(key) = env_value("TWITTER_ACCESS_TOKEN_KEY") {
            twitter.access_token_key = Some(key);
        }
        if let Some(secret) = env_value("TWITTER_ACCESS_TOKEN_SECRET") {
            twitter.access_token_secret = Some(Secret::new(secret));
        }
    }

    fn validate(&self) -> common::Result<()> {
        let endpoints = &self.twitter.endpoints;
        for (name, url) in [
            ("token_url", &endpoints.token_url),
            ("invalidate_url", &endpoints.invalidate_url),
            ("rest_base", &endpoints.rest_base),
            ("stream_base", &endpoints.stream_base),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {url}"
                )));
            }
        }

        if self.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("twitter-client.toml")
    }
}
