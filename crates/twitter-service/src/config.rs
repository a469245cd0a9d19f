//! Client configuration and credential resolution

use std::fmt;
use std::sync::Arc;

use common::Secret;
use serde::Deserialize;
use serde_json::{Map, Value};
use twitter_api::{ApiClient, Credentials};
use twitter_auth::{INVALIDATE_ENDPOINT, REST_BASE_URL, STREAM_BASE_URL, TOKEN_ENDPOINT, UserContext};

use crate::error::{Error, Result};

/// Credentials and feature flags for a `CredentialedClient`.
///
/// Every credential is optional; [`Config::credential_source`] decides which
/// combination is usable.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<Secret<String>>,
    pub bearer_token: Option<Secret<String>>,
    pub access_token_key: Option<String>,
    pub access_token_secret: Option<Secret<String>>,
    /// Pre-built handle; wins over every other credential.
    #[serde(skip)]
    pub client: Option<Arc<dyn ApiClient>>,
    /// Keep an in-memory call log
    pub monitor: bool,
    /// Broadcast call activity as `ClientEvent`s
    pub events: bool,
    /// Forward each call log entry to the recorder
    pub log: bool,
    pub endpoints: Endpoints,
}

/// URLs the client talks to. Defaults are Twitter's production hosts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub token_url: String,
    pub invalidate_url: String,
    pub rest_base: String,
    pub stream_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            token_url: TOKEN_ENDPOINT.to_string(),
            invalidate_url: INVALIDATE_ENDPOINT.to_string(),
            rest_base: REST_BASE_URL.to_string(),
            stream_base: STREAM_BASE_URL.to_string(),
        }
    }
}

/// How a configuration will produce its handle.
pub enum CredentialSource {
    /// Reuse the supplied handle
    Existing(Arc<dyn ApiClient>),
    /// Build a handle right away from these credentials
    Direct(Credentials),
    /// Exchange the consumer pair for a bearer token first
    AppOnly,
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Existing(client) => write!(f, "Existing({})", client.id()),
            CredentialSource::Direct(credentials) => write!(f, "Direct({credentials:?})"),
            CredentialSource::AppOnly => f.write_str("AppOnly"),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn present_secret(value: &Option<Secret<String>>) -> Option<&str> {
    value
        .as_ref()
        .filter(|s| !s.is_blank())
        .map(|s| s.expose().as_str())
}

impl Config {
    /// App-only config from a consumer pair.
    pub fn app_only(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_key: Some(consumer_key.into()),
            consumer_secret: Some(Secret::new(consumer_secret.into())),
            ..Self::default()
        }
    }

    /// Non-blank consumer key and secret.
    pub fn consumer_pair(&self) -> Option<(&str, &str)> {
        Some((
            present(&self.consumer_key)?,
            present_secret(&self.consumer_secret)?,
        ))
    }

    /// Non-blank user access token key and secret.
    pub fn access_pair(&self) -> Option<(&str, &str)> {
        Some((
            present(&self.access_token_key)?,
            present_secret(&self.access_token_secret)?,
        ))
    }

    pub fn bearer(&self) -> Option<&str> {
        present_secret(&self.bearer_token)
    }

    /// Pick the credential strategy.
    ///
    /// Fails with `Error::Configuration` when no strategy applies; in
    /// particular an access token pair without the consumer pair is not
    /// enough to sign requests.
    pub fn credential_source(&self) -> Result<CredentialSource> {
        if let Some(client) = &self.client {
            return Ok(CredentialSource::Existing(client.clone()));
        }
        if let Some(token) = self.bearer() {
            return Ok(CredentialSource::Direct(Credentials::Bearer(Secret::from(token))));
        }
        let consumer = self.consumer_pair();
        if let (Some((consumer_key, consumer_secret)), Some((token, token_secret))) =
            (consumer, self.access_pair())
        {
            return Ok(CredentialSource::Direct(Credentials::User(UserContext {
                consumer_key: consumer_key.to_string(),
                consumer_secret: consumer_secret.to_string(),
                token: token.to_string(),
                token_secret: token_secret.to_string(),
            })));
        }
        if consumer.is_some() {
            return Ok(CredentialSource::AppOnly);
        }
        Err(Error::Configuration(
            "Config required: supply a client, a bearer_token, an access token pair with \
             consumer_key/consumer_secret, or consumer_key/consumer_secret"
                .into(),
        ))
    }

    /// Merge credential fields from an OAuth2 endpoint response body.
    ///
    /// Only string values for known credential keys are taken; anything else
    /// in the body is ignored.
    pub fn merge_response(&mut self, body: &Map<String, Value>) {
        for (key, value) in body {
            let Some(value) = value.as_str() else {
                continue;
            };
            match key.as_str() {
                "consumer_key" => self.consumer_key = Some(value.to_string()),
                "consumer_secret" => self.consumer_secret = Some(Secret::from(value)),
                "bearer_token" => self.bearer_token = Some(Secret::from(value)),
                "access_token_key" => self.access_token_key = Some(value.to_string()),
                "access_token_secret" => self.access_token_secret = Some(Secret::from(value)),
                _ => {}
            }
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &self.consumer_secret)
            .field("bearer_token", &self.bearer_token)
            .field("access_token_key", &self.access_token_key)
            .field("access_token_secret", &self.access_token_secret)
            .field("client", &self.client.as_ref().map(|c| c.id().to_string()))
            .field("monitor", &self.monitor)
            .field("events", &self.events)
            .field("log", &self.log)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}
