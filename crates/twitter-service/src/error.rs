//! Error types for the credentialed client

use serde::Serialize;
use twitter_api::Params;

/// Errors surfaced by `CredentialedClient` operations.
///
/// `Clone` because one bootstrap outcome is delivered to every caller that
/// queued behind it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Not enough credentials to build or bootstrap a handle. Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The token or invalidate endpoint could not be reached or refused us.
    #[error("token request failed: {0}")]
    TokenRequest(String),

    #[error(transparent)]
    ApiCall(#[from] ApiError),

    /// The handle factory could not build a handle.
    #[error("client error: {0}")]
    Client(String),
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<twitter_auth::Error> for Error {
    fn from(err: twitter_auth::Error) -> Self {
        match err {
            twitter_auth::Error::MissingCredentials(msg) => Error::Configuration(msg),
            other => Error::TokenRequest(other.to_string()),
        }
    }
}

/// A failed API call, annotated with what was being called.
///
/// `message` is the upstream message followed by the JSON-encoded params, so
/// a logged error line identifies the request on its own.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{endpoint}: {message}")]
pub struct ApiError {
    pub message: String,
    /// Twitter error code (e.g. 34 "page does not exist")
    pub code: Option<i64>,
    /// HTTP status when the failure came from a response
    pub status: Option<u16>,
    pub endpoint: String,
    pub params: Params,
}

impl ApiError {
    pub fn new(source: twitter_api::Error, endpoint: &str, params: &Params) -> Self {
        let code = source.code();
        let status = source.status();
        let upstream = match source {
            twitter_api::Error::Api { message, .. } => message,
            other => other.to_string(),
        };
        let encoded = serde_json::to_string(params).unwrap_or_default();
        Self {
            message: format!("{upstream} {encoded}"),
            code,
            status,
            endpoint: endpoint.to_string(),
            params: params.clone(),
        }
    }
}
