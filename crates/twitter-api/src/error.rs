//! Error types for Twitter API calls

use serde::Deserialize;

/// Errors from REST calls and stream subscriptions.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Non-success response. `code` is Twitter's own error code from the
    /// `{"errors":[{"code":..,"message":..}]}` envelope when present.
    #[error("Twitter API error {status}: {message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("response decode failed: {0}")]
    Decode(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Result alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEntry {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

impl Error {
    /// Build an `Api` error from a non-success status and its body.
    ///
    /// Falls back to the raw body as the message when it is not a Twitter
    /// error envelope.
    pub fn from_response(status: u16, body: &str) -> Self {
        let (code, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => match envelope.errors.into_iter().next() {
                Some(first) => (first.code, first.message.unwrap_or_default()),
                None => (None, envelope.error.unwrap_or_else(|| body.to_string())),
            },
            Err(_) => (None, body.to_string()),
        };
        Error::Api {
            status,
            code,
            message,
        }
    }

    /// Twitter error code, if the failure carried one.
    pub fn code(&self) -> Option<i64> {
        match self {
            Error::Api { code, .. } => *code,
            _ => None,
        }
    }

    /// HTTP status, if the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
