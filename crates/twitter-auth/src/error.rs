//! Error types for Twitter OAuth operations

/// Errors from token acquisition, invalidation and request signing.
///
/// All variants carry strings so the error is `Clone`; a single bootstrap
/// outcome is fanned out to every caller waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Consumer key/secret (or the token to invalidate) absent. Raised before
    /// any network I/O.
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token request failed: {0}")]
    TokenRequest(String),

    /// 401/403 from the token endpoint: the consumer pair was rejected.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    #[error("request signing failed: {0}")]
    Signing(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
