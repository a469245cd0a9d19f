//! HTTP Basic credentials for the OAuth2 endpoints
//!
//! Twitter expects `base64(urlencode(key) ":" urlencode(secret))`, where the
//! encoding matches JavaScript's `encodeURIComponent`. For the alphanumeric
//! keys Twitter issues this is the identity, but it matters for secrets
//! containing reserved characters.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters left unescaped by `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a credential component.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// The base64 token placed after `Basic ` in the Authorization header.
pub fn basic_token(consumer_key: &str, consumer_secret: &str) -> String {
    let joined = format!(
        "{}:{}",
        encode_component(consumer_key),
        encode_component(consumer_secret)
    );
    STANDARD.encode(joined)
}

/// Full Authorization header value: `Basic <token>`.
pub fn basic_authorization(consumer_key: &str, consumer_secret: &str) -> String {
    format!("Basic {}", basic_token(consumer_key, consumer_secret))
}
