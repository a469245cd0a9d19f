//! OAuth2 app-only token exchange and invalidation
//!
//! Both interactions POST a form body to a Twitter OAuth2 endpoint with the
//! consumer pair as HTTP Basic credentials:
//! 1. `grant_type=client_credentials` to `TOKEN_ENDPOINT` yields a bearer token
//! 2. `access_token=<token>` to `INVALIDATE_ENDPOINT` revokes it
//!
//! Missing consumer credentials are rejected before any request is built.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::basic::{basic_authorization, encode_component};
use crate::constants::{CLIENT_CREDENTIALS_GRANT, FORM_CONTENT_TYPE};
use crate::error::{Error, Result};

/// Body returned by the token endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    /// Always `bearer` for the client credentials grant.
    #[serde(default)]
    pub token_type: String,
    pub access_token: String,
}

/// Exchange the consumer pair for an app-only bearer token.
pub async fn request_bearer_token(
    client: &reqwest::Client,
    token_url: &str,
    consumer_key: &str,
    consumer_secret: &str,
) -> Result<TokenResponse> {
    require_consumer_pair(consumer_key, consumer_secret)?;

    debug!(url = token_url, "requesting app-only bearer token");
    let body = post_form(
        client,
        token_url,
        consumer_key,
        consumer_secret,
        CLIENT_CREDENTIALS_GRANT.to_string(),
    )
    .await?;

    let token: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| Error::InvalidResponse(format!("decoding token body: {e}")))?;

    if !token.token_type.is_empty() && !token.token_type.eq_ignore_ascii_case("bearer") {
        return Err(Error::InvalidResponse(format!(
            "unexpected token_type {:?}",
            token.token_type
        )));
    }
    if token.access_token.is_empty() {
        return Err(Error::InvalidResponse("empty access_token".into()));
    }

    debug!("app-only bearer token acquired");
    Ok(token)
}

/// Revoke `access_token`.
///
/// Returns the decoded response object (Twitter echoes the revoked token as
/// `access_token`); an empty body decodes to an empty map.
pub async fn invalidate_token(
    client: &reqwest::Client,
    invalidate_url: &str,
    consumer_key: &str,
    consumer_secret: &str,
    access_token: &str,
) -> Result<Map<String, Value>> {
    require_consumer_pair(consumer_key, consumer_secret)?;
    if access_token.trim().is_empty() {
        return Err(Error::MissingCredentials(
            "no token held to invalidate".into(),
        ));
    }

    debug!(url = invalidate_url, "invalidating bearer token");
    let form = format!("access_token={}", encode_component(access_token));
    let body = post_form(client, invalidate_url, consumer_key, consumer_secret, form).await?;

    if body.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(map)) => {
            debug!("bearer token invalidated");
            Ok(map)
        }
        Ok(other) => Err(Error::InvalidResponse(format!(
            "expected JSON object, got {other}"
        ))),
        Err(e) => Err(Error::InvalidResponse(format!(
            "decoding invalidate body: {e}"
        ))),
    }
}

fn require_consumer_pair(consumer_key: &str, consumer_secret: &str) -> Result<()> {
    if consumer_key.trim().is_empty() || consumer_secret.trim().is_empty() {
        return Err(Error::MissingCredentials(
            "consumer_key and consumer_secret are required".into(),
        ));
    }
    Ok(())
}

/// POST a pre-encoded form body with Basic credentials and return the body of
/// a successful response.
async fn post_form(
    client: &reqwest::Client,
    url: &str,
    consumer_key: &str,
    consumer_secret: &str,
    form: String,
) -> Result<String> {
    let response = client
        .post(url)
        .header(AUTHORIZATION, basic_authorization(consumer_key, consumer_secret))
        .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
        .body(form)
        .send()
        .await
        .map_err(|e| Error::Http(format!("POST {url} failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Http(format!("reading response from {url}: {e}")))?;

    if status.is_success() {
        return Ok(body);
    }

    // 401/403 means the consumer pair itself was refused
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(Error::InvalidCredentials(format!(
            "{url} rejected credentials ({status}): {body}"
        )));
    }
    Err(Error::TokenRequest(format!("{url} returned {status}: {body}")))
}
