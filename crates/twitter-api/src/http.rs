//! reqwest-backed `ApiClient`
//!
//! Resolves endpoint names against the REST or stream base URL, authorizes
//! each request (bearer token or OAuth1 signature) and maps non-success
//! responses onto `Error::Api`.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use common::Secret;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use tracing::{debug, instrument};
use twitter_auth::{REST_BASE_URL, STREAM_BASE_URL, UserContext};

use crate::error::{Error, Result};
use crate::stream::Subscription;
use crate::{ApiClient, CallResult, Method, Params, RawResponse};

/// How requests from a handle are authorized.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// App-only: `Authorization: Bearer <token>`
    Bearer(Secret<String>),
    /// User context: OAuth1 HMAC-SHA1 signature per request
    User(UserContext),
}

/// Twitter API handle over a shared `reqwest::Client`.
pub struct HttpApiClient {
    http: reqwest::Client,
    rest_base: String,
    stream_base: String,
    credentials: Credentials,
}

impl HttpApiClient {
    pub fn new(http: reqwest::Client, credentials: Credentials) -> Self {
        Self {
            http,
            rest_base: REST_BASE_URL.to_string(),
            stream_base: STREAM_BASE_URL.to_string(),
            credentials,
        }
    }

    /// Point the handle at different REST/stream hosts.
    pub fn with_base_urls(mut self, rest_base: impl Into<String>, stream_base: impl Into<String>) -> Self {
        self.rest_base = rest_base.into();
        self.stream_base = stream_base.into();
        self
    }

    fn authorization(&self, method: Method, url: &str, params: &Params) -> Result<String> {
        match &self.credentials {
            Credentials::Bearer(token) => Ok(format!("Bearer {}", token.expose())),
            Credentials::User(context) => {
                let pairs: Vec<(String, String)> = params
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                context
                    .authorization(method.as_str(), url, &pairs)
                    .map_err(|e| Error::InvalidRequest(e.to_string()))
            }
        }
    }

    async fn send(&self, method: Method, url: &str, params: &Params) -> Result<reqwest::Response> {
        let authorization = self.authorization(method, url, params)?;
        let builder = match method {
            Method::Get => self.http.get(url).query(params),
            Method::Post => self.http.post(url).form(params),
        };
        builder
            .header(AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| Error::Http(format!("{method} {url} failed: {e}")))
    }
}

/// `statuses/show` → `<base>/statuses/show.json`. Absolute URLs pass through.
pub fn resource_url(base: &str, endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    let path = endpoint.trim_matches('/');
    let path = path.strip_suffix(".json").unwrap_or(path);
    format!("{}/{}.json", base.trim_end_matches('/'), path)
}

/// Filter streams take their track/follow parameters as a POST form.
fn stream_method(endpoint: &str) -> Method {
    let path = endpoint.trim_matches('/');
    let path = path.strip_suffix(".json").unwrap_or(path);
    if path.ends_with("filter") {
        Method::Post
    } else {
        Method::Get
    }
}

impl ApiClient for HttpApiClient {
    fn id(&self) -> &str {
        match self.credentials {
            Credentials::Bearer(_) => "bearer",
            Credentials::User(_) => "user",
        }
    }

    fn call<'a>(
        &'a self,
        method: Method,
        endpoint: &'a str,
        params: &'a Params,
    ) -> Pin<Box<dyn Future<Output = Result<CallResult>> + Send + 'a>> {
        Box::pin(async move {
            let url = resource_url(&self.rest_base, endpoint);
            execute(self, method, url, params).await
        })
    }

    fn stream<'a>(
        &'a self,
        endpoint: &'a str,
        params: &'a Params,
    ) -> Pin<Box<dyn Future<Output = Result<Subscription>> + Send + 'a>> {
        Box::pin(async move {
            let url = resource_url(&self.stream_base, endpoint);
            let method = stream_method(endpoint);
            debug!(%method, url = %url, "opening stream");

            let response = self.send(method, &url, params).await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::from_response(status.as_u16(), &body));
            }
            Ok(Subscription::from_response(response))
        })
    }
}

#[instrument(skip_all, fields(%method, url = %url))]
async fn execute(
    client: &HttpApiClient,
    method: Method,
    url: String,
    params: &Params,
) -> Result<CallResult> {
    let response = client.send(method, &url, params).await?;
    let status = response.status().as_u16();
    let headers: BTreeMap<String, String> = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Http(format!("reading body from {url}: {e}")))?;

    if !(200..300).contains(&status) {
        debug!(status, "API call returned error status");
        return Err(Error::from_response(status, &body));
    }

    let request = if body.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&body).map_err(|e| Error::Decode(format!("{url}: {e}")))?
    };

    Ok(CallResult {
        request,
        raw: RawResponse {
            status,
            url,
            headers,
            body,
        },
    })
}
