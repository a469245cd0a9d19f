//! Twitter API client contract
//!
//! Defines the `ApiClient` trait that the credentialed client drives. A
//! handle exposes two primitives:
//! - `call` invokes a REST endpoint by HTTP method name and resolves the
//!   decoded body together with the raw response
//! - `stream` opens a long-lived subscription whose events arrive on a
//!   channel until the connection ends
//!
//! `HttpApiClient` is the reqwest-backed implementation; tests and embedders
//! can supply their own handle through the same trait.

pub mod error;
pub mod http;
pub mod stream;

pub use error::{Error, Result};
pub use http::{Credentials, HttpApiClient};
pub use stream::{StreamEvent, Subscription};

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

/// Request parameters. Ordered so query strings and signatures are stable.
pub type Params = BTreeMap<String, String>;

/// HTTP method a REST call is dispatched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    /// Accepts the lowercase names used by callers (`"get"`, `"post"`) as
    /// well as their uppercase forms.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Method::Get),
            "post" => Ok(Method::Post),
            _ => Err(Error::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Successful REST call: decoded body plus the raw response it came from.
#[derive(Debug, Clone, Serialize)]
pub struct CallResult {
    /// Decoded JSON body (`Value::Null` for an empty body)
    pub request: Value,
    pub raw: RawResponse,
}

/// Transport-level view of a response.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RawResponse {
    pub status: u16,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// Authenticated handle onto the Twitter API.
///
/// Uses `Pin<Box<dyn Future>>` return types so handles can be shared as
/// `Arc<dyn ApiClient>`.
pub trait ApiClient: Send + Sync {
    /// Identifier for logging (e.g. "bearer", "user")
    fn id(&self) -> &str;

    /// Invoke `endpoint` (e.g. `statuses/show`) with `method`.
    fn call<'a>(
        &'a self,
        method: Method,
        endpoint: &'a str,
        params: &'a Params,
    ) -> Pin<Box<dyn Future<Output = Result<CallResult>> + Send + 'a>>;

    /// Open a streaming subscription on `endpoint` (e.g. `statuses/filter`).
    fn stream<'a>(
        &'a self,
        endpoint: &'a str,
        params: &'a Params,
    ) -> Pin<Box<dyn Future<Output = Result<Subscription>> + Send + 'a>>;
}
