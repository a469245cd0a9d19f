//! Handle construction
//!
//! The client never builds `HttpApiClient`s itself; it asks a
//! `HandleFactory`. Embedders can substitute their own transport.

use std::sync::Arc;

use twitter_api::{ApiClient, Credentials, HttpApiClient};

use crate::config::Endpoints;
use crate::error::Result;

pub trait HandleFactory: Send + Sync {
    fn build(&self, credentials: Credentials, endpoints: &Endpoints) -> Result<Arc<dyn ApiClient>>;
}

/// Builds reqwest-backed handles sharing one connection pool.
#[derive(Debug, Clone, Default)]
pub struct HttpHandleFactory {
    http: reqwest::Client,
}

impl HttpHandleFactory {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl HandleFactory for HttpHandleFactory {
    fn build(&self, credentials: Credentials, endpoints: &Endpoints) -> Result<Arc<dyn ApiClient>> {
        let client = HttpApiClient::new(self.http.clone(), credentials)
            .with_base_urls(&endpoints.rest_base, &endpoints.stream_base);
        Ok(Arc::new(client))
    }
}
