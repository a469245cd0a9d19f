//! The credentialed client
//!
//! `CredentialedClient` is cheap to clone; clones share credential state,
//! call log and event channel.
//!
//! Handle acquisition goes through [`ClientState`]. When the state is
//! `Uninitialized`, the first caller spawns the bootstrap on its own task and
//! then waits like everyone else, so a caller that is cancelled mid-wait
//! cannot leave the queue stranded in `AwaitingToken`.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use common::Secret;
use serde_json::{Value, json};
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use twitter_api::{ApiClient, CallResult, Credentials, Method, Params, StreamEvent};

use crate::call_log::CallLog;
use crate::config::{Config, CredentialSource};
use crate::error::{ApiError, Error, Result};
use crate::events::{ClientEvent, EventEmitter};
use crate::factory::{HandleFactory, HttpHandleFactory};
use crate::recorder::{Record, Recorder, TracingRecorder};
use crate::state::{Acquire, ClientState, Handle, Waiter};

/// Twitter API client that resolves its own credentials.
#[derive(Clone)]
pub struct CredentialedClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: RwLock<Config>,
    state: Mutex<ClientState>,
    http: reqwest::Client,
    factory: Arc<dyn HandleFactory>,
    recorder: Arc<dyn Recorder>,
    /// Present only with `monitor`
    call_log: Option<Mutex<CallLog>>,
    /// Present only with `events`
    emitter: Option<EventEmitter>,
    log_calls: bool,
}

/// Construction with injected collaborators.
pub struct Builder {
    config: Config,
    http: Option<reqwest::Client>,
    factory: Option<Arc<dyn HandleFactory>>,
    recorder: Option<Arc<dyn Recorder>>,
}

impl Builder {
    /// HTTP client used for the OAuth2 endpoints (and, unless a factory is
    /// supplied, for API handles).
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn factory(mut self, factory: Arc<dyn HandleFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn recorder(mut self, recorder: Arc<dyn Recorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Resolve the credential strategy. Performs no network I/O: an app-only
    /// configuration starts `Uninitialized` and bootstraps on first use.
    pub fn build(self) -> Result<CredentialedClient> {
        let http = self.http.unwrap_or_default();
        let factory = self
            .factory
            .unwrap_or_else(|| Arc::new(HttpHandleFactory::new(http.clone())));
        let recorder = self
            .recorder
            .unwrap_or_else(|| Arc::new(TracingRecorder));
        let config = self.config;

        let source = config.credential_source()?;
        debug!(?source, "resolved credential source");
        let state = match source {
            CredentialSource::Existing(handle) => ClientState::Ready(handle),
            CredentialSource::Direct(credentials) => {
                ClientState::Ready(factory.build(credentials, &config.endpoints)?)
            }
            CredentialSource::AppOnly => ClientState::Uninitialized,
        };
        info!(state = state.label(), monitor = config.monitor, events = config.events, "client constructed");

        Ok(CredentialedClient {
            inner: Arc::new(Inner {
                call_log: config.monitor.then(|| Mutex::new(CallLog::new())),
                emitter: config.events.then(EventEmitter::new),
                log_calls: config.log,
                config: RwLock::new(config),
                state: Mutex::new(state),
                http,
                factory,
                recorder,
            }),
        })
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

impl CredentialedClient {
    /// Construct with default collaborators. See [`Builder::build`].
    pub fn new(config: Config) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: Config) -> Builder {
        Builder {
            config,
            http: None,
            factory: None,
            recorder: None,
        }
    }

    /// Construct and resolve the handle immediately, bootstrapping if the
    /// configuration only carries a consumer pair.
    pub async fn connect(config: Config) -> Result<Self> {
        let client = Self::new(config)?;
        client.app_only_bootstrap().await?;
        Ok(client)
    }

    /// Snapshot of the current configuration, including any bearer token
    /// obtained by the bootstrap.
    pub async fn config(&self) -> Config {
        self.inner.config.read().await.clone()
    }

    /// `uninitialized`, `awaiting_token` or `ready`.
    pub async fn state_label(&self) -> &'static str {
        self.inner.state.lock().await.label()
    }

    /// Resolve the API handle.
    ///
    /// Returns the existing handle when Ready. Otherwise joins the in-flight
    /// bootstrap or starts one. Only one token request is in flight however
    /// many callers arrive; all of them receive its outcome.
    pub async fn app_only_bootstrap(&self) -> Result<Arc<dyn ApiClient>> {
        let acquire = self.inner.state.lock().await.acquire();
        match acquire {
            Acquire::Ready(handle) => Ok(handle),
            Acquire::Wait(waiter) => {
                debug!("waiting on in-flight bootstrap");
                wait_for(waiter).await
            }
            Acquire::Bootstrap(waiter) => {
                let inner = self.inner.clone();
                tokio::spawn(async move {
                    let outcome = inner.bootstrap().await;
                    let notified = inner.state.lock().await.complete(outcome);
                    debug!(notified, "bootstrap finished");
                });
                wait_for(waiter).await
            }
        }
    }

    /// Call a REST endpoint.
    ///
    /// Waits for the handle if a bootstrap is needed, then performs the call
    /// exactly once. Resolves `{request, raw}`; failures come back as
    /// `Error::ApiCall` carrying the endpoint, params and Twitter error code.
    pub async fn call_rest(&self, method: Method, endpoint: &str, params: Params) -> Result<CallResult> {
        let handle = self.app_only_bootstrap().await?;

        self.logger(method, endpoint).await;
        self.emit("call", json!({ "method": method, "endpoint": endpoint }));

        match handle.call(method, endpoint, &params).await {
            Ok(result) => {
                self.emit(
                    "response",
                    json!({ "method": method, "endpoint": endpoint, "status": result.raw.status }),
                );
                Ok(result)
            }
            Err(source) => {
                let error = ApiError::new(source, endpoint, &params);
                self.inner.recorder.record(&Record::CallFailed {
                    method,
                    endpoint: endpoint.to_string(),
                    error: error.message.clone(),
                });
                self.emit(
                    "error",
                    serde_json::to_value(&error).unwrap_or(Value::Null),
                );
                Err(Error::ApiCall(error))
            }
        }
    }

    /// Subscribe to a streaming endpoint.
    ///
    /// Data events go to `on_data`; malformed lines and the terminal
    /// connection failure go to `on_error`. There is no reconnection: once
    /// the connection drops, the returned task finishes.
    pub async fn get_stream<D, E>(
        &self,
        endpoint: &str,
        params: Params,
        mut on_data: D,
        mut on_error: E,
    ) -> Result<JoinHandle<()>>
    where
        D: FnMut(Value) + Send + 'static,
        E: FnMut(ApiError) + Send + 'static,
    {
        let handle = self.app_only_bootstrap().await?;
        let mut subscription = handle
            .stream(endpoint, &params)
            .await
            .map_err(|e| Error::ApiCall(ApiError::new(e, endpoint, &params)))?;
        self.emit("stream", json!({ "endpoint": endpoint }));

        let endpoint = endpoint.to_string();
        Ok(tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                match event {
                    StreamEvent::Data(value) => on_data(value),
                    StreamEvent::Error(e) => on_error(ApiError::new(e, &endpoint, &params)),
                }
            }
            debug!(endpoint, "stream subscription ended");
        }))
    }

    /// Revoke the held token and return a fresh client without it.
    ///
    /// Uses the bearer token if one is held, otherwise the access token key.
    /// The returned client starts from this configuration with that token
    /// cleared and the endpoint's response merged in; with the consumer pair
    /// still present it bootstraps a new bearer token on first use.
    ///
    /// This instance is left untouched, success or failure. Clones of it
    /// keep using the old handle.
    pub async fn invalidate_token(&self) -> Result<CredentialedClient> {
        let config = self.config().await;
        let (consumer_key, consumer_secret) = config
            .consumer_pair()
            .map(|(k, s)| (k.to_string(), s.to_string()))
            .ok_or_else(|| {
                Error::Configuration("consumer_key and consumer_secret are required to invalidate a token".into())
            })?;
        let (token, was_bearer) = match (config.bearer(), config.access_pair()) {
            (Some(bearer), _) => (bearer.to_string(), true),
            (None, Some((key, _))) => (key.to_string(), false),
            (None, None) => {
                return Err(Error::Configuration("no bearer or access token held".into()));
            }
        };

        let body = match twitter_auth::invalidate_token(
            &self.inner.http,
            &config.endpoints.invalidate_url,
            &consumer_key,
            &consumer_secret,
            &token,
        )
        .await
        {
            Ok(body) => body,
            Err(e) => {
                self.inner
                    .recorder
                    .record(&Record::InvalidationFailed { error: e.to_string() });
                return Err(e.into());
            }
        };
        self.inner.recorder.record(&Record::TokenInvalidated);
        self.emit("invalidated", Value::Object(body.clone()));

        let mut next = config;
        next.client = None;
        if was_bearer {
            next.bearer_token = None;
        } else {
            next.access_token_key = None;
            next.access_token_secret = None;
        }
        next.merge_response(&body);

        Builder {
            config: next,
            http: Some(self.inner.http.clone()),
            factory: Some(self.inner.factory.clone()),
            recorder: Some(self.inner.recorder.clone()),
        }
        .build()
    }

    /// Count the call and append a timestamp for `method endpoint` to the
    /// call log.
    ///
    /// The log is skipped unless `monitor` is set. With `log` also set, the
    /// entry is forwarded to the recorder.
    pub async fn logger(&self, method: Method, endpoint: &str) {
        metrics::counter!(
            "twitter_api_calls_total",
            "method" => method.as_str(),
            "endpoint" => endpoint.to_string()
        )
        .increment(1);
        let Some(call_log) = &self.inner.call_log else {
            return;
        };
        call_log.lock().await.record(method, endpoint, now_millis());
        if self.inner.log_calls {
            self.inner.recorder.record(&Record::Call {
                method,
                endpoint: endpoint.to_string(),
            });
        }
    }

    /// Broadcast an event. No-op unless `events` is set.
    pub fn emit(&self, event: &str, data: Value) {
        if let Some(emitter) = &self.inner.emitter {
            emitter.emit(event, data);
        }
    }

    /// Event receiver, or `None` when `events` is off.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<ClientEvent>> {
        self.inner.emitter.as_ref().map(EventEmitter::subscribe)
    }

    /// Copy of the call log, or `None` when `monitor` is off.
    pub async fn log_output(&self) -> Option<CallLog> {
        match &self.inner.call_log {
            Some(call_log) => Some(call_log.lock().await.clone()),
            None => None,
        }
    }
}

async fn wait_for(waiter: Waiter) -> Result<Handle> {
    waiter
        .await
        .map_err(|_| Error::TokenRequest("bootstrap ended without a result".into()))?
}

impl Inner {
    /// OAuth2 client-credentials grant, then build a bearer handle.
    async fn bootstrap(&self) -> Result<Handle> {
        let (consumer_key, consumer_secret, token_url) = {
            let config = self.config.read().await;
            let (key, secret) = config.consumer_pair().ok_or_else(|| {
                Error::Configuration(
                    "consumer_key and consumer_secret are required for app-only bootstrap".into(),
                )
            })?;
            (
                key.to_string(),
                secret.to_string(),
                config.endpoints.token_url.clone(),
            )
        };

        let token = match twitter_auth::request_bearer_token(
            &self.http,
            &token_url,
            &consumer_key,
            &consumer_secret,
        )
        .await
        {
            Ok(token) => {
                metrics::counter!("twitter_token_requests_total", "outcome" => "success").increment(1);
                token
            }
            Err(e) => {
                metrics::counter!("twitter_token_requests_total", "outcome" => "failure").increment(1);
                self.recorder
                    .record(&Record::TokenRequestFailed { error: e.to_string() });
                return Err(e.into());
            }
        };

        let handle = {
            let mut config = self.config.write().await;
            config.bearer_token = Some(Secret::new(token.access_token.clone()));
            self.factory.build(
                Credentials::Bearer(Secret::new(token.access_token)),
                &config.endpoints,
            )?
        };
        self.recorder.record(&Record::TokenAcquired);
        if let Some(emitter) = &self.emitter {
            emitter.emit("token", json!({ "token_type": token.token_type }));
        }
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoints;
    use crate::recorder::testing::MemoryRecorder;
    use axum::http::{HeaderMap, StatusCode};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use twitter_api::{RawResponse, Subscription};

    /// Handle double that records calls and answers from a script.
    #[derive(Default)]
    struct FakeApi {
        label: String,
        calls: std::sync::Mutex<Vec<(Method, String, Params)>>,
        fail_with: Option<twitter_api::Error>,
        stream_events: Vec<StreamEvent>,
    }

    impl FakeApi {
        fn named(label: &str) -> Self {
            Self {
                label: label.to_string(),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<(Method, String, Params)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ApiClient for FakeApi {
        fn id(&self) -> &str {
            &self.label
        }

        fn call<'a>(
            &'a self,
            method: Method,
            endpoint: &'a str,
            params: &'a Params,
        ) -> Pin<Box<dyn Future<Output = twitter_api::Result<CallResult>> + Send + 'a>> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push((method, endpoint.to_string(), params.clone()));
                if let Some(err) = &self.fail_with {
                    return Err(err.clone());
                }
                Ok(CallResult {
                    request: json!({ "id_str": params.get("id").cloned().unwrap_or_default() }),
                    raw: RawResponse {
                        status: 200,
                        url: format!("fake://{endpoint}"),
                        ..RawResponse::default()
                    },
                })
            })
        }

        fn stream<'a>(
            &'a self,
            _endpoint: &'a str,
            _params: &'a Params,
        ) -> Pin<Box<dyn Future<Output = twitter_api::Result<Subscription>> + Send + 'a>> {
            Box::pin(async move {
                let (tx, subscription) = Subscription::channel();
                for event in &self.stream_events {
                    tx.send(event.clone()).unwrap();
                }
                Ok(subscription)
            })
        }
    }

    /// Factory double: builds `FakeApi` handles labelled by credential kind
    /// and keeps every handle it hands out.
    #[derive(Default)]
    struct FakeFactory {
        built: std::sync::Mutex<Vec<String>>,
        handles: std::sync::Mutex<Vec<Arc<FakeApi>>>,
    }

    impl FakeFactory {
        fn built(&self) -> Vec<String> {
            self.built.lock().unwrap().clone()
        }

        /// Calls made through the `index`th handle built.
        fn handle_calls(&self, index: usize) -> Vec<(Method, String, Params)> {
            self.handles.lock().unwrap()[index].calls()
        }
    }

    impl HandleFactory for FakeFactory {
        fn build(&self, credentials: Credentials, _endpoints: &Endpoints) -> Result<Arc<dyn ApiClient>> {
            let label = match credentials {
                Credentials::Bearer(token) => format!("bearer:{}", token.expose()),
                Credentials::User(ctx) => format!("user:{}", ctx.token),
            };
            self.built.lock().unwrap().push(label.clone());
            let handle = Arc::new(FakeApi::named(&label));
            self.handles.lock().unwrap().push(handle.clone());
            Ok(handle)
        }
    }

    #[derive(Debug, Clone)]
    struct OAuthRequest {
        path: String,
        authorization: String,
        body: String,
    }

    struct OAuthServer {
        url: String,
        requests: Arc<std::sync::Mutex<Vec<OAuthRequest>>>,
    }

    impl OAuthServer {
        fn count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn requests(&self) -> Vec<OAuthRequest> {
            self.requests.lock().unwrap().clone()
        }

        fn endpoints(&self) -> Endpoints {
            Endpoints {
                token_url: format!("{}/oauth2/token", self.url),
                invalidate_url: format!("{}/oauth2/invalidate_token", self.url),
                ..Endpoints::default()
            }
        }
    }

    /// Local OAuth2 endpoint. Each request is recorded, then answered after
    /// `delay` with `status`/`reply`.
    async fn start_oauth_server(status: StatusCode, reply: &'static str, delay: Duration) -> OAuthServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = requests.clone();

        let app = axum::Router::new().fallback(
            move |uri: axum::http::Uri, headers: HeaderMap, body: String| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(OAuthRequest {
                        path: uri.path().to_string(),
                        authorization: headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string(),
                        body,
                    });
                    tokio::time::sleep(delay).await;
                    (status, reply)
                }
            },
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        OAuthServer { url, requests }
    }

    async fn token_server() -> OAuthServer {
        start_oauth_server(
            StatusCode::OK,
            r#"{"token_type":"bearer","access_token":"AAAA-app"}"#,
            Duration::ZERO,
        )
        .await
    }

    fn app_only_config(server: &OAuthServer) -> Config {
        Config {
            endpoints: server.endpoints(),
            ..Config::app_only("ck", "cs")
        }
    }

    fn build(config: Config, factory: &Arc<FakeFactory>) -> CredentialedClient {
        CredentialedClient::builder(config)
            .factory(factory.clone())
            .recorder(Arc::new(MemoryRecorder::default()))
            .build()
            .unwrap()
    }

    fn show_params() -> Params {
        [("id".to_string(), "20".to_string())].into_iter().collect()
    }

    #[tokio::test]
    async fn supplied_client_is_reused_without_network() {
        let server = token_server().await;
        let fake = Arc::new(FakeApi::named("supplied"));
        let config = Config {
            client: Some(fake.clone()),
            endpoints: server.endpoints(),
            ..Config::default()
        };
        let client = CredentialedClient::new(config).unwrap();
        assert_eq!(client.state_label().await, "ready");

        client
            .call_rest(Method::Get, "statuses/show", show_params())
            .await
            .unwrap();
        assert_eq!(fake.calls().len(), 1);
        assert_eq!(server.count(), 0);
    }

    #[tokio::test]
    async fn bearer_config_is_ready_without_bootstrap() {
        let server = token_server().await;
        let factory = Arc::new(FakeFactory::default());
        let config = Config {
            bearer_token: Some(Secret::from("AAAA-given")),
            ..app_only_config(&server)
        };

        let client = build(config, &factory);
        assert_eq!(client.state_label().await, "ready");
        assert_eq!(factory.built(), vec!["bearer:AAAA-given"]);
        assert_eq!(server.count(), 0);
    }

    #[tokio::test]
    async fn access_pair_config_is_ready_with_user_context() {
        let factory = Arc::new(FakeFactory::default());
        let config = Config {
            access_token_key: Some("tk".into()),
            access_token_secret: Some(Secret::from("ts")),
            ..Config::app_only("ck", "cs")
        };

        let client = build(config, &factory);
        assert_eq!(client.state_label().await, "ready");
        assert_eq!(factory.built(), vec!["user:tk"]);
    }

    #[test]
    fn missing_credentials_fail_construction() {
        let err = CredentialedClient::new(Config::default()).err().unwrap();
        assert!(matches!(err, Error::Configuration(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn consumer_pair_bootstraps_once_on_first_call() {
        let server = token_server().await;
        let factory = Arc::new(FakeFactory::default());
        let client = build(app_only_config(&server), &factory);
        assert_eq!(client.state_label().await, "uninitialized");
        assert_eq!(server.count(), 0, "construction must not touch the network");

        let result = client
            .call_rest(Method::Get, "/statuses/show", show_params())
            .await
            .unwrap();
        assert_eq!(result.request["id_str"], "20");
        assert_eq!(result.raw.status, 200);

        client
            .call_rest(Method::Get, "/statuses/show", show_params())
            .await
            .unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 1, "exactly one token request");
        assert_eq!(requests[0].path, "/oauth2/token");
        assert_eq!(requests[0].authorization, "Basic Y2s6Y3M=");
        assert_eq!(requests[0].body, "grant_type=client_credentials");

        assert_eq!(client.state_label().await, "ready");
        assert_eq!(client.config().await.bearer(), Some("AAAA-app"));
        assert_eq!(factory.built(), vec!["bearer:AAAA-app"]);

        let calls = factory.handle_calls(0);
        assert_eq!(calls.len(), 2, "each call_rest reaches the handle once");
        assert_eq!(calls[0].0, Method::Get);
        assert_eq!(calls[0].1, "/statuses/show");
        assert_eq!(calls[0].2, show_params());
    }

    #[tokio::test]
    async fn concurrent_calls_share_one_bootstrap() {
        let server = start_oauth_server(
            StatusCode::OK,
            r#"{"token_type":"bearer","access_token":"AAAA-app"}"#,
            Duration::from_millis(100),
        )
        .await;
        let factory = Arc::new(FakeFactory::default());
        let client = build(app_only_config(&server), &factory);

        let calls = (0..5).map(|_| {
            let client = client.clone();
            async move {
                client
                    .call_rest(Method::Get, "statuses/show", show_params())
                    .await
            }
        });
        let results = futures_util::future::join_all(calls).await;

        assert!(results.iter().all(Result::is_ok), "got {results:?}");
        assert_eq!(server.count(), 1);
        assert_eq!(factory.built().len(), 1);
        assert_eq!(factory.handle_calls(0).len(), 5);
    }

    #[tokio::test]
    async fn failed_bootstrap_reaches_every_waiter_and_allows_retry() {
        let server = start_oauth_server(
            StatusCode::SERVICE_UNAVAILABLE,
            "over capacity",
            Duration::from_millis(50),
        )
        .await;
        let factory = Arc::new(FakeFactory::default());
        let recorder = Arc::new(MemoryRecorder::default());
        let client = CredentialedClient::builder(app_only_config(&server))
            .factory(factory.clone())
            .recorder(recorder.clone())
            .build()
            .unwrap();

        let (a, b) = tokio::join!(
            client.call_rest(Method::Get, "statuses/show", show_params()),
            client.call_rest(Method::Get, "statuses/show", show_params()),
        );
        assert!(matches!(a, Err(Error::TokenRequest(_))), "got {a:?}");
        assert!(matches!(b, Err(Error::TokenRequest(_))), "got {b:?}");
        assert_eq!(server.count(), 1);
        assert_eq!(client.state_label().await, "uninitialized");
        assert!(
            recorder
                .records()
                .iter()
                .any(|r| matches!(r, Record::TokenRequestFailed { .. }))
        );

        let retry = client
            .call_rest(Method::Get, "statuses/show", show_params())
            .await;
        assert!(retry.is_err());
        assert_eq!(server.count(), 2, "next call starts a fresh bootstrap");
        assert!(factory.built().is_empty());
    }

    #[tokio::test]
    async fn connect_bootstraps_eagerly() {
        let server = token_server().await;
        let client = CredentialedClient::connect(app_only_config(&server))
            .await
            .unwrap();
        assert_eq!(server.count(), 1);
        assert_eq!(client.state_label().await, "ready");
    }

    #[tokio::test]
    async fn api_failure_is_wrapped_and_recorded() {
        let fake = Arc::new(FakeApi {
            label: "failing".into(),
            fail_with: Some(twitter_api::Error::Api {
                status: 404,
                code: Some(144),
                message: "No status found with that ID.".into(),
            }),
            ..FakeApi::default()
        });
        let recorder = Arc::new(MemoryRecorder::default());
        let client = CredentialedClient::builder(Config {
            client: Some(fake),
            ..Config::default()
        })
        .recorder(recorder.clone())
        .build()
        .unwrap();

        let err = client
            .call_rest(Method::Get, "statuses/show", show_params())
            .await
            .unwrap_err();
        match err {
            Error::ApiCall(api) => {
                assert_eq!(api.code, Some(144));
                assert_eq!(api.endpoint, "statuses/show");
                assert_eq!(api.message, r#"No status found with that ID. {"id":"20"}"#);
            }
            other => panic!("expected ApiCall, got {other:?}"),
        }
        assert!(matches!(
            recorder.records().as_slice(),
            [Record::CallFailed { endpoint, .. }] if endpoint == "statuses/show"
        ));
    }

    #[tokio::test]
    async fn invalidate_posts_held_token_and_returns_fresh_client() {
        let server = start_oauth_server(
            StatusCode::OK,
            r#"{"access_token":"AAAA-given"}"#,
            Duration::ZERO,
        )
        .await;
        let factory = Arc::new(FakeFactory::default());
        let config = Config {
            bearer_token: Some(Secret::from("AAAA-given")),
            ..app_only_config(&server)
        };
        let client = build(config, &factory);

        let fresh = client.invalidate_token().await.unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/oauth2/invalidate_token");
        assert_eq!(requests[0].authorization, "Basic Y2s6Y3M=");
        assert_eq!(requests[0].body, "access_token=AAAA-given");

        assert!(fresh.config().await.bearer().is_none());
        assert_eq!(fresh.state_label().await, "uninitialized");
        // The invalidated instance keeps its handle
        assert_eq!(client.state_label().await, "ready");
        assert_eq!(client.config().await.bearer(), Some("AAAA-given"));
    }

    #[tokio::test]
    async fn failed_invalidation_changes_nothing() {
        let server = start_oauth_server(StatusCode::FORBIDDEN, "{}", Duration::ZERO).await;
        let factory = Arc::new(FakeFactory::default());
        let config = Config {
            bearer_token: Some(Secret::from("AAAA-given")),
            ..app_only_config(&server)
        };
        let client = build(config, &factory);

        let err = client.invalidate_token().await.err().unwrap();
        assert!(matches!(err, Error::TokenRequest(_)), "got {err:?}");
        assert_eq!(client.state_label().await, "ready");
        assert_eq!(client.config().await.bearer(), Some("AAAA-given"));
    }

    #[tokio::test]
    async fn invalidate_without_consumer_pair_fails_fast() {
        let server = token_server().await;
        let config = Config {
            bearer_token: Some(Secret::from("AAAA-given")),
            endpoints: server.endpoints(),
            ..Config::default()
        };
        let client = build(config, &Arc::new(FakeFactory::default()));

        let err = client.invalidate_token().await.err().unwrap();
        assert!(matches!(err, Error::Configuration(_)), "got {err:?}");
        assert_eq!(server.count(), 0);
    }

    #[tokio::test]
    async fn call_log_absent_without_monitor() {
        let client = CredentialedClient::new(Config {
            client: Some(Arc::new(FakeApi::named("fake"))),
            ..Config::default()
        })
        .unwrap();

        client
            .call_rest(Method::Get, "statuses/show", show_params())
            .await
            .unwrap();
        assert!(client.log_output().await.is_none());
    }

    #[tokio::test]
    async fn monitor_records_each_call() {
        let recorder = Arc::new(MemoryRecorder::default());
        let client = CredentialedClient::builder(Config {
            client: Some(Arc::new(FakeApi::named("fake"))),
            monitor: true,
            log: true,
            ..Config::default()
        })
        .recorder(recorder.clone())
        .build()
        .unwrap();

        for _ in 0..2 {
            client
                .call_rest(Method::Get, "statuses/show", show_params())
                .await
                .unwrap();
        }
        client
            .call_rest(Method::Post, "statuses/update", Params::new())
            .await
            .unwrap();

        let log = client.log_output().await.unwrap();
        let shows = log.timestamps(Method::Get, "statuses/show");
        assert_eq!(shows.len(), 2);
        assert!(shows[0] <= shows[1]);
        assert_eq!(log.timestamps(Method::Post, "statuses/update").len(), 1);
        assert_eq!(
            recorder
                .records()
                .iter()
                .filter(|r| matches!(r, Record::Call { .. }))
                .count(),
            3
        );
    }

    #[tokio::test]
    async fn events_are_broadcast_when_enabled() {
        let client = CredentialedClient::new(Config {
            client: Some(Arc::new(FakeApi::named("fake"))),
            events: true,
            ..Config::default()
        })
        .unwrap();
        let mut rx = client.subscribe().unwrap();

        client
            .call_rest(Method::Get, "statuses/show", show_params())
            .await
            .unwrap();

        let call = rx.recv().await.unwrap();
        assert_eq!(call.name, "call");
        assert_eq!(call.data["method"], "GET");
        assert_eq!(call.data["endpoint"], "statuses/show");
        let response = rx.recv().await.unwrap();
        assert_eq!(response.name, "response");
        assert_eq!(response.data["status"], 200);
    }

    #[tokio::test]
    async fn failed_call_broadcasts_error_event() {
        let fake = Arc::new(FakeApi {
            label: "failing".into(),
            fail_with: Some(twitter_api::Error::Api {
                status: 404,
                code: Some(34),
                message: "Sorry, that page does not exist.".into(),
            }),
            ..FakeApi::default()
        });
        let client = CredentialedClient::new(Config {
            client: Some(fake),
            events: true,
            ..Config::default()
        })
        .unwrap();
        let mut rx = client.subscribe().unwrap();

        let result = client
            .call_rest(Method::Get, "users/show", show_params())
            .await;
        assert!(matches!(result, Err(Error::ApiCall(_))));

        assert_eq!(rx.recv().await.unwrap().name, "call");
        let error = rx.recv().await.unwrap();
        assert_eq!(error.name, "error");
        assert_eq!(error.data["code"], 34);
        assert_eq!(error.data["endpoint"], "users/show");
        assert_eq!(error.data["params"]["id"], "20");
    }

    #[tokio::test]
    async fn bootstrap_and_invalidation_broadcast_events() {
        let server = token_server().await;
        let factory = Arc::new(FakeFactory::default());
        let config = Config {
            events: true,
            ..app_only_config(&server)
        };
        let client = build(config, &factory);
        let mut rx = client.subscribe().unwrap();

        client.app_only_bootstrap().await.unwrap();
        let token = rx.recv().await.unwrap();
        assert_eq!(token.name, "token");
        assert_eq!(token.data["token_type"], "bearer");

        client.invalidate_token().await.unwrap();
        let invalidated = rx.recv().await.unwrap();
        assert_eq!(invalidated.name, "invalidated");
        assert_eq!(invalidated.data["access_token"], "AAAA-app");
    }

    #[tokio::test]
    async fn events_disabled_has_no_subscription() {
        let client = CredentialedClient::new(Config {
            client: Some(Arc::new(FakeApi::named("fake"))),
            ..Config::default()
        })
        .unwrap();
        assert!(client.subscribe().is_none());
    }

    #[tokio::test]
    async fn stream_dispatches_data_and_terminal_error() {
        let fake = Arc::new(FakeApi {
            label: "streaming".into(),
            stream_events: vec![
                StreamEvent::Data(json!({ "text": "one" })),
                StreamEvent::Data(json!({ "text": "two" })),
                StreamEvent::Error(twitter_api::Error::Stream("connection closed by server".into())),
            ],
            ..FakeApi::default()
        });
        let client = CredentialedClient::new(Config {
            client: Some(fake),
            ..Config::default()
        })
        .unwrap();

        let data = Arc::new(std::sync::Mutex::new(Vec::new()));
        let errors = Arc::new(AtomicUsize::new(0));
        let data_sink = data.clone();
        let error_sink = errors.clone();

        let task = client
            .get_stream(
                "statuses/filter",
                [("track".to_string(), "rust".to_string())].into_iter().collect(),
                move |value| data_sink.lock().unwrap().push(value["text"].as_str().unwrap().to_string()),
                move |err| {
                    assert_eq!(err.endpoint, "statuses/filter");
                    error_sink.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await
            .unwrap();
        task.await.unwrap();

        assert_eq!(*data.lock().unwrap(), vec!["one", "two"]);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }
}
