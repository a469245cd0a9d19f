//! Credentialed Twitter client
//!
//! Turns a `Config` into a ready-to-use API handle and wraps REST calls and
//! stream subscriptions around it.
//!
//! Credential resolution, in priority order:
//! 1. A pre-built `client` handle is reused as-is
//! 2. A `bearer_token` builds an app-only handle directly
//! 3. An access token pair plus the consumer pair builds a user-context handle
//! 4. A bare consumer pair defers to the app-only bootstrap: the first call
//!    exchanges the pair for a bearer token, concurrent callers wait on that
//!    single request
//!
//! Optional extras, off by default: an in-memory call log (`monitor`) and a
//! broadcast event stream (`events`).

pub mod call_log;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod factory;
pub mod recorder;
pub mod state;

pub use call_log::CallLog;
pub use client::{Builder, CredentialedClient};
pub use config::{Config, CredentialSource, Endpoints};
pub use error::{ApiError, Error, Result};
pub use events::{ClientEvent, EventEmitter};
pub use factory::{HandleFactory, HttpHandleFactory};
pub use recorder::{Record, Recorder, TracingRecorder};
pub use state::ClientState;

pub use twitter_api::{ApiClient, CallResult, Method, Params, RawResponse, StreamEvent, Subscription};
