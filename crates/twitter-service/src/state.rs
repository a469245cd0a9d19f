//! Credential state machine
//!
//! `Uninitialized → AwaitingToken → Ready`. The transitions are plain
//! methods on `ClientState`; the caller holds the lock and performs the
//! bootstrap I/O implied by [`Acquire::Bootstrap`].
//!
//! Exactly one bootstrap runs per `AwaitingToken` episode. Every caller that
//! arrives meanwhile is queued as a waiter and receives the same outcome. A
//! failed bootstrap drops back to `Uninitialized`, so the next caller starts
//! a fresh attempt.

use std::fmt;
use std::sync::Arc;

use tokio::sync::oneshot;
use twitter_api::ApiClient;

use crate::error::Result;

pub type Handle = Arc<dyn ApiClient>;

/// Receives the outcome of the bootstrap a caller is queued on.
pub type Waiter = oneshot::Receiver<Result<Handle>>;

pub enum ClientState {
    /// No handle and no bootstrap in flight
    Uninitialized,
    /// Token request in flight; queued callers are notified on completion
    AwaitingToken {
        waiters: Vec<oneshot::Sender<Result<Handle>>>,
    },
    /// Handle available; calls execute directly
    Ready(Handle),
}

/// What a caller must do after [`ClientState::acquire`].
pub enum Acquire {
    /// Use this handle
    Ready(Handle),
    /// A bootstrap is already in flight; await its outcome
    Wait(Waiter),
    /// The caller must start the bootstrap, then await its outcome
    Bootstrap(Waiter),
}

impl ClientState {
    pub fn label(&self) -> &'static str {
        match self {
            ClientState::Uninitialized => "uninitialized",
            ClientState::AwaitingToken { .. } => "awaiting_token",
            ClientState::Ready(_) => "ready",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ClientState::Ready(_))
    }

    /// Register interest in a handle.
    pub fn acquire(&mut self) -> Acquire {
        match self {
            ClientState::Ready(handle) => Acquire::Ready(handle.clone()),
            ClientState::AwaitingToken { waiters } => {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                Acquire::Wait(rx)
            }
            ClientState::Uninitialized => {
                let (tx, rx) = oneshot::channel();
                *self = ClientState::AwaitingToken { waiters: vec![tx] };
                Acquire::Bootstrap(rx)
            }
        }
    }

    /// Finish the in-flight bootstrap and notify every queued caller.
    ///
    /// Returns the number of callers notified.
    pub fn complete(&mut self, outcome: Result<Handle>) -> usize {
        let waiters = match std::mem::replace(self, ClientState::Uninitialized) {
            ClientState::AwaitingToken { waiters } => waiters,
            _ => Vec::new(),
        };
        if let Ok(handle) = &outcome {
            *self = ClientState::Ready(handle.clone());
        }
        let notified = waiters.len();
        for waiter in waiters {
            // A caller that gave up has dropped its receiver
            let _ = waiter.send(outcome.clone());
        }
        notified
    }
}

impl fmt::Debug for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientState::AwaitingToken { waiters } => f
                .debug_struct("AwaitingToken")
                .field("waiters", &waiters.len())
                .finish(),
            ClientState::Ready(handle) => write!(f, "Ready({})", handle.id()),
            ClientState::Uninitialized => f.write_str("Uninitialized"),
        }
    }
}
