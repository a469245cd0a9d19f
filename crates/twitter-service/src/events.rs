//! Call activity events
//!
//! A thin broadcast channel. Emitting with no subscribers is not an error;
//! slow subscribers lag and lose the oldest events rather than blocking
//! calls.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

/// Events kept per subscriber before the oldest are dropped.
pub const EVENT_CAPACITY: usize = 256;

/// A named event with a JSON payload (`call`, `response`, `error`, `token`,
/// `invalidated`, `stream`).
#[derive(Debug, Clone, Serialize)]
pub struct ClientEvent {
    pub name: String,
    pub data: Value,
}

pub struct EventEmitter {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventEmitter {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Returns how many subscribers received the event.
    pub fn emit(&self, name: &str, data: Value) -> usize {
        self.tx
            .send(ClientEvent {
                name: name.to_string(),
                data,
            })
            .unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}
