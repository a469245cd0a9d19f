//! Streaming subscriptions
//!
//! Twitter streams deliver one JSON document per line, separated by `\r\n`,
//! with blank lines as keep-alives. A subscription reads the response body on
//! a spawned task and forwards each document as `StreamEvent::Data`. The
//! subscription is not restartable: when the connection ends, for whatever
//! reason, a final `StreamEvent::Error` is sent and the channel closes.

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::Error;

/// One event from a stream subscription.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A decoded JSON document (tweet, delete notice, limit notice, ...)
    Data(Value),
    /// A malformed line or the terminal failure of the connection
    Error(Error),
}

/// Receiving end of a stream subscription.
///
/// Dropping the subscription aborts the reader task and closes the
/// connection.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<StreamEvent>,
    reader: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Subscription fed by hand; used by handles that do not stream over HTTP.
    pub fn channel() -> (mpsc::UnboundedSender<StreamEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            tx,
            Self {
                events: rx,
                reader: None,
            },
        )
    }

    /// Start reading a successful streaming response.
    pub fn from_response(response: reqwest::Response) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_body(response, tx));
        Self {
            events: rx,
            reader: Some(reader),
        }
    }

    /// Next event, or `None` once the terminal event has been consumed.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// Longest partial line buffered while waiting for its newline.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

async fn read_body(response: reqwest::Response, tx: mpsc::UnboundedSender<StreamEvent>) {
    read_chunks(response.bytes_stream(), tx).await;
}

async fn read_chunks<S>(mut body: S, tx: mpsc::UnboundedSender<StreamEvent>)
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = body.next().await {
        let chunk: Bytes = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(error = %e, "stream connection failed");
                let _ = tx.send(StreamEvent::Error(Error::Http(e.to_string())));
                return;
            }
        };
        buffer.extend_from_slice(&chunk);

        for line in drain_lines(&mut buffer) {
            if let Some(event) = parse_line(&line) {
                if tx.send(event).is_err() {
                    debug!("subscriber dropped, stopping stream reader");
                    return;
                }
            }
        }

        if buffer.len() > MAX_LINE_BYTES {
            warn!(buffered = buffer.len(), "stream line exceeds limit, closing");
            let _ = tx.send(StreamEvent::Error(Error::Stream(format!(
                "line exceeds {MAX_LINE_BYTES} bytes without a newline"
            ))));
            return;
        }
    }

    debug!("stream closed by server");
    let _ = tx.send(StreamEvent::Error(Error::Stream(
        "connection closed by server".into(),
    )));
}

/// Remove every complete line from `buffer`, leaving a trailing partial line.
fn drain_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=pos).collect();
        lines.push(String::from_utf8_lossy(&line).trim().to_string());
    }
    lines
}

/// Keep-alive lines produce no event.
fn parse_line(line: &str) -> Option<StreamEvent> {
    if line.is_empty() {
        return None;
    }
    Some(match serde_json::from_str::<Value>(line) {
        Ok(value) => StreamEvent::Data(value),
        Err(e) => StreamEvent::Error(Error::Decode(format!("malformed stream line: {e}"))),
    })
}
