//! Injected logging collaborator
//!
//! The client reports notable moments through a `Recorder` rather than
//! writing to stdout/stderr. `TracingRecorder` is the default.

use tracing::{info, warn};
use twitter_api::Method;

/// Something worth recording about client activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// A call was logged (only with `log` and `monitor` enabled)
    Call { method: Method, endpoint: String },
    CallFailed {
        method: Method,
        endpoint: String,
        error: String,
    },
    TokenAcquired,
    TokenRequestFailed { error: String },
    TokenInvalidated,
    InvalidationFailed { error: String },
}

pub trait Recorder: Send + Sync {
    fn record(&self, record: &Record);
}

/// Emits each record as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRecorder;

impl Recorder for TracingRecorder {
    fn record(&self, record: &Record) {
        match record {
            Record::Call { method, endpoint } => {
                info!(%method, endpoint = %endpoint, "twitter api call");
            }
            Record::CallFailed {
                method,
                endpoint,
                error,
            } => {
                warn!(%method, endpoint = %endpoint, error = %error, "twitter api call failed");
            }
            Record::TokenAcquired => info!("app-only bearer token acquired"),
            Record::TokenRequestFailed { error } => {
                warn!(error = %error, "bearer token request failed");
            }
            Record::TokenInvalidated => info!("bearer token invalidated"),
            Record::InvalidationFailed { error } => {
                warn!(error = %error, "bearer token invalidation failed");
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracing_recorder_handles_every_record() {
        let recorder = TracingRecorder;
        for record in [
            Record::Call {
                method: Method::Get,
                endpoint: "statuses/show".into(),
            },
            Record::CallFailed {
                method: Method::Post,
                endpoint: "statuses/update".into(),
                error: "duplicate".into(),
            },
            Record::TokenAcquired,
            Record::TokenRequestFailed {
                error: "503".into(),
            },
            Record::TokenInvalidated,
            Record::InvalidationFailed {
                error: "403".into(),
            },
        ] {
            recorder.record(&record);
        }
    }

    #[test]
    fn memory_recorder_keeps_order() {
        let recorder = testing::MemoryRecorder::default();
        recorder.record(&Record::TokenAcquired);
        recorder.record(&Record::TokenInvalidated);
        assert_eq!(
            recorder.records(),
            vec![Record::TokenAcquired, Record::TokenInvalidated]
        );
    }
}
