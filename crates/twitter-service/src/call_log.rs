//! In-memory call history
//!
//! Append-only map from `(method, endpoint)` to the unix-millisecond
//! timestamps of each call. Lives only as long as its client.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use twitter_api::Method;

#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: BTreeMap<(Method, String), Vec<u64>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, method: Method, endpoint: &str, at_millis: u64) {
        self.entries
            .entry((method, endpoint.to_string()))
            .or_default()
            .push(at_millis);
    }

    /// Timestamps for one method/endpoint pair, oldest first.
    pub fn timestamps(&self, method: Method, endpoint: &str) -> &[u64] {
        self.entries
            .get(&(method, endpoint.to_string()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total number of recorded calls.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Method, &str, &[u64])> {
        self.entries
            .iter()
            .map(|((method, endpoint), at)| (*method, endpoint.as_str(), at.as_slice()))
    }

    /// `{"GET statuses/show": [..], ...}`
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .iter()
            .map(|(method, endpoint, at)| (format!("{method} {endpoint}"), Value::from(at.to_vec())))
            .collect();
        Value::Object(map)
    }
}
