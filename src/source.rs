//! File-backed event source for the standalone binary.

use std::collections::VecDeque;

use async_trait::async_trait;

use warden_controller::{EventSource, WatchEvent};

/// Replays the entities of one kind from an expected-state file as a
/// finished stream of `Added` events.
pub struct FileSource {
    kind: String,
    events: VecDeque<WatchEvent>,
}

impl FileSource {
    pub fn new(kind: impl Into<String>, payloads: Vec<serde_json::Value>) -> Self {
        let kind = kind.into();
        let events = payloads
            .into_iter()
            .map(|payload| {
                let name = payload
                    .get("name")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                WatchEvent::added(kind.clone(), name, payload)
            })
            .collect();
        Self { kind, events }
    }
}

#[async_trait]
impl EventSource for FileSource {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn next(&mut self) -> Option<WatchEvent> {
        self.events.pop_front()
    }
}
