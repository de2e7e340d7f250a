//! Watch events and event sources.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Operation reported by a watch stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOp {
    Added,
    Modified,
    Deleted,
    /// Hard failure in the stream itself; fails the current batch.
    Error(String),
}

/// One normalized watch notification.
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub op: EventOp,
    /// Entity kind the event belongs to.
    pub kind: String,
    /// Entity name (or identifier, for deletions keyed remotely).
    pub name: String,
    /// Raw cluster-native payload; empty for deletions.
    pub payload: serde_json::Value,
}

impl WatchEvent {
    /// Create an added event.
    pub fn added(kind: impl Into<String>, name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            op: EventOp::Added,
            kind: kind.into(),
            name: name.into(),
            payload,
        }
    }

    /// Create a modified event.
    pub fn modified(
        kind: impl Into<String>,
        name: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            op: EventOp::Modified,
            kind: kind.into(),
            name: name.into(),
            payload,
        }
    }

    /// Create a deleted event.
    pub fn deleted(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            op: EventOp::Deleted,
            kind: kind.into(),
            name: name.into(),
            payload: serde_json::Value::Null,
        }
    }

    /// Create a stream error event.
    pub fn error(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            op: EventOp::Error(reason.into()),
            kind: kind.into(),
            name: String::new(),
            payload: serde_json::Value::Null,
        }
    }
}

/// Abstract per-kind watch stream.
///
/// Reconnecting and retrying a broken stream is the source's own
/// responsibility; the controller only consumes what it delivers.
#[async_trait]
pub trait EventSource: Send {
    /// Kind this source watches.
    fn kind(&self) -> &str;

    /// Next event, or `None` when the stream is exhausted.
    async fn next(&mut self) -> Option<WatchEvent>;
}

/// Spawn one forwarding task per source, all feeding the shared queue.
///
/// Watch tasks never touch shared state directly: they are pure producers
/// onto the many-producer, single-consumer channel the reconcile loop
/// drains.
pub fn spawn_watchers(
    sources: Vec<Box<dyn EventSource>>,
    tx: &mpsc::Sender<WatchEvent>,
) -> Vec<JoinHandle<()>> {
    sources
        .into_iter()
        .map(|mut source| {
            let tx = tx.clone();
            tokio::spawn(async move {
                while let Some(event) = source.next().await {
                    debug!(kind = %event.kind, name = %event.name, op = ?event.op, "watch event");
                    if tx.send(event).await.is_err() {
                        // Consumer is gone; nothing left to forward to.
                        break;
                    }
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    struct ScriptedSource {
        kind: String,
        events: Vec<WatchEvent>,
    }

    #[async_trait]
    impl EventSource for ScriptedSource {
        fn kind(&self) -> &str {
            &self.kind
        }
        async fn next(&mut self) -> Option<WatchEvent> {
            if self.events.is_empty() {
                None
            } else {
                Some(self.events.remove(0))
            }
        }
    }

    #[tokio::test]
    async fn test_watchers_forward_onto_shared_queue() {
        let (tx, mut rx) = mpsc::channel(16);
        let sources: Vec<Box<dyn EventSource>> = vec![
            Box::new(ScriptedSource {
                kind: "Condition".into(),
                events: vec![WatchEvent::added("Condition", "c1", serde_json::json!({}))],
            }),
            Box::new(ScriptedSource {
                kind: "Policy".into(),
                events: vec![WatchEvent::deleted("Policy", "p1")],
            }),
        ];

        let handles = spawn_watchers(sources, &tx);
        drop(tx);

        let mut kinds = Vec::new();
        while let Some(event) = rx.recv().await {
            kinds.push(event.kind);
        }
        kinds.sort_unstable();
        assert_eq!(kinds, vec!["Condition", "Policy"]);
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
