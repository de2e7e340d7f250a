//! Controller configuration.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::event::WatchEvent;

/// Configuration for the reconcile loop.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Idle window after which pending events count as a complete batch
    /// and a reconciliation pass runs.
    pub quiescence: Duration,
    /// Capacity of the shared watch event queue.
    pub channel_capacity: usize,
    /// Include secret-bearing fields in content comparison.
    pub compare_secrets: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            quiescence: Duration::from_secs(2),
            channel_capacity: 256,
            compare_secrets: false,
        }
    }
}

impl ControllerConfig {
    /// Create the shared many-producer, single-consumer event queue.
    pub fn event_channel(&self) -> (mpsc::Sender<WatchEvent>, mpsc::Receiver<WatchEvent>) {
        mpsc::channel(self.channel_capacity)
    }
}
