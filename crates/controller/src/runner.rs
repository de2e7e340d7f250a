//! The reconcile loop.
//!
//! A single task is the sole consumer of the watch event queue and the
//! sole mutator of the expected-state collections, so no locking is needed
//! on state mutation. Bursts of watch events are debounced: a pass only
//! runs once the queue has been quiet for the quiescence window, and
//! passes never overlap.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{info, warn};

use warden_engine::{EntityClient, Orchestrator, PassReport};
use warden_schema::{Direction, EntityModel};
use warden_state::{
    EntityCollection, EntityLoader, EntityOp, FileFetcher, SecretResolver,
};

use crate::config::ControllerConfig;
use crate::error::{Error, Result};
use crate::event::{EventOp, WatchEvent};

/// Consumes the shared event queue and reconciles on quiescence.
pub struct ReconcileLoop<'a> {
    model: &'a EntityModel,
    loader: EntityLoader<'a>,
    client: &'a dyn EntityClient,
    config: ControllerConfig,
    rx: mpsc::Receiver<WatchEvent>,
    expected: BTreeMap<String, EntityCollection>,
}

impl<'a> ReconcileLoop<'a> {
    pub fn new(
        model: &'a EntityModel,
        secrets: &'a dyn SecretResolver,
        files: &'a dyn FileFetcher,
        client: &'a dyn EntityClient,
        config: ControllerConfig,
        rx: mpsc::Receiver<WatchEvent>,
    ) -> Self {
        Self {
            model,
            loader: EntityLoader::new(model, secrets, files),
            client,
            config,
            rx,
            expected: BTreeMap::new(),
        }
    }

    /// Run until the event queue closes.
    ///
    /// Each dequeued event is applied to the expected state immediately; a
    /// hard load error or stream error fails the whole batch and returns,
    /// terminating the process. On a quiescence timeout the loop runs one
    /// reconciliation pass. When the queue closes, a final pass runs and
    /// the loop ends cleanly.
    pub async fn run(mut self) -> Result<()> {
        loop {
            match timeout(self.config.quiescence, self.rx.recv()).await {
                Ok(Some(event)) => self.apply_event(event)?,
                Ok(None) => {
                    info!("event queue closed, running final pass");
                    self.reconcile_once().await?;
                    return Ok(());
                }
                Err(_) => {
                    self.reconcile_once().await?;
                }
            }
        }
    }

    /// Apply one watch event to the expected state.
    fn apply_event(&mut self, event: WatchEvent) -> Result<()> {
        let op = match event.op {
            EventOp::Error(reason) => return Err(Error::watch(event.kind, reason)),
            EventOp::Added => EntityOp::Add,
            EventOp::Modified => EntityOp::Modify,
            EventOp::Deleted => EntityOp::Delete,
        };
        let collection = self
            .expected
            .entry(event.kind.clone())
            .or_insert_with(|| EntityCollection::new(event.kind.clone()));
        if op == EntityOp::Delete {
            collection.remove(&event.name);
            return Ok(());
        }
        let entity = self
            .loader
            .load(&event.kind, &event.payload, Direction::Cluster)?;
        collection.apply(entity, op);
        Ok(())
    }

    /// Run one reconciliation pass over a snapshot of the expected state.
    ///
    /// The snapshot keeps reference rewriting out of the stored expected
    /// state, so names resolve fresh on every pass.
    async fn reconcile_once(&mut self) -> Result<PassReport> {
        let mut snapshot = self.expected.clone();
        let report = Orchestrator::new(self.model, self.client)
            .compare_secrets(self.config.compare_secrets)
            .reconcile_all(&mut snapshot)
            .await?;
        if report.is_clean() {
            info!(kinds = report.outcomes.len(), "pass complete");
        } else {
            warn!(kinds = report.outcomes.len(), "pass completed with conflicts or errors");
        }
        Ok(report)
    }

    /// Expected-state view, mainly for inspection in tests.
    pub fn expected(&self) -> &BTreeMap<String, EntityCollection> {
        &self.expected
    }
}
