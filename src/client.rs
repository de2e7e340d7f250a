//! In-memory entity client used by the standalone binary.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use warden_engine::{EntityClient, Error, Result};
use warden_state::{Entity, EntityCollection, EntityOp};

/// Client backed by in-memory state instead of a remote API.
///
/// Seeded from a current-state file, then mutated by applied plans. Every
/// accepted operation is printed, so a run doubles as a readable apply log.
pub struct MemoryClient {
    state: Mutex<BTreeMap<String, EntityCollection>>,
}

impl MemoryClient {
    pub fn new(initial: BTreeMap<String, EntityCollection>) -> Self {
        Self {
            state: Mutex::new(initial),
        }
    }

    /// Per-kind entity counts after all passes.
    pub fn summary(&self) -> Vec<(String, usize)> {
        match self.state.lock() {
            Ok(state) => state
                .iter()
                .map(|(kind, collection)| (kind.clone(), collection.len()))
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[async_trait]
impl EntityClient for MemoryClient {
    async fn current_state(&self, kind: &str) -> Result<Vec<Entity>> {
        let state = self
            .state
            .lock()
            .map_err(|_| Error::current_state(kind, "state lock poisoned"))?;
        Ok(state
            .get(kind)
            .map(|collection| collection.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn post(&self, entity: &Entity) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        info!(kind = %entity.kind, name = %entity.name, "create");
        state
            .entry(entity.kind.clone())
            .or_insert_with(|| EntityCollection::new(entity.kind.clone()))
            .apply(entity.clone(), EntityOp::Add);
        true
    }

    async fn put(&self, entity: &Entity) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        info!(kind = %entity.kind, name = %entity.name, "modify");
        state
            .entry(entity.kind.clone())
            .or_insert_with(|| EntityCollection::new(entity.kind.clone()))
            .apply(entity.clone(), EntityOp::Modify);
        true
    }

    async fn delete(&self, kind: &str, id: &str) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        let Some(collection) = state.get_mut(kind) else {
            return false;
        };
        let name = collection
            .iter()
            .find(|e| e.id.as_deref() == Some(id))
            .map(|e| e.name.clone());
        match name {
            Some(name) => {
                info!(kind = %kind, name = %name, id = %id, "delete");
                collection.remove(&name);
                true
            }
            None => false,
        }
    }
}
