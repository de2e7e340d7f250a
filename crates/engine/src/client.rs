//! External entity client interface.

use async_trait::async_trait;

use warden_state::Entity;

use crate::error::Result;

/// Abstract client for the remote control-plane API.
///
/// The engine never talks to the network itself; a deployment injects an
/// implementation. `post`/`put`/`delete` report plain success or failure;
/// retries, backoff and authentication are the implementation's concern,
/// and any non-success is isolated per entity by the executor.
#[async_trait]
pub trait EntityClient: Send + Sync {
    /// Fetch the current remote state for a kind.
    async fn current_state(&self, kind: &str) -> Result<Vec<Entity>>;

    /// Create an entity. Returns whether the remote accepted it.
    async fn post(&self, entity: &Entity) -> bool;

    /// Update an entity. Returns whether the remote accepted it.
    async fn put(&self, entity: &Entity) -> bool;

    /// Delete an entity by identifier. Returns whether the remote accepted
    /// the deletion.
    async fn delete(&self, kind: &str, id: &str) -> bool;
}
