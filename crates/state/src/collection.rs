//! Name-indexed entity collections.

use std::collections::BTreeMap;

use tracing::debug;

use crate::entity::Entity;

/// Operation applied to a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityOp {
    Add,
    Modify,
    Delete,
}

/// Mutable, name-indexed container for one entity kind, built by replaying
/// ordered add/modify/delete events.
///
/// At most one live entity per name at any time. `Add` on an existing name
/// upserts, `Modify` on an unknown name adds, `Delete` on an unknown name
/// is a no-op. All operations are O(log n) map accesses; only a full diff
/// walks the collection.
#[derive(Debug, Clone, Default)]
pub struct EntityCollection {
    kind: String,
    entities: BTreeMap<String, Entity>,
}

impl EntityCollection {
    /// Create an empty collection for a kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            entities: BTreeMap::new(),
        }
    }

    /// The kind this collection holds.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Apply one event to the collection.
    ///
    /// A modify replaces the entity keyed by name but inherits the previous
    /// entity's identifier: content may change, identity is stable.
    pub fn apply(&mut self, entity: Entity, op: EntityOp) {
        match op {
            EntityOp::Add | EntityOp::Modify => {
                let mut entity = entity;
                if entity.id.is_none() {
                    if let Some(previous) = self.entities.get(&entity.name) {
                        entity.id.clone_from(&previous.id);
                    }
                }
                debug!(kind = %self.kind, name = %entity.name, ?op, "state updated");
                self.entities.insert(entity.name.clone(), entity);
            }
            EntityOp::Delete => {
                if self.entities.remove(&entity.name).is_some() {
                    debug!(kind = %self.kind, name = %entity.name, "state removed");
                }
            }
        }
    }

    /// Remove an entity by name. Removing an absent name is a no-op.
    pub fn remove(&mut self, name: &str) -> Option<Entity> {
        self.entities.remove(name)
    }

    /// Set the identifier of an entity by name, if present.
    pub fn set_id(&mut self, name: &str, id: Option<String>) {
        if let Some(entity) = self.entities.get_mut(name) {
            entity.id = id;
        }
    }

    /// Entity by name.
    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    /// Iterate entities in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Iterate entities mutably in name order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    /// Names currently present.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Name to identifier map for entities that have one.
    pub fn ids_by_name(&self) -> BTreeMap<String, String> {
        self.entities
            .iter()
            .filter_map(|(name, e)| e.id.clone().map(|id| (name.clone(), id)))
            .collect()
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl FromIterator<Entity> for EntityCollection {
    fn from_iter<T: IntoIterator<Item = Entity>>(iter: T) -> Self {
        let mut collection = Self::default();
        for entity in iter {
            if collection.kind.is_empty() {
                collection.kind.clone_from(&entity.kind);
            }
            collection.entities.insert(entity.name.clone(), entity);
        }
        collection
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_add_then_get() {
        let mut c = EntityCollection::new("Policy");
        c.apply(Entity::new("Policy", "p1"), EntityOp::Add);
        assert_eq!(c.len(), 1);
        assert!(c.get("p1").is_some());
    }

    #[test]
    fn test_add_on_existing_name_upserts() {
        let mut c = EntityCollection::new("Policy");
        c.apply(
            Entity::new("Policy", "p1").with_id("1").with_field("expr", "a"),
            EntityOp::Add,
        );
        c.apply(Entity::new("Policy", "p1").with_field("expr", "b"), EntityOp::Add);
        let p1 = c.get("p1").unwrap();
        assert_eq!(p1.fields.get("expr").and_then(|v| v.as_str().map(String::from)), Some("b".into()));
        // Identity is inherited across the upsert.
        assert_eq!(p1.id.as_deref(), Some("1"));
    }

    #[test]
    fn test_modify_unknown_name_adds() {
        let mut c = EntityCollection::new("Policy");
        c.apply(Entity::new("Policy", "p1"), EntityOp::Modify);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_delete_unknown_name_is_noop() {
        let mut c = EntityCollection::new("Policy");
        c.apply(Entity::new("Policy", "ghost"), EntityOp::Delete);
        assert!(c.is_empty());
    }

    #[test]
    fn test_ids_by_name_skips_missing_ids() {
        let mut c = EntityCollection::new("Policy");
        c.apply(Entity::new("Policy", "p1").with_id("1"), EntityOp::Add);
        c.apply(Entity::new("Policy", "p2"), EntityOp::Add);
        let ids = c.ids_by_name();
        assert_eq!(ids.get("p1").map(String::as_str), Some("1"));
        assert!(!ids.contains_key("p2"));
    }
}
