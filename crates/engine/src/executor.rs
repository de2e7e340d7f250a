//! Plan execution against the external entity client.

use std::collections::BTreeSet;

use tracing::{debug, error, warn};

use crate::client::EntityClient;
use crate::plan::Plan;

/// Executes a single kind's plan: create, then modify, then delete, then
/// report share as a no-op.
///
/// Best effort with isolated failures: every rejected remote call records
/// the entity's identifier in the error set and execution continues. The
/// failing entities stay unconverged relative to the current state and are
/// retried on the next pass.
pub struct PlanExecutor<'a> {
    client: &'a dyn EntityClient,
}

impl<'a> PlanExecutor<'a> {
    pub fn new(client: &'a dyn EntityClient) -> Self {
        Self { client }
    }

    /// Apply the plan and return it with the accumulated error set
    /// (`None` when everything succeeded).
    pub async fn apply(&self, plan: Plan) -> Plan {
        let mut errors = BTreeSet::new();

        for entity in &plan.create {
            let Some(id) = &entity.id else {
                // Expected entities get a generated identifier at load, so
                // a missing one is a local logic error, not a remote one.
                error!(kind = %plan.kind, name = %entity.name, "create skipped: entity has no id");
                continue;
            };
            if self.client.post(entity).await {
                debug!(kind = %plan.kind, name = %entity.name, "created");
            } else {
                warn!(kind = %plan.kind, name = %entity.name, id = %id, "create rejected");
                errors.insert(id.clone());
            }
        }

        for entity in &plan.modify {
            let Some(id) = &entity.id else {
                error!(kind = %plan.kind, name = %entity.name, "modify skipped: entity has no id");
                continue;
            };
            if self.client.put(entity).await {
                debug!(kind = %plan.kind, name = %entity.name, "modified");
            } else {
                warn!(kind = %plan.kind, name = %entity.name, id = %id, "modify rejected");
                errors.insert(id.clone());
            }
        }

        for entity in &plan.delete {
            let Some(id) = &entity.id else {
                error!(kind = %plan.kind, name = %entity.name, "delete skipped: entity has no id");
                continue;
            };
            if self.client.delete(&plan.kind, id).await {
                debug!(kind = %plan.kind, name = %entity.name, "deleted");
            } else {
                warn!(kind = %plan.kind, name = %entity.name, id = %id, "delete rejected");
                errors.insert(id.clone());
            }
        }

        if !plan.share.is_empty() {
            debug!(kind = %plan.kind, shared = plan.share.len(), "unchanged entities");
        }

        Plan {
            errors: if errors.is_empty() {
                None
            } else {
                Some(errors)
            },
            ..plan
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use warden_state::Entity;

    /// Client that rejects every entity whose name is listed.
    #[derive(Default)]
    struct FakeClient {
        reject: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeClient {
        fn rejecting(names: &[&str]) -> Self {
            Self {
                reject: names.iter().map(|n| (*n).to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, op: &str, what: &str) -> bool {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(format!("{op}:{what}"));
            }
            !self.reject.iter().any(|r| r == what)
        }
    }

    #[async_trait]
    impl EntityClient for FakeClient {
        async fn current_state(&self, _kind: &str) -> crate::error::Result<Vec<Entity>> {
            Ok(Vec::new())
        }
        async fn post(&self, entity: &Entity) -> bool {
            self.record("post", &entity.name)
        }
        async fn put(&self, entity: &Entity) -> bool {
            self.record("put", &entity.name)
        }
        async fn delete(&self, _kind: &str, id: &str) -> bool {
            self.record("delete", id)
        }
    }

    #[tokio::test]
    async fn test_failed_post_records_id_and_keeps_buckets() {
        let client = FakeClient::rejecting(&["p3"]);
        let mut plan = Plan::new("Policy");
        plan.create.push(Entity::new("Policy", "p3").with_id("3"));
        plan.share.push(Entity::new("Policy", "p1").with_id("1"));

        let result = PlanExecutor::new(&client).apply(plan).await;

        let errors = result.errors.unwrap();
        assert!(errors.contains("3"));
        assert_eq!(result.create.len(), 1);
        assert_eq!(result.share.len(), 1);
        assert!(result.modify.is_empty());
        assert!(result.delete.is_empty());
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_later_operations() {
        let client = FakeClient::rejecting(&["a"]);
        let mut plan = Plan::new("Policy");
        plan.create.push(Entity::new("Policy", "a").with_id("1"));
        plan.create.push(Entity::new("Policy", "b").with_id("2"));
        plan.delete.push(Entity::new("Policy", "c").with_id("3"));

        let result = PlanExecutor::new(&client).apply(plan).await;

        assert_eq!(result.errors.unwrap().len(), 1);
        let calls = client.calls.lock().unwrap().clone();
        assert!(calls.contains(&"post:b".to_string()));
        assert!(calls.contains(&"delete:3".to_string()));
    }

    #[tokio::test]
    async fn test_entity_without_id_is_skipped_not_sent() {
        let client = FakeClient::rejecting(&[]);
        let mut plan = Plan::new("Policy");
        plan.modify.push(Entity::new("Policy", "p1"));

        let result = PlanExecutor::new(&client).apply(plan).await;

        assert!(result.errors.is_none());
        assert!(client.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_success_leaves_errors_none() {
        let client = FakeClient::rejecting(&[]);
        let mut plan = Plan::new("Policy");
        plan.create.push(Entity::new("Policy", "p1").with_id("1"));

        let result = PlanExecutor::new(&client).apply(plan).await;
        assert!(result.errors.is_none());
    }
}
