//! Diff engine: current vs expected state into a plan.

use std::collections::BTreeSet;

use tracing::debug;

use warden_schema::EntityDescriptor;
use warden_state::EntityCollection;

use crate::plan::Plan;

/// Compare the current and expected collections of one kind into a plan.
///
/// Pure and deterministic given two snapshots:
///
/// - `delete`: current entities whose name is not expected, except those
///   tagged builtin, which are never auto-deleted
/// - `create`: expected entities whose name is not current
/// - shared names split on structural content equality into `share`
///   (identical) and `modify` (different), both carrying the current
///   entity's identifier
pub fn compare_entities(
    current: &EntityCollection,
    expected: &EntityCollection,
    descriptor: &EntityDescriptor,
    compare_secrets: bool,
) -> Plan {
    let current_names: BTreeSet<&str> = current.names().collect();
    let expected_names: BTreeSet<&str> = expected.names().collect();

    let mut plan = Plan::new(&descriptor.kind);

    for entity in current.iter() {
        if !expected_names.contains(entity.name.as_str()) && !entity.is_builtin() {
            plan.delete.push(entity.clone());
        }
    }

    for entity in expected.iter() {
        if !current_names.contains(entity.name.as_str()) {
            plan.create.push(entity.clone());
            continue;
        }
        let Some(counterpart) = current.get(&entity.name) else {
            continue;
        };
        let mut entity = entity.clone();
        entity.id.clone_from(&counterpart.id);
        if entity.content_eq(counterpart, descriptor, compare_secrets) {
            plan.share.push(entity);
        } else {
            plan.modify.push(entity);
        }
    }

    debug!(plan = %plan, "computed plan");
    plan
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use warden_schema::{EntityTransforms, FieldDescriptor, FieldKind};
    use warden_state::{BUILTIN_TAG, Entity};

    fn descriptor() -> EntityDescriptor {
        let mut id = FieldDescriptor::new("id", FieldKind::Str, false);
        id.eq = false;
        EntityDescriptor {
            kind: "Policy".into(),
            fields: vec![
                FieldDescriptor::new("name", FieldKind::Str, true),
                FieldDescriptor::new("expr", FieldKind::Str, true),
                id,
            ],
            api_path: Some("policies".into()),
            singleton: false,
            dependencies: vec![],
            entity_transforms: EntityTransforms::default(),
            description: None,
        }
    }

    fn policy(name: &str, expr: &str) -> Entity {
        Entity::new("Policy", name).with_field("expr", expr)
    }

    #[test]
    fn test_example_scenario() {
        // current = {p1(id=1, a), p2(id=2, b)}, expected = {p1(a), p3(c)}
        let current: EntityCollection = [
            policy("p1", "a").with_id("1"),
            policy("p2", "b").with_id("2"),
        ]
        .into_iter()
        .collect();
        let expected: EntityCollection = [policy("p1", "a"), policy("p3", "c")]
            .into_iter()
            .collect();

        let plan = compare_entities(&current, &expected, &descriptor(), false);

        assert_eq!(plan.share.len(), 1);
        assert_eq!(plan.share[0].name, "p1");
        assert_eq!(plan.share[0].id.as_deref(), Some("1"));
        assert_eq!(plan.delete.len(), 1);
        assert_eq!(plan.delete[0].name, "p2");
        assert_eq!(plan.create.len(), 1);
        assert_eq!(plan.create[0].name, "p3");
        assert!(plan.modify.is_empty());
    }

    #[test]
    fn test_modify_propagates_current_id() {
        let current: EntityCollection = [policy("p1", "a").with_id("1")].into_iter().collect();
        let expected: EntityCollection = [policy("p1", "changed")].into_iter().collect();

        let plan = compare_entities(&current, &expected, &descriptor(), false);
        assert_eq!(plan.modify.len(), 1);
        assert_eq!(plan.modify[0].id.as_deref(), Some("1"));
        assert!(plan.share.is_empty());
    }

    #[test]
    fn test_idempotence() {
        let set: EntityCollection = [policy("p1", "a"), policy("p2", "b")]
            .into_iter()
            .collect();
        let plan = compare_entities(&set, &set, &descriptor(), false);
        assert!(plan.create.is_empty());
        assert!(plan.delete.is_empty());
        assert!(plan.modify.is_empty());
        assert_eq!(plan.share.len(), 2);
    }

    #[test]
    fn test_builtin_is_never_deleted() {
        let current: EntityCollection = [policy("master", "x").with_id("1").with_tag(BUILTIN_TAG)]
            .into_iter()
            .collect();
        let expected = EntityCollection::new("Policy");

        let plan = compare_entities(&current, &expected, &descriptor(), false);
        assert!(plan.delete.is_empty());
    }

    #[test]
    fn test_buckets_are_disjoint_and_cover_expected() {
        let current: EntityCollection = [
            policy("p1", "a").with_id("1"),
            policy("p2", "b").with_id("2"),
        ]
        .into_iter()
        .collect();
        let expected: EntityCollection = [
            policy("p1", "a"),
            policy("p2", "changed"),
            policy("p3", "c"),
        ]
        .into_iter()
        .collect();

        let plan = compare_entities(&current, &expected, &descriptor(), false);

        let mut names: Vec<&str> = plan
            .create
            .iter()
            .chain(&plan.modify)
            .chain(&plan.share)
            .map(|e| e.name.as_str())
            .collect();
        names.sort_unstable();
        // Disjoint union of create/modify/share reconstructs expected.
        assert_eq!(names, vec!["p1", "p2", "p3"]);
        let delete_names: Vec<&str> = plan.delete.iter().map(|e| e.name.as_str()).collect();
        assert!(delete_names.iter().all(|n| !names.contains(n)));
    }
}
