//! Entity records.

use std::collections::{BTreeMap, BTreeSet};

use warden_schema::{EntityDescriptor, NAME_FIELD, TAGS_FIELD};

use crate::value::Value;

/// Tag marking a pre-existing entity that reconciliation must never delete.
pub const BUILTIN_TAG: &str = "builtin";

/// One live entity: a tagged record keyed by its kind's descriptor.
///
/// `name` is unique within a kind; `id` is identity and never participates
/// in equality, so structural content rather than identity drives diffing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub kind: String,
    pub name: String,
    pub id: Option<String>,
    pub tags: BTreeSet<String>,
    /// Remaining fields in no particular order; the descriptor owns order.
    pub fields: BTreeMap<String, Value>,
    /// Fields whose raw input held secret references, stamped at load.
    pub secret_fields: BTreeSet<String>,
}

impl Entity {
    /// Create an empty entity of a kind.
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            id: None,
            tags: BTreeSet::new(),
            fields: BTreeMap::new(),
            secret_fields: BTreeSet::new(),
        }
    }

    /// Set the identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set a field value.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Add a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Field value by name. `name` and `tags` resolve to their dedicated
    /// slots.
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            NAME_FIELD => Some(Value::Str(self.name.clone())),
            TAGS_FIELD => Some(Value::Set(
                self.tags.iter().cloned().map(Value::Str).collect(),
            )),
            _ => self.fields.get(name).cloned(),
        }
    }

    /// Whether this entity carries the builtin tag and is therefore exempt
    /// from deletion.
    pub fn is_builtin(&self) -> bool {
        self.tags.contains(BUILTIN_TAG)
    }

    /// Structural content equality under a descriptor's equality rules.
    ///
    /// Compares `name`, `tags` and every field whose descriptor
    /// participates in equality; `id` and audit fields are always excluded,
    /// secret-bearing fields only compare when `compare_secrets` is set.
    pub fn content_eq(
        &self,
        other: &Self,
        descriptor: &EntityDescriptor,
        compare_secrets: bool,
    ) -> bool {
        if self.name != other.name || self.tags != other.tags {
            return false;
        }
        descriptor.eq_fields(compare_secrets).all(|field| {
            let mine = self.fields.get(&field.name);
            let theirs = other.fields.get(&field.name);
            match (mine, theirs) {
                (Some(a), Some(b)) => a == b,
                (None, None) => true,
                (Some(v), None) | (None, Some(v)) => v.is_null(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use warden_schema::{EntityTransforms, FieldDescriptor, FieldKind};

    fn policy_descriptor() -> EntityDescriptor {
        let mut secret = FieldDescriptor::new("clientSecret", FieldKind::Str, false);
        secret.secret = true;
        secret.eq = false;
        let mut id = FieldDescriptor::new("id", FieldKind::Str, false);
        id.eq = false;
        EntityDescriptor {
            kind: "Policy".into(),
            fields: vec![
                FieldDescriptor::new("name", FieldKind::Str, true),
                FieldDescriptor::new("expr", FieldKind::Str, true),
                id,
                secret,
            ],
            api_path: Some("policies".into()),
            singleton: false,
            dependencies: vec![],
            entity_transforms: EntityTransforms::default(),
            description: None,
        }
    }

    #[test]
    fn test_content_eq_ignores_id() {
        let desc = policy_descriptor();
        let a = Entity::new("Policy", "p1").with_id("1").with_field("expr", "x");
        let b = Entity::new("Policy", "p1").with_field("expr", "x");
        assert!(a.content_eq(&b, &desc, false));
    }

    #[test]
    fn test_content_eq_detects_field_change() {
        let desc = policy_descriptor();
        let a = Entity::new("Policy", "p1").with_field("expr", "x");
        let b = Entity::new("Policy", "p1").with_field("expr", "y");
        assert!(!a.content_eq(&b, &desc, false));
    }

    #[test]
    fn test_secret_fields_compare_only_when_toggled() {
        let desc = policy_descriptor();
        let mut secret = FieldDescriptor::new("clientSecret", FieldKind::Str, false);
        secret.secret = true;
        // Secret fields keep eq=false by default; toggling compare_secrets
        // pulls them back in through eq_fields.
        let mut with_eq = desc.clone();
        for f in &mut with_eq.fields {
            if f.name == "clientSecret" {
                f.eq = true;
            }
        }
        let a = Entity::new("Policy", "p1")
            .with_field("expr", "x")
            .with_field("clientSecret", "s1");
        let b = Entity::new("Policy", "p1")
            .with_field("expr", "x")
            .with_field("clientSecret", "s2");
        assert!(a.content_eq(&b, &with_eq, false));
        assert!(!a.content_eq(&b, &with_eq, true));
    }

    #[test]
    fn test_content_eq_across_number_spellings() {
        let mut desc = policy_descriptor();
        desc.fields
            .push(FieldDescriptor::new("weight", FieldKind::Float, false));
        let declared = Entity::new("Policy", "p1")
            .with_field("expr", "x")
            .with_field("weight", Value::from_json(&serde_json::json!(1)));
        let observed = Entity::new("Policy", "p1")
            .with_field("expr", "x")
            .with_field("weight", Value::from_json(&serde_json::json!(1.0)));
        assert!(declared.content_eq(&observed, &desc, false));
    }

    #[test]
    fn test_builtin_tag() {
        let e = Entity::new("Policy", "master").with_tag(BUILTIN_TAG);
        assert!(e.is_builtin());
    }
}
