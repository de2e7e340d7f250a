//! Compiled entity and field descriptors.
//!
//! Descriptors are the immutable output of the schema compiler: one
//! [`EntityDescriptor`] per schema definition, each holding ordered
//! [`FieldDescriptor`]s with semantic types, flags and attached transforms.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::transform::{Direction, EntityTransforms, FieldTransforms};

/// Universal field names present on every top-level kind.
pub const NAME_FIELD: &str = "name";
pub const ID_FIELD: &str = "id";
pub const TAGS_FIELD: &str = "tags";

/// Semantic type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Str,
    Int,
    Float,
    Bool,
    /// Unordered set of T.
    Set(Box<FieldKind>),
    /// Nested object type, registered in the model under the given name.
    Nested(String),
    /// Named reference to another top-level entity kind.
    Ref(String),
}

impl FieldKind {
    /// Entity kind this field (or its set element) refers to, if any.
    pub fn referenced_kind(&self) -> Option<&str> {
        match self {
            Self::Ref(kind) => Some(kind),
            Self::Set(inner) => inner.referenced_kind(),
            _ => None,
        }
    }
}

/// Default rule applied when a field is absent from the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultRule {
    /// No default: absence of a required field is a load error.
    None,
    /// Fixed default value.
    Value(serde_json::Value),
    /// Factory producing a fresh random identifier.
    RandomId,
}

impl DefaultRule {
    /// Whether this rule supplies a value when the field is absent.
    pub fn has_default(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Compiled descriptor for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub default: DefaultRule,
    /// Whether the field participates in content equality.
    pub eq: bool,
    /// Not written in the cluster-native direction (e.g. `id`).
    pub cluster_read_only: bool,
    /// Accepted on read but omitted from write-direction payloads.
    pub deprecated: bool,
    /// Carries a secret reference in the cluster-native representation.
    pub secret: bool,
    pub description: Option<String>,
    pub transforms: FieldTransforms,
}

impl FieldDescriptor {
    /// Plain field with no flags, no default and no transforms.
    pub fn new(name: impl Into<String>, kind: FieldKind, required: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            required,
            default: DefaultRule::None,
            eq: true,
            cluster_read_only: false,
            deprecated: false,
            secret: false,
            description: None,
            transforms: FieldTransforms::default(),
        }
    }

    /// Whether the field is skipped when dumping in the given direction.
    pub fn dump_excluded(&self, direction: Direction, include_secrets: bool) -> bool {
        if self.secret && !include_secrets {
            return true;
        }
        match direction {
            Direction::Cluster => self.cluster_read_only,
            Direction::Remote => self.deprecated,
        }
    }
}

/// A field-level dependency on one or more entity kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDependency {
    /// Field carrying the reference.
    pub field: String,
    /// Entity kinds the field may refer to.
    pub kinds: BTreeSet<String>,
}

/// Compiled, immutable descriptor for one entity kind.
///
/// Field order is stable and always places fields without defaults before
/// fields with defaults, so downstream constructors that require defaulted
/// parameters last can consume it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Kind name, unique across the model.
    pub kind: String,
    /// Ordered field descriptors.
    pub fields: Vec<FieldDescriptor>,
    /// Remote API path. `None` for nested, non-top-level types.
    pub api_path: Option<String>,
    /// Exactly one unnamed instance of this kind may exist.
    pub singleton: bool,
    /// Dependencies on other entity kinds, derived from `Ref` fields.
    pub dependencies: Vec<EntityDependency>,
    /// Whole-entity transforms per load direction.
    pub entity_transforms: EntityTransforms,
    pub description: Option<String>,
}

impl EntityDescriptor {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether this descriptor compiles a top-level kind.
    pub fn is_top_level(&self) -> bool {
        self.api_path.is_some()
    }

    /// Fields participating in content equality.
    ///
    /// Secret-bearing fields are included only when `compare_secrets` is
    /// set; `id` and audit fields never participate.
    pub fn eq_fields(&self, compare_secrets: bool) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields
            .iter()
            .filter(move |f| f.eq && f.name != ID_FIELD && (!f.secret || compare_secrets))
    }

    /// Enforce the no-default-before-default ordering invariant in place.
    pub fn sort_fields(&mut self) {
        self.fields.sort_by_key(|f| f.default.has_default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor_with(fields: Vec<FieldDescriptor>) -> EntityDescriptor {
        EntityDescriptor {
            kind: "Policy".into(),
            fields,
            api_path: Some("policies".into()),
            singleton: false,
            dependencies: vec![],
            entity_transforms: EntityTransforms::default(),
            description: None,
        }
    }

    #[test]
    fn test_sort_fields_places_defaults_last() {
        let mut with_default = FieldDescriptor::new("tags", FieldKind::Set(Box::new(FieldKind::Str)), false);
        with_default.default = DefaultRule::Value(serde_json::json!([]));
        let plain = FieldDescriptor::new("name", FieldKind::Str, true);

        let mut desc = descriptor_with(vec![with_default, plain]);
        desc.sort_fields();

        assert_eq!(desc.fields[0].name, "name");
        assert_eq!(desc.fields[1].name, "tags");
    }

    #[test]
    fn test_eq_fields_exclude_id_and_secrets() {
        let mut id = FieldDescriptor::new("id", FieldKind::Str, false);
        id.default = DefaultRule::RandomId;
        let mut secret = FieldDescriptor::new("clientSecret", FieldKind::Str, false);
        secret.secret = true;
        let name = FieldDescriptor::new("name", FieldKind::Str, true);

        let desc = descriptor_with(vec![id, secret, name]);
        let eq: Vec<_> = desc.eq_fields(false).map(|f| f.name.as_str()).collect();
        assert_eq!(eq, vec!["name"]);

        let with_secrets: Vec<_> = desc.eq_fields(true).map(|f| f.name.as_str()).collect();
        assert_eq!(with_secrets, vec!["clientSecret", "name"]);
    }

    #[test]
    fn test_referenced_kind_through_set() {
        let kind = FieldKind::Set(Box::new(FieldKind::Ref("Condition".into())));
        assert_eq!(kind.referenced_kind(), Some("Condition"));
    }
}
