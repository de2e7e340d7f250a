//! Entity descriptor builder.
//!
//! Walks resolved, flattened schema fragments and compiles them into
//! [`EntityDescriptor`]s, registering nested and referenced kinds as they
//! are discovered.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::descriptor::{
    DefaultRule, EntityDependency, EntityDescriptor, FieldDescriptor, FieldKind, ID_FIELD,
    NAME_FIELD, TAGS_FIELD,
};
use crate::error::{Result, SchemaError};
use crate::raw::{Discriminator, RawSchema};
use crate::registry::SchemaRegistry;
use crate::transform::{
    EntityTransform, EntityTransforms, FieldTransform, MultiTransform, SingleTransform,
};

/// Schema `format` values with special handling.
const FORMAT_SECRET: &str = "secret";
const FORMAT_FILE: &str = "file";
const FORMAT_CHECKSUM: &str = "checksum";
const FORMAT_SIZE: &str = "size";
const FORMAT_DATE_TIME: &str = "date-time";

/// Compiles schema definitions into entity descriptors.
///
/// Only definitions carrying an `x-api-path` become top-level kinds; plain
/// definitions are compiled on demand when something references them.
pub struct DescriptorBuilder<'a> {
    registry: &'a mut SchemaRegistry,
    descriptors: BTreeMap<String, EntityDescriptor>,
}

impl<'a> DescriptorBuilder<'a> {
    pub fn new(registry: &'a mut SchemaRegistry) -> Self {
        Self {
            registry,
            descriptors: BTreeMap::new(),
        }
    }

    /// Compile every top-level definition of a namespace.
    pub fn build_namespace(&mut self, namespace: &str) -> Result<()> {
        let names: Vec<String> = self
            .registry
            .load_namespace(namespace)?
            .definitions
            .keys()
            .cloned()
            .collect();
        for name in names {
            let (_, _, schema) = self
                .registry
                .resolve(namespace, &format!("#/definitions/{name}"))?;
            let (ns, flat) = self.registry.flatten(namespace, &schema)?;
            if flat.api_path.is_none() {
                // Mixin or helper definition; compiled only when referenced.
                continue;
            }
            self.build_descriptor(&ns, &name, &flat, 0)?;
        }
        Ok(())
    }

    /// Finish and hand back the compiled descriptors.
    pub fn finish(self) -> BTreeMap<String, EntityDescriptor> {
        self.descriptors
    }

    /// Compile one (already flattened) definition into a descriptor.
    fn build_descriptor(
        &mut self,
        namespace: &str,
        kind: &str,
        flat: &RawSchema,
        level: usize,
    ) -> Result<()> {
        if self.descriptors.contains_key(kind) {
            return Ok(());
        }
        debug!(kind, level, "compiling entity descriptor");

        let mut entity_transforms = EntityTransforms::default();
        let mut fields = Vec::new();
        for (prop_name, prop) in &flat.properties {
            let field = self.build_field(
                namespace,
                kind,
                prop_name,
                prop,
                flat.required.iter().any(|r| r == prop_name),
                level,
                &mut entity_transforms,
            )?;
            fields.push(field);
        }

        if let Some(disc) = &flat.discriminator {
            // Entity-level union: fold every variant's properties into the
            // parent as optional fields so their values load, then validate
            // the selected variant against the raw input.
            for pointer in disc.mapping.values() {
                let (ns, _, variant) = self.registry.resolve(namespace, pointer)?;
                let (variant_ns, variant_flat) = self.registry.flatten(&ns, &variant)?;
                for (prop_name, prop) in &variant_flat.properties {
                    if fields.iter().any(|f| f.name == *prop_name) {
                        continue;
                    }
                    let field = self.build_field(
                        &variant_ns,
                        kind,
                        prop_name,
                        prop,
                        false,
                        level,
                        &mut entity_transforms,
                    )?;
                    fields.push(field);
                }
            }
            if !fields.iter().any(|f| f.name == disc.property_name) {
                let tag_required = flat.required.iter().any(|r| r == &disc.property_name);
                fields.push(FieldDescriptor::new(
                    &disc.property_name,
                    FieldKind::Str,
                    tag_required,
                ));
            }
            let variants = self.variant_requirements(namespace, disc)?;
            entity_transforms.push_both(EntityTransform::ValidateVariant {
                field: None,
                tag: disc.property_name.clone(),
                variants,
            });
        }

        if level == 0 {
            self.install_universal_fields(kind, flat.singleton, &mut fields);
        }

        let secret_fields: BTreeSet<String> = fields
            .iter()
            .filter(|f| f.secret)
            .map(|f| f.name.clone())
            .collect();
        if !secret_fields.is_empty() {
            entity_transforms.cluster_load.push(EntityTransform::StampSecrets {
                fields: secret_fields,
            });
        }

        let dependencies = collect_dependencies(&fields);

        let mut descriptor = EntityDescriptor {
            kind: kind.to_string(),
            fields,
            api_path: if level == 0 { flat.api_path.clone() } else { None },
            singleton: flat.singleton,
            dependencies,
            entity_transforms,
            description: flat.description.clone(),
        };
        descriptor.sort_fields();
        self.descriptors.insert(kind.to_string(), descriptor);
        Ok(())
    }

    /// Compile one property into a field descriptor.
    #[allow(clippy::too_many_arguments)]
    fn build_field(
        &mut self,
        namespace: &str,
        kind: &str,
        name: &str,
        prop: &RawSchema,
        required: bool,
        level: usize,
        entity_transforms: &mut EntityTransforms,
    ) -> Result<FieldDescriptor> {
        let (prop_ns, flat) = self.registry.flatten(namespace, prop)?;

        // Discriminated-union field: merged variant shape plus a
        // whole-entity validation transform on the parent.
        if flat.schema_type.is_none() {
            if let Some(disc) = &flat.discriminator {
                let field_kind = self.build_union_field(&prop_ns, kind, name, disc)?;
                let variants = self.variant_requirements(&prop_ns, disc)?;
                entity_transforms.push_both(EntityTransform::ValidateVariant {
                    field: Some(name.to_string()),
                    tag: disc.property_name.clone(),
                    variants,
                });
                let mut field = FieldDescriptor::new(name, field_kind, required);
                field.description = flat.description.clone();
                return Ok(field);
            }
        }

        let field_kind = self.field_kind(&prop_ns, kind, name, &flat, level)?;
        let mut field = FieldDescriptor::new(name, field_kind, required);
        field.description = flat.description.clone();
        field.deprecated = flat.deprecated;
        field.cluster_read_only = flat.read_only;
        if let Some(default) = &flat.default {
            field.default = DefaultRule::Value(default.clone());
        }
        if flat.no_eq {
            field.eq = false;
        }

        match flat.format.as_deref() {
            Some(FORMAT_SECRET) => {
                // Secret references only exist in the cluster-native shape;
                // the remote API must never be asked to resolve one.
                field.secret = true;
                field.eq = false;
                field
                    .transforms
                    .cluster_load
                    .push(FieldTransform::Single(SingleTransform::ResolveSecret));
            }
            Some(FORMAT_FILE) => {
                field
                    .transforms
                    .cluster_load
                    .push(FieldTransform::Single(SingleTransform::FetchFile));
            }
            Some(FORMAT_CHECKSUM) => {
                let source = self.derived_source(kind, name, &flat)?;
                field.transforms.cluster_load.push(FieldTransform::Multi {
                    deps: vec![source],
                    op: MultiTransform::Checksum,
                });
                field.default = DefaultRule::Value(serde_json::Value::Null);
            }
            Some(FORMAT_SIZE) => {
                let source = self.derived_source(kind, name, &flat)?;
                field.transforms.cluster_load.push(FieldTransform::Multi {
                    deps: vec![source],
                    op: MultiTransform::Size,
                });
                field.default = DefaultRule::Value(serde_json::Value::Null);
            }
            Some(FORMAT_DATE_TIME) => {
                // Audit timestamps never participate in content equality.
                field.eq = false;
            }
            _ => {}
        }

        Ok(field)
    }

    /// Semantic type of a (flattened) property.
    fn field_kind(
        &mut self,
        namespace: &str,
        kind: &str,
        name: &str,
        flat: &RawSchema,
        level: usize,
    ) -> Result<FieldKind> {
        if let Some(target) = &flat.entity_ref {
            return match flat.schema_type.as_deref() {
                Some("array") => Ok(FieldKind::Set(Box::new(FieldKind::Ref(target.clone())))),
                _ => Ok(FieldKind::Ref(target.clone())),
            };
        }
        match flat.schema_type.as_deref() {
            Some("string") => Ok(FieldKind::Str),
            Some("integer") => Ok(FieldKind::Int),
            Some("number") => Ok(FieldKind::Float),
            Some("boolean") => Ok(FieldKind::Bool),
            Some("array") => {
                let items = flat.items.as_deref().cloned().unwrap_or_default();
                let (item_ns, item_flat) = self.registry.flatten(namespace, &items)?;
                let inner = self.field_kind(&item_ns, kind, name, &item_flat, level)?;
                Ok(FieldKind::Set(Box::new(inner)))
            }
            Some("object") => {
                // Inline object properties recurse one nesting level deeper
                // under a synthesized `<Entity>_<Field>` kind.
                let nested_kind = format!("{kind}_{}", camel(name));
                self.build_descriptor(namespace, &nested_kind, flat, level + 1)?;
                Ok(FieldKind::Nested(nested_kind))
            }
            other => Err(SchemaError::unknown_type(
                kind,
                name,
                other.map(str::to_string),
            )),
        }
    }

    /// Merged nested type for a discriminated-union field: the union of all
    /// variant properties, everything optional.
    fn build_union_field(
        &mut self,
        namespace: &str,
        kind: &str,
        name: &str,
        disc: &Discriminator,
    ) -> Result<FieldKind> {
        let mut merged = RawSchema {
            schema_type: Some("object".to_string()),
            ..RawSchema::default()
        };
        for pointer in disc.mapping.values() {
            let (ns, _, variant) = self.registry.resolve(namespace, pointer)?;
            let (_, flat) = self.registry.flatten(&ns, &variant)?;
            merged.properties.extend(flat.properties);
        }
        merged.required.clear();
        let nested_kind = format!("{kind}_{}", camel(name));
        self.build_descriptor(namespace, &nested_kind, &merged, 1)?;
        Ok(FieldKind::Nested(nested_kind))
    }

    /// Required fields per variant of a discriminated union, `id` excluded.
    fn variant_requirements(
        &mut self,
        namespace: &str,
        disc: &Discriminator,
    ) -> Result<BTreeMap<String, Vec<String>>> {
        let mut variants = BTreeMap::new();
        for (tag, pointer) in &disc.mapping {
            let (ns, _, variant) = self.registry.resolve(namespace, pointer)?;
            let (_, flat) = self.registry.flatten(&ns, &variant)?;
            let required: Vec<String> = flat
                .required
                .iter()
                .filter(|r| r.as_str() != ID_FIELD)
                .cloned()
                .collect();
            variants.insert(tag.clone(), required);
        }
        Ok(variants)
    }

    /// Source sibling for a derived field, or an unknown-type error when the
    /// marker is missing.
    fn derived_source(&self, kind: &str, name: &str, flat: &RawSchema) -> Result<String> {
        flat.derived_from
            .clone()
            .ok_or_else(|| SchemaError::unknown_type(kind, name, flat.format.clone()))
    }

    /// Guarantee the universal `name`/`id`/`tags` fields on a top-level kind.
    fn install_universal_fields(
        &self,
        kind: &str,
        singleton: bool,
        fields: &mut Vec<FieldDescriptor>,
    ) {
        // `id` is always optional with a random-identifier factory, is
        // excluded from equality and is read-only toward the cluster.
        fields.retain(|f| f.name != ID_FIELD);
        let mut id = FieldDescriptor::new(ID_FIELD, FieldKind::Str, false);
        id.default = DefaultRule::RandomId;
        id.eq = false;
        id.cluster_read_only = true;
        fields.push(id);

        if !fields.iter().any(|f| f.name == NAME_FIELD) {
            let mut name = FieldDescriptor::new(NAME_FIELD, FieldKind::Str, !singleton);
            if singleton {
                name.default = DefaultRule::Value(serde_json::Value::String(kind.to_lowercase()));
            }
            fields.push(name);
        } else if singleton {
            for field in fields.iter_mut().filter(|f| f.name == NAME_FIELD) {
                if !field.default.has_default() {
                    field.required = false;
                    field.default =
                        DefaultRule::Value(serde_json::Value::String(kind.to_lowercase()));
                }
            }
        }

        if !fields.iter().any(|f| f.name == TAGS_FIELD) {
            let mut tags =
                FieldDescriptor::new(TAGS_FIELD, FieldKind::Set(Box::new(FieldKind::Str)), false);
            tags.default = DefaultRule::Value(serde_json::Value::Array(vec![]));
            fields.push(tags);
        }
    }
}

/// Dependencies derived from `Ref`-kinded fields.
fn collect_dependencies(fields: &[FieldDescriptor]) -> Vec<EntityDependency> {
    fields
        .iter()
        .filter_map(|f| {
            f.kind.referenced_kind().map(|target| EntityDependency {
                field: f.name.clone(),
                kinds: BTreeSet::from([target.to_string()]),
            })
        })
        .collect()
}

/// `UpperCamelCase` a snake_case field name for nested kind synthesis.
fn camel(name: &str) -> String {
    name.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use std::fs;
    use std::io::Write;

    fn registry_with(body: &str) -> (tempfile::TempDir, SchemaRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join("access.yaml")).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        let reg = SchemaRegistry::new(dir.path());
        (dir, reg)
    }

    fn compile(body: &str) -> BTreeMap<String, EntityDescriptor> {
        let (_dir, mut reg) = registry_with(body);
        let mut builder = DescriptorBuilder::new(&mut reg);
        builder.build_namespace("access").unwrap();
        builder.finish()
    }

    #[test]
    fn test_top_level_kind_gets_universal_fields() {
        let descriptors = compile(
            r"
definitions:
  Condition:
    type: object
    x-api-path: conditions
    required: [name]
    properties:
      name: { type: string }
      expr: { type: string }
",
        );
        let cond = descriptors.get("Condition").unwrap();
        let id = cond.field("id").unwrap();
        assert!(!id.required);
        assert!(matches!(id.default, DefaultRule::RandomId));
        assert!(id.cluster_read_only);
        assert!(!id.eq);
        assert!(cond.field("tags").is_some());
        assert_eq!(cond.api_path.as_deref(), Some("conditions"));
    }

    #[test]
    fn test_fields_without_defaults_come_first() {
        let descriptors = compile(
            r"
definitions:
  Policy:
    type: object
    x-api-path: policies
    required: [name, expr]
    properties:
      name: { type: string }
      expr: { type: string }
      priority: { type: integer, default: 0 }
",
        );
        let policy = descriptors.get("Policy").unwrap();
        let boundary = policy
            .fields
            .iter()
            .position(|f| f.default.has_default())
            .unwrap();
        assert!(policy.fields[..boundary]
            .iter()
            .all(|f| !f.default.has_default()));
        assert!(policy.fields[boundary..]
            .iter()
            .all(|f| f.default.has_default()));
    }

    #[test]
    fn test_secret_field_gets_cluster_transform() {
        let descriptors = compile(
            r"
definitions:
  Client:
    type: object
    x-api-path: clients
    required: [name]
    properties:
      name: { type: string }
      clientSecret: { type: string, format: secret }
",
        );
        let client = descriptors.get("Client").unwrap();
        let secret = client.field("clientSecret").unwrap();
        assert!(secret.secret);
        assert!(!secret.eq);
        assert_eq!(
            secret.transforms.cluster_load,
            vec![FieldTransform::Single(SingleTransform::ResolveSecret)]
        );
        assert!(secret.transforms.remote_load.is_empty());
        assert!(client
            .entity_transforms
            .cluster_load
            .iter()
            .any(|t| matches!(t, EntityTransform::StampSecrets { .. })));
    }

    #[test]
    fn test_derived_checksum_depends_on_source_field() {
        let descriptors = compile(
            r"
definitions:
  Theme:
    type: object
    x-api-path: themes
    required: [name]
    properties:
      name: { type: string }
      archive: { type: string, format: file }
      checksum: { type: string, format: checksum, x-derived-from: archive }
",
        );
        let theme = descriptors.get("Theme").unwrap();
        let checksum = theme.field("checksum").unwrap();
        assert_eq!(
            checksum.transforms.cluster_load,
            vec![FieldTransform::Multi {
                deps: vec!["archive".into()],
                op: MultiTransform::Checksum,
            }]
        );
    }

    #[test]
    fn test_nested_object_synthesizes_kind() {
        let descriptors = compile(
            r"
definitions:
  Policy:
    type: object
    x-api-path: policies
    required: [name]
    properties:
      name: { type: string }
      config:
        type: object
        properties:
          ttl: { type: integer }
",
        );
        let policy = descriptors.get("Policy").unwrap();
        assert_eq!(
            policy.field("config").map(|f| &f.kind),
            Some(&FieldKind::Nested("Policy_Config".into()))
        );
        let nested = descriptors.get("Policy_Config").unwrap();
        assert!(nested.api_path.is_none());
        assert!(nested.field("ttl").is_some());
    }

    #[test]
    fn test_entity_ref_array_builds_set_of_refs() {
        let descriptors = compile(
            r"
definitions:
  Entitlement:
    type: object
    x-api-path: entitlements
    required: [name]
    properties:
      name: { type: string }
      conditions:
        type: array
        x-entity-ref: Condition
        items: { type: string }
",
        );
        let ent = descriptors.get("Entitlement").unwrap();
        assert_eq!(
            ent.field("conditions").map(|f| &f.kind),
            Some(&FieldKind::Set(Box::new(FieldKind::Ref("Condition".into()))))
        );
        assert_eq!(ent.dependencies.len(), 1);
        assert_eq!(ent.dependencies[0].field, "conditions");
        assert!(ent.dependencies[0].kinds.contains("Condition"));
    }

    #[test]
    fn test_unknown_type_fails_with_entity_and_field() {
        let (_dir, mut reg) = registry_with(
            r"
definitions:
  Broken:
    type: object
    x-api-path: broken
    properties:
      what: { type: blob }
",
        );
        let mut builder = DescriptorBuilder::new(&mut reg);
        let err = builder.build_namespace("access").unwrap_err();
        match err {
            SchemaError::UnknownType { kind, field, found } => {
                assert_eq!(kind, "Broken");
                assert_eq!(field, "what");
                assert_eq!(found.as_deref(), Some("blob"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_discriminated_union_field() {
        let descriptors = compile(
            r"
definitions:
  JsRule:
    type: object
    required: [code]
    properties:
      code: { type: string }
  RoleRule:
    type: object
    required: [role, realm]
    properties:
      role: { type: string }
      realm: { type: string }
  Policy:
    type: object
    x-api-path: policies
    required: [name]
    properties:
      name: { type: string }
      rule:
        discriminator:
          propertyName: ruleType
          mapping:
            js: '#/definitions/JsRule'
            role: '#/definitions/RoleRule'
",
        );
        let policy = descriptors.get("Policy").unwrap();
        assert_eq!(
            policy.field("rule").map(|f| &f.kind),
            Some(&FieldKind::Nested("Policy_Rule".into()))
        );
        let validate = policy
            .entity_transforms
            .cluster_load
            .iter()
            .find_map(|t| match t {
                EntityTransform::ValidateVariant { field, tag, variants } => {
                    Some((field.clone(), tag.clone(), variants.clone()))
                }
                EntityTransform::StampSecrets { .. } => None,
            })
            .unwrap();
        assert_eq!(validate.0.as_deref(), Some("rule"));
        assert_eq!(validate.1, "ruleType");
        assert_eq!(
            validate.2.get("role"),
            Some(&vec!["role".to_string(), "realm".to_string()])
        );
        // Merged union shape carries every variant's properties.
        let nested = descriptors.get("Policy_Rule").unwrap();
        assert!(nested.field("code").is_some());
        assert!(nested.field("role").is_some());
    }

    #[test]
    fn test_entity_level_discriminator_merges_variant_fields() {
        let descriptors = compile(
            r"
definitions:
  HardcodedMapper:
    type: object
    required: [claimValue]
    properties:
      claimValue: { type: string }
  AudienceMapper:
    type: object
    required: [audience]
    properties:
      audience: { type: string }
  Mapper:
    type: object
    x-api-path: mappers
    required: [name, mapperType]
    properties:
      name: { type: string }
    discriminator:
      propertyName: mapperType
      mapping:
        hardcoded: '#/definitions/HardcodedMapper'
        audience: '#/definitions/AudienceMapper'
",
        );
        let mapper = descriptors.get("Mapper").unwrap();
        // Variant properties land on the parent as optional fields; per-
        // variant requiredness is enforced by the transform, not the shape.
        for field_name in ["claimValue", "audience"] {
            let field = mapper.field(field_name).unwrap();
            assert!(!field.required, "{field_name} must be optional");
        }
        // The tag property is declared even though no variant carries it,
        // keeping the schema's required marking.
        assert!(mapper.field("mapperType").unwrap().required);
        let validate = mapper
            .entity_transforms
            .cluster_load
            .iter()
            .find_map(|t| match t {
                EntityTransform::ValidateVariant { field, tag, variants } => {
                    Some((field.clone(), tag.clone(), variants.clone()))
                }
                EntityTransform::StampSecrets { .. } => None,
            })
            .unwrap();
        assert_eq!(validate.0, None);
        assert_eq!(validate.1, "mapperType");
        assert_eq!(
            validate.2.get("hardcoded"),
            Some(&vec!["claimValue".to_string()])
        );
    }

    #[test]
    fn test_singleton_gets_default_name_and_tags() {
        let descriptors = compile(
            r"
definitions:
  RealmSettings:
    type: object
    x-api-path: realm
    x-singleton: true
    properties:
      loginTheme: { type: string }
",
        );
        let settings = descriptors.get("RealmSettings").unwrap();
        assert!(settings.singleton);
        let name = settings.field("name").unwrap();
        assert!(!name.required);
        assert!(name.default.has_default());
        assert!(settings.field("tags").is_some());
    }

    #[test]
    fn test_deprecated_field_is_flagged() {
        let descriptors = compile(
            r"
definitions:
  Policy:
    type: object
    x-api-path: policies
    required: [name]
    properties:
      name: { type: string }
      legacyExpr: { type: string, deprecated: true }
",
        );
        let policy = descriptors.get("Policy").unwrap();
        assert!(policy.field("legacyExpr").unwrap().deprecated);
    }
}
