//! Entity loading and dumping.
//!
//! Two independent directions (cluster-native, remote API) times two
//! operations (load, dump). Loading applies each field's single- and
//! multi-field transforms in declaration order, then the kind's
//! whole-entity transforms once the structural instance exists. Dumping
//! walks fields in declaration order, skipping whatever the direction's
//! policy excludes.

use std::collections::{BTreeMap, BTreeSet};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use warden_schema::{
    DefaultRule, Direction, EntityDescriptor, EntityModel, EntityTransform, FieldDescriptor,
    FieldKind, FieldTransform, ID_FIELD, MultiTransform, NAME_FIELD, SingleTransform, TAGS_FIELD,
};

use crate::entity::Entity;
use crate::error::{LoadError, Result};
use crate::resolvers::{FileFetcher, SecretResolver};
use crate::value::Value;

/// Loads raw payloads into entities and dumps entities back out, using the
/// compiled model for field order, typing and transforms.
pub struct EntityLoader<'a> {
    model: &'a EntityModel,
    secrets: &'a dyn SecretResolver,
    files: &'a dyn FileFetcher,
}

impl<'a> EntityLoader<'a> {
    pub fn new(
        model: &'a EntityModel,
        secrets: &'a dyn SecretResolver,
        files: &'a dyn FileFetcher,
    ) -> Self {
        Self {
            model,
            secrets,
            files,
        }
    }

    /// Load one entity of `kind` from a raw JSON payload.
    pub fn load(
        &self,
        kind: &str,
        raw: &serde_json::Value,
        direction: Direction,
    ) -> Result<Entity> {
        let descriptor = self
            .model
            .descriptor(kind)
            .ok_or_else(|| LoadError::UnknownKind { kind: kind.into() })?;
        let empty = serde_json::Map::new();
        let raw_map = raw.as_object().unwrap_or(&empty);
        let name = entity_name(descriptor, raw_map)?;
        debug!(kind, name, ?direction, "loading entity");

        let mut loaded: BTreeMap<String, Value> = BTreeMap::new();
        for field in &descriptor.fields {
            let explicit = raw_map.contains_key(&field.name);
            let value = match raw_map.get(&field.name) {
                Some(v) => Some(Value::from_json(v)),
                None => default_value(field),
            };
            let Some(mut value) = value else {
                if field.required {
                    return Err(LoadError::MissingField {
                        kind: kind.into(),
                        name,
                        field: field.name.clone(),
                    });
                }
                continue;
            };
            check_shape(kind, &name, field, &value)?;
            for transform in field.transforms.for_load(direction) {
                value = self.apply_field_transform(
                    kind, &name, field, transform, value, explicit, &loaded, raw_map,
                )?;
            }
            loaded.insert(field.name.clone(), value);
        }

        let mut entity = assemble(kind, name, loaded);
        for transform in descriptor.entity_transforms.for_load(direction) {
            self.apply_entity_transform(descriptor, transform, raw_map, &mut entity)?;
        }
        Ok(entity)
    }

    /// Dump an entity to a raw JSON payload for the given direction.
    ///
    /// Fields the direction's policy marks read-only (cluster `id`),
    /// deprecated (remote) or secret-bearing (unless `include_secrets`) are
    /// skipped; everything else round-trips.
    pub fn dump(
        &self,
        entity: &Entity,
        direction: Direction,
        include_secrets: bool,
    ) -> Result<serde_json::Value> {
        let descriptor = self
            .model
            .descriptor(&entity.kind)
            .ok_or_else(|| LoadError::UnknownKind {
                kind: entity.kind.clone(),
            })?;
        let mut out = serde_json::Map::new();
        for field in &descriptor.fields {
            if field.dump_excluded(direction, include_secrets) {
                continue;
            }
            let value = match field.name.as_str() {
                ID_FIELD => entity.id.clone().map(Value::Str),
                _ => entity.field(&field.name),
            };
            match value {
                Some(value) if !value.is_null() => {
                    out.insert(field.name.clone(), value.to_json());
                }
                _ => {}
            }
        }
        Ok(serde_json::Value::Object(out))
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_field_transform(
        &self,
        kind: &str,
        name: &str,
        field: &FieldDescriptor,
        transform: &FieldTransform,
        value: Value,
        explicit: bool,
        loaded: &BTreeMap<String, Value>,
        raw_map: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Value> {
        match transform {
            FieldTransform::Single(SingleTransform::ResolveSecret) => {
                let reference = expect_str(kind, name, field, &value)?;
                let resolved =
                    self.secrets
                        .resolve(&reference)
                        .map_err(|detail| LoadError::Secret {
                            kind: kind.into(),
                            name: name.into(),
                            field: field.name.clone(),
                            reference: reference.clone(),
                            detail,
                        })?;
                Ok(Value::Str(resolved))
            }
            FieldTransform::Single(SingleTransform::FetchFile) => {
                let reference = expect_str(kind, name, field, &value)?;
                let bytes = self
                    .files
                    .fetch(&reference)
                    .map_err(|detail| LoadError::File {
                        kind: kind.into(),
                        name: name.into(),
                        field: field.name.clone(),
                        reference: reference.clone(),
                        detail,
                    })?;
                Ok(Value::Str(BASE64.encode(bytes)))
            }
            FieldTransform::Multi { deps, op } => {
                // Run only once every named dependency is resolvable. When
                // the field itself was explicit, an unresolvable dependency
                // is an error; a defaulted field simply stays unset.
                let mut sources = Vec::with_capacity(deps.len());
                for dep in deps {
                    let source = loaded
                        .get(dep)
                        .cloned()
                        .or_else(|| raw_map.get(dep).map(Value::from_json));
                    match source {
                        Some(source) => sources.push(source),
                        None if explicit => {
                            return Err(LoadError::MissingDependency {
                                kind: kind.into(),
                                name: name.into(),
                                field: field.name.clone(),
                                dependency: dep.clone(),
                            });
                        }
                        None => return Ok(value),
                    }
                }
                Ok(derive(op, &sources))
            }
        }
    }

    fn apply_entity_transform(
        &self,
        descriptor: &EntityDescriptor,
        transform: &EntityTransform,
        raw_map: &serde_json::Map<String, serde_json::Value>,
        entity: &mut Entity,
    ) -> Result<()> {
        match transform {
            EntityTransform::StampSecrets { fields } => {
                entity.secret_fields = fields
                    .iter()
                    .filter(|f| raw_map.contains_key(f.as_str()))
                    .cloned()
                    .collect();
                Ok(())
            }
            EntityTransform::ValidateVariant {
                field,
                tag,
                variants,
            } => {
                let target: BTreeMap<String, Value> = match field {
                    Some(f) => match entity.fields.get(f) {
                        Some(Value::Map(map)) => map.clone(),
                        // An absent optional union field has nothing to check.
                        _ => return Ok(()),
                    },
                    // Entity-level union: validate the raw input itself, so
                    // the check sees every supplied property whether or not
                    // the parent declares it.
                    None => raw_map
                        .iter()
                        .map(|(k, v)| (k.clone(), Value::from_json(v)))
                        .collect(),
                };
                let Some(Value::Str(selected)) = target.get(tag) else {
                    return Ok(());
                };
                let required = variants.get(selected).ok_or_else(|| {
                    LoadError::UnknownVariant {
                        kind: descriptor.kind.clone(),
                        name: entity.name.clone(),
                        field: field.clone().unwrap_or_else(|| tag.clone()),
                        variant: selected.clone(),
                    }
                })?;
                let missing: Vec<String> = required
                    .iter()
                    .filter(|r| {
                        r.as_str() != ID_FIELD
                            && target.get(r.as_str()).is_none_or(Value::is_null)
                    })
                    .cloned()
                    .collect();
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(LoadError::MissingRequiredFields {
                        kind: descriptor.kind.clone(),
                        name: entity.name.clone(),
                        variant: selected.clone(),
                        missing,
                    })
                }
            }
        }
    }
}

/// Resolve the entity name early so every error can carry it.
fn entity_name(
    descriptor: &EntityDescriptor,
    raw_map: &serde_json::Map<String, serde_json::Value>,
) -> Result<String> {
    if let Some(serde_json::Value::String(name)) = raw_map.get(NAME_FIELD) {
        return Ok(name.clone());
    }
    if let Some(field) = descriptor.field(NAME_FIELD) {
        if let DefaultRule::Value(serde_json::Value::String(default)) = &field.default {
            return Ok(default.clone());
        }
    }
    Err(LoadError::MissingField {
        kind: descriptor.kind.clone(),
        name: String::new(),
        field: NAME_FIELD.into(),
    })
}

/// String content of a reference value. Secret and file references are
/// always strings; anything else is a shape error.
fn expect_str(
    kind: &str,
    name: &str,
    field: &FieldDescriptor,
    value: &Value,
) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| LoadError::BadValue {
            kind: kind.into(),
            name: name.into(),
            field: field.name.clone(),
            detail: "expected a string reference".into(),
        })
}

/// Default value for an absent field, if its rule supplies one.
fn default_value(field: &FieldDescriptor) -> Option<Value> {
    match &field.default {
        DefaultRule::None => None,
        DefaultRule::Value(v) => Some(Value::from_json(v)),
        DefaultRule::RandomId => Some(Value::Str(Uuid::new_v4().to_string())),
    }
}

/// Shallow shape check of a value against its declared kind.
fn check_shape(kind: &str, name: &str, field: &FieldDescriptor, value: &Value) -> Result<()> {
    let ok = match (&field.kind, value) {
        (_, Value::Null) => true,
        (FieldKind::Str | FieldKind::Ref(_), Value::Str(_)) => true,
        (FieldKind::Int, Value::Int(_)) => true,
        (FieldKind::Float, Value::Float(_) | Value::Int(_)) => true,
        (FieldKind::Bool, Value::Bool(_)) => true,
        (FieldKind::Set(_), Value::Set(_)) => true,
        (FieldKind::Nested(_), Value::Map(_)) => true,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(LoadError::BadValue {
            kind: kind.into(),
            name: name.into(),
            field: field.name.clone(),
            detail: format!("expected {:?}", field.kind),
        })
    }
}

/// Compute a derived value from resolved sources.
fn derive(op: &MultiTransform, sources: &[Value]) -> Value {
    let text = sources
        .first()
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    match op {
        MultiTransform::Checksum => {
            let digest = Sha256::digest(text.as_bytes());
            Value::Str(BASE64.encode(digest))
        }
        MultiTransform::Size => {
            // Base64 sources (fetched file content) measure decoded bytes.
            let len = BASE64
                .decode(text.as_bytes())
                .map_or(text.len(), |decoded| decoded.len());
            Value::Int(len as i64)
        }
    }
}

/// Split the loaded field map into the entity's dedicated slots.
fn assemble(kind: &str, name: String, mut loaded: BTreeMap<String, Value>) -> Entity {
    loaded.remove(NAME_FIELD);
    let id = loaded
        .remove(ID_FIELD)
        .and_then(|v| v.as_str().map(str::to_string));
    let tags = match loaded.remove(TAGS_FIELD) {
        Some(Value::Set(items)) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => BTreeSet::new(),
    };
    Entity {
        kind: kind.to_string(),
        name,
        id,
        tags,
        fields: loaded,
        secret_fields: BTreeSet::new(),
    }
}
