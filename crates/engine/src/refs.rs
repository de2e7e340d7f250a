//! Cross-entity reference resolution.
//!
//! Expected entities refer to other kinds by name; the remote API speaks
//! identifiers. Resolution rewrites names to identifiers in place and
//! collects every dangling reference into a conflict map so the caller can
//! skip the kind for this pass and retry once the missing entity appears.

use std::collections::BTreeMap;

use tracing::warn;

use warden_schema::EntityDescriptor;
use warden_state::{EntityCollection, Value};

/// Referencing entity name to the references that did not resolve.
pub type ConflictMap = BTreeMap<String, Vec<String>>;

/// Name-to-identifier lookup per referenced kind.
pub type IdLookup = BTreeMap<String, BTreeMap<String, String>>;

/// Resolve every named reference in `expected` against the lookup maps.
///
/// Resolved references are rewritten in place as identifiers; unresolved
/// ones are accumulated per referencing-entity name. Returns `Some` with a
/// non-empty conflict map when anything dangled, `None` when resolution is
/// complete and the kind may proceed to apply.
pub fn resolve_references(
    descriptor: &EntityDescriptor,
    expected: &mut EntityCollection,
    lookup: &IdLookup,
) -> Option<ConflictMap> {
    let mut conflicts = ConflictMap::new();

    for entity in expected.iter_mut() {
        for dependency in &descriptor.dependencies {
            let Some(value) = entity.fields.get_mut(&dependency.field) else {
                continue;
            };
            let mut dangling = Vec::new();
            let rewritten = rewrite(&*value, |name| {
                for kind in &dependency.kinds {
                    if let Some(id) = lookup.get(kind).and_then(|ids| ids.get(name)) {
                        return Some(id.clone());
                    }
                }
                dangling.push(name.to_string());
                None
            });
            *value = rewritten;
            if !dangling.is_empty() {
                conflicts
                    .entry(entity.name.clone())
                    .or_default()
                    .extend(dangling);
            }
        }
    }

    if conflicts.is_empty() {
        None
    } else {
        warn!(
            kind = %descriptor.kind,
            conflicts = conflicts.len(),
            "unresolved entity references, kind will be skipped this pass"
        );
        Some(conflicts)
    }
}

/// Rewrite a reference value (a name or a set of names) through a resolver,
/// leaving unresolved names untouched.
fn rewrite(value: &Value, mut resolve: impl FnMut(&str) -> Option<String>) -> Value {
    match value {
        Value::Str(name) => resolve(name).map_or_else(|| value.clone(), Value::Str),
        Value::Set(items) => Value::Set(
            items
                .iter()
                .map(|item| match item {
                    Value::Str(name) => {
                        resolve(name).map_or_else(|| item.clone(), Value::Str)
                    }
                    other => other.clone(),
                })
                .collect(),
        ),
        other => other.clone(),
    }
}
