//! Raw schema document model.
//!
//! Schema documents are plain YAML maps in an OpenAPI-style shape. This
//! module only captures the keywords the compiler consumes; anything else in
//! the document is ignored.

use std::collections::BTreeMap;

use serde::Deserialize;

/// One namespace worth of schema definitions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaDocument {
    /// Definition name to schema fragment.
    #[serde(default)]
    pub definitions: BTreeMap<String, RawSchema>,
}

/// Discriminator for a tagged-union schema.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Discriminator {
    /// Field holding the variant tag.
    #[serde(rename = "propertyName")]
    pub property_name: String,
    /// Variant tag to `$ref` pointer of the variant schema.
    #[serde(default)]
    pub mapping: BTreeMap<String, String>,
}

/// A single schema fragment as it appears on disk.
///
/// `x-` extension keywords carry the warden-specific markers: secret and
/// file formats live in `format`, entity references in `x-entity-ref`,
/// top-level kind metadata in `x-api-path` / `x-singleton`, and derived
/// fields name their source sibling in `x-derived-from`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSchema {
    #[serde(rename = "type")]
    pub schema_type: Option<String>,

    #[serde(rename = "$ref")]
    pub reference: Option<String>,

    #[serde(rename = "allOf", default)]
    pub all_of: Vec<RawSchema>,

    pub items: Option<Box<RawSchema>>,

    #[serde(default)]
    pub properties: BTreeMap<String, RawSchema>,

    #[serde(default)]
    pub required: Vec<String>,

    pub format: Option<String>,

    pub description: Option<String>,

    pub discriminator: Option<Discriminator>,

    pub default: Option<serde_json::Value>,

    #[serde(default)]
    pub deprecated: bool,

    #[serde(rename = "readOnly", default)]
    pub read_only: bool,

    /// Entity kind this field refers to by name.
    #[serde(rename = "x-entity-ref")]
    pub entity_ref: Option<String>,

    /// Remote API path for a top-level kind.
    #[serde(rename = "x-api-path")]
    pub api_path: Option<String>,

    /// Exactly one unnamed instance of this kind may exist.
    #[serde(rename = "x-singleton", default)]
    pub singleton: bool,

    /// Sibling field a derived value (checksum, size) is computed from.
    #[serde(rename = "x-derived-from")]
    pub derived_from: Option<String>,

    /// Exclude this field from content equality.
    #[serde(rename = "x-no-eq", default)]
    pub no_eq: bool,
}

impl RawSchema {
    /// Whether this fragment is a bare reference to another definition.
    pub fn is_ref(&self) -> bool {
        self.reference.is_some()
    }

    /// Whether this fragment is an `allOf` composition.
    pub fn is_compound(&self) -> bool {
        !self.all_of.is_empty()
    }

    /// Merge `other` into `self` for `allOf` flattening.
    ///
    /// Required lists are unioned, later properties override earlier ones on
    /// key collision, discriminator mappings are merged and descriptions are
    /// concatenated.
    pub fn merge(&mut self, other: RawSchema) {
        for req in other.required {
            if !self.required.contains(&req) {
                self.required.push(req);
            }
        }
        self.properties.extend(other.properties);
        match (&mut self.discriminator, other.discriminator) {
            (Some(mine), Some(theirs)) => {
                if mine.property_name.is_empty() {
                    mine.property_name = theirs.property_name;
                }
                mine.mapping.extend(theirs.mapping);
            }
            (slot @ None, Some(theirs)) => *slot = Some(theirs),
            _ => {}
        }
        match (&mut self.description, other.description) {
            (Some(mine), Some(theirs)) => {
                mine.push(' ');
                mine.push_str(&theirs);
            }
            (slot @ None, Some(theirs)) => *slot = Some(theirs),
            _ => {}
        }
        if self.schema_type.is_none() {
            self.schema_type = other.schema_type;
        }
        if self.api_path.is_none() {
            self.api_path = other.api_path;
        }
        self.singleton |= other.singleton;
    }
}
