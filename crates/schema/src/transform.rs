//! Field and entity transforms.
//!
//! Transforms are a closed set of tagged variants dispatched explicitly by
//! the entity loader. The compiler only decides *which* transforms a field
//! carries and in *which* direction they run; the actual secret and file
//! resolvers are injected at load time.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Pure function of a single field's raw value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SingleTransform {
    /// Replace a secret reference with its decrypted value.
    ResolveSecret,
    /// Replace a file reference with base64-encoded file content.
    FetchFile,
}

/// Function of a field plus one or more named sibling fields. When the
/// field was explicitly present in the input, a missing dependency is a
/// load failure; a defaulted field with an absent source stays as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultiTransform {
    /// SHA-256 checksum (base64) of the named source field's value.
    Checksum,
    /// Byte length of the named source field's value.
    Size,
}

/// A transform attached to one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldTransform {
    Single(SingleTransform),
    Multi {
        /// Sibling fields the transform reads, in order.
        deps: Vec<String>,
        op: MultiTransform,
    },
}

/// Transform applied to the whole entity once the structural instance
/// exists, receiving the raw input map alongside the constructed entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityTransform {
    /// Validate that the variant selected by a discriminator tag carries
    /// all of that variant's required fields. Reports every missing field.
    ValidateVariant {
        /// Field holding the union value; `None` when the entity itself is
        /// the discriminated union.
        field: Option<String>,
        /// Property carrying the variant tag.
        tag: String,
        /// Variant tag to that variant's required fields (minus `id`).
        variants: BTreeMap<String, Vec<String>>,
    },
    /// Record which fields held secret references in the raw input.
    StampSecrets { fields: BTreeSet<String> },
}

/// Direction a payload is loaded from or dumped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Cluster-native representation (custom resource payloads).
    Cluster,
    /// Remote control-plane API representation.
    Remote,
}

/// Direction-scoped transform sets for one field.
///
/// Secrets only exist in the cluster-native representation, so secret
/// resolution never appears in the remote set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTransforms {
    pub cluster_load: Vec<FieldTransform>,
    pub remote_load: Vec<FieldTransform>,
}

impl FieldTransforms {
    /// Transforms to run when loading from the given direction.
    pub fn for_load(&self, direction: Direction) -> &[FieldTransform] {
        match direction {
            Direction::Cluster => &self.cluster_load,
            Direction::Remote => &self.remote_load,
        }
    }

    /// Whether any direction carries transforms.
    pub fn is_empty(&self) -> bool {
        self.cluster_load.is_empty() && self.remote_load.is_empty()
    }
}

/// Direction-scoped whole-entity transform sets for one kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTransforms {
    pub cluster_load: Vec<EntityTransform>,
    pub remote_load: Vec<EntityTransform>,
}

impl EntityTransforms {
    /// Transforms to run when loading from the given direction.
    pub fn for_load(&self, direction: Direction) -> &[EntityTransform] {
        match direction {
            Direction::Cluster => &self.cluster_load,
            Direction::Remote => &self.remote_load,
        }
    }

    /// Attach a transform to both load directions.
    pub fn push_both(&mut self, transform: EntityTransform) {
        self.cluster_load.push(transform.clone());
        self.remote_load.push(transform);
    }
}
