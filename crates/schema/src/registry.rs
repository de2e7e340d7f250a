//! Schema registry: namespace document loading and reference resolution.
//!
//! The registry is an explicit object threaded through the build pipeline.
//! There is no module-level cache; ownership of parsed documents is clear
//! and there is exactly one initialization path.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::raw::{RawSchema, SchemaDocument};

/// Prefix of a definition pointer inside a document.
const DEFINITIONS_POINTER: &str = "#/definitions/";

/// Loads and caches schema documents per namespace, and resolves `$ref`
/// pointers within and across namespaces.
///
/// A namespace named `realm` is backed by `<dir>/realm.yaml`. Every load
/// goes through the cache, so each document is read and parsed at most once
/// no matter how many references point into it.
pub struct SchemaRegistry {
    dir: PathBuf,
    cache: BTreeMap<String, SchemaDocument>,
}

impl SchemaRegistry {
    /// Create a registry over a directory of schema documents.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: BTreeMap::new(),
        }
    }

    /// Load (or fetch from cache) the document backing a namespace.
    pub fn load_namespace(&mut self, namespace: &str) -> Result<&SchemaDocument> {
        if !self.cache.contains_key(namespace) {
            let path = self.dir.join(format!("{namespace}.yaml"));
            debug!(namespace, path = %path.display(), "loading schema document");
            let text = fs::read_to_string(&path).map_err(|source| SchemaError::Io {
                path: path.clone(),
                source,
            })?;
            let doc: SchemaDocument =
                serde_yaml::from_str(&text).map_err(|source| SchemaError::Parse { path, source })?;
            self.cache.insert(namespace.to_string(), doc);
        }
        self.cache
            .get(namespace)
            .ok_or_else(|| SchemaError::UnknownNamespace {
                namespace: namespace.to_string(),
            })
    }

    /// Resolve a `$ref` pointer relative to a namespace.
    ///
    /// Pointers take the form `#/definitions/Name` for the same namespace or
    /// `other_ns#/definitions/Name` across namespaces. Cross-namespace
    /// resolution passes through the same cache as [`Self::load_namespace`].
    ///
    /// Returns the namespace the definition lives in, the definition name,
    /// and the fragment itself.
    pub fn resolve(&mut self, namespace: &str, pointer: &str) -> Result<(String, String, RawSchema)> {
        let (target_ns, name) = match pointer.split_once(DEFINITIONS_POINTER) {
            Some(("", name)) => (namespace.to_string(), name.to_string()),
            Some((ns, name)) => (ns.to_string(), name.to_string()),
            None => {
                return Err(SchemaError::unresolved_ref(namespace, pointer));
            }
        };
        let doc = self.load_namespace(&target_ns)?;
        let schema = doc
            .definitions
            .get(&name)
            .cloned()
            .ok_or_else(|| SchemaError::unresolved_ref(&target_ns, pointer))?;
        Ok((target_ns, name, schema))
    }

    /// Flatten a fragment into a single self-contained schema.
    ///
    /// Bare `$ref` fragments are replaced by their (flattened) target.
    /// `allOf` compositions are merged element by element in order, so later
    /// definitions override earlier ones on property collision.
    ///
    /// Returns the flattened schema together with the namespace its
    /// properties should be resolved against.
    pub fn flatten(&mut self, namespace: &str, schema: &RawSchema) -> Result<(String, RawSchema)> {
        if let Some(pointer) = &schema.reference {
            let (ns, _, target) = self.resolve(namespace, pointer)?;
            return self.flatten(&ns, &target);
        }
        if schema.is_compound() {
            let mut base = schema.clone();
            let parts = std::mem::take(&mut base.all_of);
            for part in parts {
                let (_, flat) = self.flatten(namespace, &part)?;
                base.merge(flat);
            }
            return Ok((namespace.to_string(), base));
        }
        Ok((namespace.to_string(), schema.clone()))
    }
}
