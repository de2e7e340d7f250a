//! Error types for schema compilation.

use std::path::PathBuf;

/// Result type alias for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Errors raised while loading schema documents and compiling the entity
/// model. All of these are fatal at startup: a partially built model is
/// never handed to the reconciler.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A `$ref` pointer did not resolve to a definition.
    #[error("unresolved schema reference '{pointer}' in namespace '{namespace}'")]
    UnresolvedRef { namespace: String, pointer: String },

    /// A schema fragment had a missing or unsupported `type` keyword.
    #[error("unknown schema type {found:?} for field '{field}' of entity '{kind}'")]
    UnknownType {
        kind: String,
        field: String,
        found: Option<String>,
    },

    /// A field declared a dependency on an entity kind that is not
    /// registered in the model.
    #[error("field '{field}' of entity '{kind}' references unregistered kind '{target}'")]
    UnknownDependency {
        kind: String,
        field: String,
        target: String,
    },

    /// The entity dependency graph contains a cycle.
    #[error("entity dependency cycle involving kind '{kind}'")]
    DependencyCycle { kind: String },

    /// A namespace document could not be read.
    #[error("failed to read schema document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A namespace document could not be parsed.
    #[error("failed to parse schema document {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A namespace was requested that has no backing document.
    #[error("unknown schema namespace '{namespace}'")]
    UnknownNamespace { namespace: String },
}

impl SchemaError {
    /// Create an unresolved reference error.
    pub fn unresolved_ref(namespace: impl Into<String>, pointer: impl Into<String>) -> Self {
        Self::UnresolvedRef {
            namespace: namespace.into(),
            pointer: pointer.into(),
        }
    }

    /// Create an unknown type error.
    pub fn unknown_type(
        kind: impl Into<String>,
        field: impl Into<String>,
        found: Option<String>,
    ) -> Self {
        Self::UnknownType {
            kind: kind.into(),
            field: field.into(),
            found,
        }
    }

    /// Create an unknown dependency error.
    pub fn unknown_dependency(
        kind: impl Into<String>,
        field: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::UnknownDependency {
            kind: kind.into(),
            field: field.into(),
            target: target.into(),
        }
    }
}
