//! Error types for entity loading and state handling.

/// Result type alias for state operations.
pub type Result<T> = std::result::Result<T, LoadError>;

/// Errors raised while loading or dumping a single entity.
///
/// A load error is fatal for the event being processed and is reported
/// upward carrying the offending entity kind and name; it never aborts the
/// whole process by itself and is never silently dropped.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    /// The payload names a kind the model does not know.
    #[error("unknown entity kind '{kind}'")]
    UnknownKind { kind: String },

    /// A required field was absent from the payload.
    #[error("entity '{name}' of kind '{kind}' is missing required field '{field}'")]
    MissingField {
        kind: String,
        name: String,
        field: String,
    },

    /// A field value did not match its declared semantic type.
    #[error("field '{field}' of {kind} '{name}' has unexpected shape: {detail}")]
    BadValue {
        kind: String,
        name: String,
        field: String,
        detail: String,
    },

    /// A multi-field transform named a sibling that is not resolvable.
    #[error("field '{field}' of {kind} '{name}' depends on missing field '{dependency}'")]
    MissingDependency {
        kind: String,
        name: String,
        field: String,
        dependency: String,
    },

    /// A secret reference could not be resolved.
    #[error("secret reference '{reference}' on field '{field}' of {kind} '{name}': {detail}")]
    Secret {
        kind: String,
        name: String,
        field: String,
        reference: String,
        detail: String,
    },

    /// A file reference could not be fetched.
    #[error("file reference '{reference}' on field '{field}' of {kind} '{name}': {detail}")]
    File {
        kind: String,
        name: String,
        field: String,
        reference: String,
        detail: String,
    },

    /// A discriminated-union variant is missing required fields. Lists
    /// every missing field, not just the first.
    #[error("{kind} '{name}' variant '{variant}' is missing required fields: {}", missing.join(", "))]
    MissingRequiredFields {
        kind: String,
        name: String,
        variant: String,
        missing: Vec<String>,
    },

    /// The discriminator tag selected an unknown variant.
    #[error("{kind} '{name}' has unknown variant tag '{variant}' in field '{field}'")]
    UnknownVariant {
        kind: String,
        name: String,
        field: String,
        variant: String,
    },
}

impl LoadError {
    /// Entity kind the error belongs to.
    pub fn kind(&self) -> &str {
        match self {
            Self::UnknownKind { kind }
            | Self::MissingField { kind, .. }
            | Self::BadValue { kind, .. }
            | Self::MissingDependency { kind, .. }
            | Self::Secret { kind, .. }
            | Self::File { kind, .. }
            | Self::MissingRequiredFields { kind, .. }
            | Self::UnknownVariant { kind, .. } => kind,
        }
    }
}
