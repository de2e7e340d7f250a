//! Error types for the controller crate.

/// Result type alias for controller operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Controller error types.
///
/// Any of these observed while draining a batch is unrecoverable for the
/// process: the loop returns it and the process exits non-zero. Apply
/// failures and reference conflicts are not errors here; they stay inside
/// the pass report and retry on later passes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The event source reported a hard failure for a kind.
    #[error("watch stream for kind '{kind}' failed: {reason}")]
    Watch { kind: String, reason: String },

    /// An event payload failed to load.
    #[error(transparent)]
    Load(#[from] warden_state::LoadError),

    /// A reconciliation pass failed outside per-entity isolation.
    #[error(transparent)]
    Engine(#[from] warden_engine::Error),
}

impl Error {
    /// Create a watch stream error.
    pub fn watch(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Watch {
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}
