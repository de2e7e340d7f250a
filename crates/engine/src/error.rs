//! Error types for the reconciliation engine.

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Engine error types.
///
/// Per-entity apply failures are not errors here: they are collected into
/// the plan's error set so one rejected entity never aborts a pass.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A kind was requested that the compiled model does not register.
    #[error("unknown entity kind '{kind}'")]
    UnknownKind { kind: String },

    /// Fetching the current remote state for a kind failed.
    #[error("failed to fetch current state of kind '{kind}': {reason}")]
    CurrentState { kind: String, reason: String },
}

impl Error {
    /// Create an unknown kind error.
    pub fn unknown_kind(kind: impl Into<String>) -> Self {
        Self::UnknownKind { kind: kind.into() }
    }

    /// Create a current state fetch error.
    pub fn current_state(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CurrentState {
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::current_state("Policy", "connection refused");
        assert!(err.to_string().contains("Policy"));
        assert!(err.to_string().contains("connection refused"));
    }
}
