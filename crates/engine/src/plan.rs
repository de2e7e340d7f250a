//! Reconciliation plans.

use std::collections::BTreeSet;

use warden_state::Entity;

/// The computed operations for one entity kind in one reconciliation pass.
///
/// The four buckets are pairwise disjoint. A plan is created once per pass
/// by the diff engine and consumed exactly once by the executor, which
/// returns a new plan with `errors` populated.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub kind: String,
    /// Expected entities absent from the current state.
    pub create: Vec<Entity>,
    /// Same name, different content; current identifier propagated.
    pub modify: Vec<Entity>,
    /// Current entities absent from the expected state, builtins excluded.
    pub delete: Vec<Entity>,
    /// Same name, identical content; current identifier propagated.
    pub share: Vec<Entity>,
    /// Identifiers of entities whose apply failed. `None` when no apply has
    /// run or every operation succeeded.
    pub errors: Option<BTreeSet<String>>,
}

impl Plan {
    /// Create an empty plan for a kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Whether the plan contains no operations to perform.
    pub fn is_converged(&self) -> bool {
        self.create.is_empty() && self.modify.is_empty() && self.delete.is_empty()
    }

    /// Whether any apply failures were recorded.
    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|e| !e.is_empty())
    }

    /// Number of operations that would touch the remote API.
    pub fn operation_count(&self) -> usize {
        self.create.len() + self.modify.len() + self.delete.len()
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: create={} modify={} delete={} share={} errors={}",
            self.kind,
            self.create.len(),
            self.modify.len(),
            self.delete.len(),
            self.share.len(),
            self.errors.as_ref().map_or(0, BTreeSet::len),
        )
    }
}
