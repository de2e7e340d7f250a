//! State reconciliation engine.
//!
//! Diffs two versioned entity collections into a [`Plan`], resolves named
//! cross-entity references into identifiers, and executes plans against an
//! external [`EntityClient`] with per-entity error isolation:
//!
//! 1. [`compare_entities`] splits current vs expected into create, modify,
//!    delete and share buckets
//! 2. [`resolve_references`] rewrites names to identifiers and reports
//!    dangling references as conflicts
//! 3. [`PlanExecutor`] applies a single kind's plan, collecting failures
//!    into the plan's error set instead of failing fast
//! 4. [`Orchestrator`] walks all kinds in dependency order, one pass at a
//!    time, skipping conflicted kinds until their references appear

pub mod client;
pub mod diff;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod plan;
pub mod refs;

pub use client::EntityClient;
pub use diff::compare_entities;
pub use error::{Error, Result};
pub use executor::PlanExecutor;
pub use orchestrator::{KindOutcome, Orchestrator, PassReport};
pub use plan::Plan;
pub use refs::{ConflictMap, IdLookup, resolve_references};
