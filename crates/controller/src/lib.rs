//! Event-driven reconciliation controller.
//!
//! Wires per-kind watch streams into a single expected-state owner:
//!
//! - [`EventSource`] abstracts one kind's watch stream; [`spawn_watchers`]
//!   forwards every source onto one shared queue
//! - [`ReconcileLoop`] is the sole consumer of that queue and the sole
//!   mutator of expected state; it debounces event bursts with a
//!   quiescence window and runs one reconciliation pass per quiet period
//!
//! Per-entity apply failures and unresolved references stay inside the
//! pass report and retry on the next pass. Load errors and broken watch
//! streams are fatal: the loop returns an error and the process exits.

pub mod config;
pub mod error;
pub mod event;
pub mod runner;

pub use config::ControllerConfig;
pub use error::{Error, Result};
pub use event::{EventOp, EventSource, WatchEvent, spawn_watchers};
pub use runner::ReconcileLoop;
