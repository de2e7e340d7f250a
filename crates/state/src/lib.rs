//! Entity values, loading and state collections.
//!
//! This crate holds the runtime half of the entity model: the closed
//! [`Value`] record type, [`Entity`] instances, the direction-scoped
//! [`EntityLoader`], and the per-kind [`EntityCollection`] that watch
//! events replay into.
//!
//! Secret and file resolution is injected through the [`SecretResolver`]
//! and [`FileFetcher`] traits; which backend answers a reference is decided
//! per deployment, never here.

pub mod collection;
pub mod entity;
pub mod error;
pub mod loader;
pub mod resolvers;
pub mod value;

pub use collection::{EntityCollection, EntityOp};
pub use entity::{BUILTIN_TAG, Entity};
pub use error::{LoadError, Result};
pub use loader::EntityLoader;
pub use resolvers::{FileFetcher, NoFiles, NoSecrets, SecretResolver};
pub use value::Value;
