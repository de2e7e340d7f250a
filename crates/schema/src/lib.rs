//! Schema-driven entity model compiler.
//!
//! Turns OpenAPI-style schema documents into typed, immutable entity
//! descriptors:
//!
//! - **Registry**: loads and caches namespace documents, resolves `$ref`
//!   pointers within and across namespaces, flattens `allOf` compositions
//! - **Builder**: compiles properties into field descriptors with semantic
//!   types, required/default/equality flags and direction-scoped transforms
//! - **Graph**: records cross-entity dependencies and produces the
//!   topological apply order
//!
//! The compiled [`EntityModel`] is built once at startup and shared
//! read-only with the reconciliation engine. Any schema error aborts
//! compilation; the engine never runs against a partial model.

pub mod builder;
pub mod descriptor;
pub mod error;
pub mod graph;
pub mod model;
pub mod raw;
pub mod registry;
pub mod transform;

pub use descriptor::{
    DefaultRule, EntityDependency, EntityDescriptor, FieldDescriptor, FieldKind, ID_FIELD,
    NAME_FIELD, TAGS_FIELD,
};
pub use error::{Result, SchemaError};
pub use graph::DependencyGraph;
pub use model::EntityModel;
pub use raw::{Discriminator, RawSchema, SchemaDocument};
pub use registry::SchemaRegistry;
pub use transform::{
    Direction, EntityTransform, EntityTransforms, FieldTransform, FieldTransforms, MultiTransform,
    SingleTransform,
};
