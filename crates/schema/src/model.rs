//! Compiled entity model.
//!
//! The model is built once at startup from a set of schema namespaces and
//! treated as immutable, shared and read-only thereafter.

use std::collections::BTreeMap;

use tracing::info;

use crate::builder::DescriptorBuilder;
use crate::descriptor::EntityDescriptor;
use crate::error::Result;
use crate::graph::DependencyGraph;
use crate::registry::SchemaRegistry;

/// The full compiled entity model: descriptors for every kind plus the
/// validated dependency graph.
#[derive(Debug, Clone, Default)]
pub struct EntityModel {
    descriptors: BTreeMap<String, EntityDescriptor>,
    graph: DependencyGraph,
}

impl EntityModel {
    /// Compile the given namespaces into a model.
    ///
    /// Fails fast on any schema error; the reconciler never sees a
    /// partially built model.
    pub fn compile(registry: &mut SchemaRegistry, namespaces: &[String]) -> Result<Self> {
        let mut builder = DescriptorBuilder::new(registry);
        for namespace in namespaces {
            builder.build_namespace(namespace)?;
        }
        let descriptors = builder.finish();
        let graph = DependencyGraph::build(&descriptors)?;
        info!(
            kinds = graph.apply_order().len(),
            descriptors = descriptors.len(),
            "entity model compiled"
        );
        Ok(Self { descriptors, graph })
    }

    /// Descriptor for a kind, if registered.
    pub fn descriptor(&self, kind: &str) -> Option<&EntityDescriptor> {
        self.descriptors.get(kind)
    }

    /// All registered descriptors, nested kinds included.
    pub fn descriptors(&self) -> &BTreeMap<String, EntityDescriptor> {
        &self.descriptors
    }

    /// Top-level kinds in apply order, referenced kinds first.
    pub fn apply_order(&self) -> &[String] {
        self.graph.apply_order()
    }

    /// The dependency graph.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use std::fs;
    use std::io::Write;

    const ACCESS_DOC: &str = r"
definitions:
  Condition:
    type: object
    x-api-path: conditions
    required: [name, expr]
    properties:
      name: { type: string }
      expr: { type: string }
  Entitlement:
    type: object
    x-api-path: entitlements
    required: [name]
    properties:
      name: { type: string }
      conditions:
        type: array
        x-entity-ref: Condition
        items: { type: string }
  Policy:
    type: object
    x-api-path: policies
    required: [name]
    properties:
      name: { type: string }
      entitlements:
        type: array
        x-entity-ref: Entitlement
        items: { type: string }
";

    #[test]
    fn test_compile_and_apply_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join("access.yaml")).unwrap();
        f.write_all(ACCESS_DOC.as_bytes()).unwrap();

        let mut registry = SchemaRegistry::new(dir.path());
        let model = EntityModel::compile(&mut registry, &["access".to_string()]).unwrap();

        assert!(model.descriptor("Condition").is_some());
        assert!(model.descriptor("Entitlement").is_some());
        assert!(model.descriptor("Policy").is_some());

        let order = model.apply_order();
        let pos = |k: &str| order.iter().position(|o| o == k).unwrap();
        assert!(pos("Condition") < pos("Entitlement"));
        assert!(pos("Entitlement") < pos("Policy"));
    }
}
