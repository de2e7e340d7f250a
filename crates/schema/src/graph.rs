//! Entity dependency graph.
//!
//! Directed edges between top-level kinds, derived from `Ref` fields.
//! Topological order drives the apply sequence: a referenced kind is always
//! applied before the kinds referring to it (conditions before entitlements
//! before policies).

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::descriptor::EntityDescriptor;
use crate::error::{Result, SchemaError};

/// Directed dependency graph over top-level entity kinds.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    order: Vec<String>,
    edges: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Build and validate the graph from compiled descriptors.
    ///
    /// Every declared dependency must resolve to a registered top-level
    /// kind; an unresolved dependency is a fatal configuration error, as is
    /// a cycle.
    pub fn build(descriptors: &BTreeMap<String, EntityDescriptor>) -> Result<Self> {
        let mut graph: DiGraph<String, ()> = DiGraph::new();
        let mut nodes: BTreeMap<&str, NodeIndex> = BTreeMap::new();

        for (kind, descriptor) in descriptors {
            if descriptor.is_top_level() {
                nodes.insert(kind, graph.add_node(kind.clone()));
            }
        }

        let mut edges: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (kind, descriptor) in descriptors {
            let Some(&from) = nodes.get(kind.as_str()) else {
                continue;
            };
            for dep in &descriptor.dependencies {
                for target in &dep.kinds {
                    let &to = nodes.get(target.as_str()).ok_or_else(|| {
                        SchemaError::unknown_dependency(kind, &dep.field, target)
                    })?;
                    // Edge from the referenced kind toward the referencer,
                    // so topological order yields leaves first.
                    graph.add_edge(to, from, ());
                    edges.entry(kind.clone()).or_default().push(target.clone());
                }
            }
        }

        let order = toposort(&graph, None)
            .map_err(|cycle| SchemaError::DependencyCycle {
                kind: graph[cycle.node_id()].clone(),
            })?
            .into_iter()
            .map(|idx| graph[idx].clone())
            .collect();

        Ok(Self { order, edges })
    }

    /// Kinds in apply order, referenced kinds first.
    pub fn apply_order(&self) -> &[String] {
        &self.order
    }

    /// Kinds a given kind depends on.
    pub fn dependencies_of(&self, kind: &str) -> &[String] {
        self.edges.get(kind).map_or(&[], Vec::as_slice)
    }
}
