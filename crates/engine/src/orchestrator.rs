//! Multi-kind reconciliation orchestrator.

use std::collections::BTreeMap;

use tracing::{debug, info};

use warden_schema::EntityModel;
use warden_state::EntityCollection;

use crate::client::EntityClient;
use crate::diff::compare_entities;
use crate::error::{Error, Result};
use crate::executor::PlanExecutor;
use crate::plan::Plan;
use crate::refs::{ConflictMap, IdLookup, resolve_references};

/// Outcome of one kind within a pass.
#[derive(Debug, Clone)]
pub enum KindOutcome {
    /// The kind's plan was executed (possibly with per-entity errors).
    Applied(Plan),
    /// Reference conflicts: the kind was skipped for this pass and will be
    /// retried once the missing entities appear.
    Skipped { kind: String, conflicts: ConflictMap },
}

/// Result of one full reconciliation pass across all kinds.
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub outcomes: Vec<KindOutcome>,
}

impl PassReport {
    /// Whether every kind applied without per-entity errors or conflicts.
    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(|o| match o {
            KindOutcome::Applied(plan) => !plan.has_errors(),
            KindOutcome::Skipped { .. } => false,
        })
    }
}

/// Runs one reconciliation pass per call, walking kinds strictly in
/// dependency order so identifiers referenced by a dependent kind exist
/// before the dependent's apply step runs.
///
/// There is no cross-kind rollback: once one kind's plan is applied, a
/// later kind's failure does not undo it. Partial convergence is accepted
/// and surfaced through the report.
pub struct Orchestrator<'a> {
    model: &'a EntityModel,
    client: &'a dyn EntityClient,
    compare_secrets: bool,
}

impl<'a> Orchestrator<'a> {
    pub fn new(model: &'a EntityModel, client: &'a dyn EntityClient) -> Self {
        Self {
            model,
            client,
            compare_secrets: false,
        }
    }

    /// Include secret-bearing fields in content comparison.
    pub fn compare_secrets(mut self, enabled: bool) -> Self {
        self.compare_secrets = enabled;
        self
    }

    /// Run one pass over a snapshot of the expected state.
    ///
    /// `expected` is mutated in place: named references are rewritten to
    /// identifiers and current identifiers are propagated onto shared and
    /// modified entities, so later kinds resolve against converged ids.
    pub async fn reconcile_all(
        &self,
        expected: &mut BTreeMap<String, EntityCollection>,
    ) -> Result<PassReport> {
        let mut report = PassReport::default();
        let mut lookup = IdLookup::new();

        for kind in self.model.apply_order() {
            let descriptor = self
                .model
                .descriptor(kind)
                .ok_or_else(|| Error::unknown_kind(kind))?;
            let expected_kind = expected
                .entry(kind.clone())
                .or_insert_with(|| EntityCollection::new(kind.clone()));

            if let Some(conflicts) = resolve_references(descriptor, expected_kind, &lookup) {
                report.outcomes.push(KindOutcome::Skipped {
                    kind: kind.clone(),
                    conflicts,
                });
                continue;
            }

            let current: EntityCollection = self
                .client
                .current_state(kind)
                .await
                .map_err(|e| Error::current_state(kind, e.to_string()))?
                .into_iter()
                .collect();
            debug!(kind = %kind, current = current.len(), expected = expected_kind.len(), "diffing");

            let plan = compare_entities(&current, expected_kind, descriptor, self.compare_secrets);

            // Propagate converged identifiers back onto the expected state
            // so dependent kinds resolve against them.
            for entity in plan.share.iter().chain(&plan.modify) {
                expected_kind.set_id(&entity.name, entity.id.clone());
            }
            lookup.insert(kind.clone(), expected_kind.ids_by_name());

            let executed = PlanExecutor::new(self.client).apply(plan).await;
            info!(plan = %executed, "kind reconciled");
            report.outcomes.push(KindOutcome::Applied(executed));
        }

        Ok(report)
    }
}
