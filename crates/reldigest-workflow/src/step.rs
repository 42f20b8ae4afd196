use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::BoxFuture;

use reldigest_core::error::Result;
use reldigest_core::types::{InvocationId, SessionKey, StepId};

/// Inputs available to a step when it executes.
///
/// `prior` holds the results of this step's declared dependencies only,
/// cloned out of the run's result store. A step reads, never mutates, the
/// results written by earlier levels.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub step_id: StepId,
    pub invocation_id: InvocationId,
    pub run_date: NaiveDate,
    prior: BTreeMap<StepId, String>,
}

impl StepContext {
    pub fn new(
        step_id: StepId,
        invocation_id: InvocationId,
        run_date: NaiveDate,
        prior: BTreeMap<StepId, String>,
    ) -> Self {
        Self {
            step_id,
            invocation_id,
            run_date,
            prior,
        }
    }

    /// Session key scoping this step's external capability call.
    pub fn session_key(&self) -> SessionKey {
        SessionKey::derive(&self.step_id, &self.invocation_id, self.run_date)
    }

    /// Result of a dependency step, if present.
    pub fn prior(&self, id: &StepId) -> Option<&str> {
        self.prior.get(id).map(String::as_str)
    }

    /// All dependency results, keyed by step id.
    pub fn prior_results(&self) -> &BTreeMap<StepId, String> {
        &self.prior
    }
}

/// One unit of work in the orchestration graph.
pub trait StepExec: Send + Sync + 'static {
    fn execute(&self, ctx: StepContext) -> BoxFuture<'_, Result<String>>;
}

/// A step plus its declared dependencies.
///
/// Owned by the `WorkflowBuilder` until commit; immutable afterwards.
#[derive(Clone)]
pub struct StepDefinition {
    pub step_id: StepId,
    pub depends_on: BTreeSet<StepId>,
    pub exec: Arc<dyn StepExec>,
}

impl StepDefinition {
    pub fn new(id: impl Into<StepId>, exec: Arc<dyn StepExec>) -> Self {
        Self {
            step_id: id.into(),
            depends_on: BTreeSet::new(),
            exec,
        }
    }

    /// Declare the steps this one runs after.
    pub fn after(mut self, deps: impl IntoIterator<Item = StepId>) -> Self {
        self.depends_on = deps.into_iter().collect();
        self
    }
}

impl std::fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepDefinition")
            .field("step_id", &self.step_id)
            .field("depends_on", &self.depends_on)
            .finish()
    }
}
