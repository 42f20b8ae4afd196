use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, Utc};

use reldigest_core::error::{DigestError, Result};
use reldigest_core::types::{InvocationId, StepId};

/// Per-run result store: a write-once mapping from step id to output.
///
/// Each step owns exclusive write access to its own slot, so no locking is
/// needed; the level barrier is the only synchronization point. A result,
/// once recorded, is never overwritten.
pub struct RunContext {
    invocation_id: InvocationId,
    run_date: NaiveDate,
    results: BTreeMap<StepId, String>,
}

impl RunContext {
    pub fn new(invocation_id: InvocationId) -> Self {
        Self {
            invocation_id,
            run_date: Utc::now().date_naive(),
            results: BTreeMap::new(),
        }
    }

    pub fn invocation_id(&self) -> &InvocationId {
        &self.invocation_id
    }

    pub fn run_date(&self) -> NaiveDate {
        self.run_date
    }

    /// Record a step's result. Fails if the slot is already written.
    pub fn record(&mut self, step: &StepId, output: String) -> Result<()> {
        if self.results.contains_key(step) {
            return Err(DigestError::DuplicateResult(step.to_string()));
        }
        self.results.insert(step.clone(), output);
        Ok(())
    }

    pub fn get(&self, step: &StepId) -> Option<&str> {
        self.results.get(step).map(String::as_str)
    }

    /// Completeness check for the dependency barrier: a simple membership
    /// test over the declared dependency set.
    pub fn has_all(&self, deps: &BTreeSet<StepId>) -> bool {
        deps.iter().all(|d| self.results.contains_key(d))
    }

    /// Clone out the results of a step's dependencies. Fails if any
    /// dependency has no recorded result yet.
    pub fn snapshot(&self, deps: &BTreeSet<StepId>) -> Result<BTreeMap<StepId, String>> {
        let mut out = BTreeMap::new();
        for dep in deps {
            let value = self.results.get(dep).ok_or_else(|| DigestError::Config(
                format!("Dependency '{}' has no recorded result", dep),
            ))?;
            out.insert(dep.clone(), value.clone());
        }
        Ok(out)
    }

    pub fn into_results(self) -> BTreeMap<StepId, String> {
        self.results
    }
}
