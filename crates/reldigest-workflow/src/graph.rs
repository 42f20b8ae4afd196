use std::collections::{HashMap, HashSet};

use reldigest_core::error::{DigestError, Result};
use reldigest_core::types::StepId;

use crate::step::StepDefinition;

/// Mutable workflow definition.
///
/// Steps may only depend on previously declared steps, so the graph is
/// acyclic by construction. `commit()` freezes the definition set into a
/// `CommittedGraph`; afterwards the builder is terminal and rejects all
/// further calls with `GraphAlreadyCommitted`.
#[derive(Debug)]
pub struct WorkflowBuilder {
    name: String,
    steps: Vec<StepDefinition>,
    committed: bool,
}

impl WorkflowBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            committed: false,
        }
    }

    /// Add a single step. Its dependencies must all have been added before.
    pub fn add_step(&mut self, def: StepDefinition) -> Result<&mut Self> {
        if self.committed {
            return Err(DigestError::GraphAlreadyCommitted);
        }
        if self.steps.iter().any(|s| s.step_id == def.step_id) {
            return Err(DigestError::DuplicateStepId(def.step_id.to_string()));
        }
        for dep in &def.depends_on {
            if !self.steps.iter().any(|s| &s.step_id == dep) {
                return Err(DigestError::UnknownDependency {
                    step: def.step_id.to_string(),
                    dependency: dep.to_string(),
                });
            }
        }
        self.steps.push(def);
        Ok(self)
    }

    /// Fan-out: add a group of steps that do not depend on each other.
    pub fn add_parallel(&mut self, defs: Vec<StepDefinition>) -> Result<&mut Self> {
        let group: HashSet<StepId> = defs.iter().map(|d| d.step_id.clone()).collect();
        for def in &defs {
            if let Some(dep) = def.depends_on.iter().find(|d| group.contains(d)) {
                return Err(DigestError::Config(format!(
                    "Parallel group step '{}' may not depend on group member '{}'",
                    def.step_id, dep
                )));
            }
        }
        for def in defs {
            self.add_step(def)?;
        }
        Ok(self)
    }

    /// Fan-in: add `def` to run after all of `after`.
    pub fn then(
        &mut self,
        def: StepDefinition,
        after: impl IntoIterator<Item = StepId>,
    ) -> Result<&mut Self> {
        self.add_step(def.after(after))
    }

    /// Validate the definition set and freeze it into an executable plan.
    pub fn commit(&mut self) -> Result<CommittedGraph> {
        if self.committed {
            return Err(DigestError::GraphAlreadyCommitted);
        }
        self.committed = true;

        let steps = std::mem::take(&mut self.steps);
        let levels = compute_levels(&steps)?;
        let index = steps
            .iter()
            .enumerate()
            .map(|(i, s)| (s.step_id.clone(), i))
            .collect();

        Ok(CommittedGraph {
            name: self.name.clone(),
            steps,
            index,
            levels,
        })
    }
}

/// Partition steps into levels: level 0 holds steps with no dependencies,
/// level k holds steps whose dependencies are all satisfied by levels < k.
///
/// Computed by repeatedly selecting the not-yet-leveled steps whose full
/// dependency set is already leveled; a pass that makes no progress with
/// steps remaining signals a cycle.
fn compute_levels(steps: &[StepDefinition]) -> Result<Vec<Vec<StepId>>> {
    let mut leveled: HashSet<StepId> = HashSet::new();
    let mut remaining: Vec<&StepDefinition> = steps.iter().collect();
    let mut levels = Vec::new();

    while !remaining.is_empty() {
        let (ready, blocked): (Vec<&StepDefinition>, Vec<&StepDefinition>) = remaining
            .into_iter()
            .partition(|s| s.depends_on.iter().all(|d| leveled.contains(d)));

        if ready.is_empty() {
            let stuck = blocked
                .iter()
                .map(|s| s.step_id.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(DigestError::CyclicDependency(stuck));
        }

        leveled.extend(ready.iter().map(|s| s.step_id.clone()));
        levels.push(ready.into_iter().map(|s| s.step_id.clone()).collect());
        remaining = blocked;
    }

    Ok(levels)
}

/// Immutable, topologically valid snapshot of a workflow plus its level
/// partition. Safely shared read-only across concurrent runs.
pub struct CommittedGraph {
    name: String,
    steps: Vec<StepDefinition>,
    index: HashMap<StepId, usize>,
    levels: Vec<Vec<StepId>>,
}

impl CommittedGraph {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn step(&self, id: &StepId) -> Option<&StepDefinition> {
        self.index.get(id).map(|i| &self.steps[*i])
    }

    /// Execution plan: steps within a level run concurrently, levels run in
    /// order behind a dependency barrier.
    pub fn levels(&self) -> &[Vec<StepId>] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The step whose result is the run's output: the sole member of the
    /// final level. `None` if the final level is empty or ambiguous.
    pub fn terminal_step(&self) -> Option<&StepId> {
        match self.levels.last().map(Vec::as_slice) {
            Some([only]) => Some(only),
            _ => None,
        }
    }

    /// The level a step is assigned to.
    pub fn level_of(&self, id: &StepId) -> Option<usize> {
        self.levels.iter().position(|level| level.contains(id))
    }
}

impl std::fmt::Debug for CommittedGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommittedGraph")
            .field("name", &self.name)
            .field("steps", &self.steps.len())
            .field("levels", &self.levels)
            .finish()
    }
}
