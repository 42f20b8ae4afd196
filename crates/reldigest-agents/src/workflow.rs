use std::sync::Arc;

use reldigest_core::config::WorkflowConfig;
use reldigest_core::error::{DigestError, Result};
use reldigest_core::traits::AgentCapability;
use reldigest_workflow::graph::{CommittedGraph, WorkflowBuilder};
use reldigest_workflow::step::{StepDefinition, StepExec};

use crate::fetch::FetchStep;
use crate::registry::{ServiceRegistry, SUMMARIZE_STEP_ID};
use crate::summarize::SummarizeStep;

/// Assemble and commit the release-digest workflow: one fetch step per
/// registered service fanned out at level 0, one summarize step fanned in
/// behind them. The committed graph is reusable across runs.
pub fn build_digest_workflow(
    registry: &ServiceRegistry,
    fetch_agent: Arc<dyn AgentCapability>,
    summarize_agent: Arc<dyn AgentCapability>,
    config: &WorkflowConfig,
) -> Result<CommittedGraph> {
    if registry.is_empty() {
        return Err(DigestError::Config(
            "At least one service must be registered".to_string(),
        ));
    }

    let mut builder = WorkflowBuilder::new("release-digest");

    let fetch_steps = registry
        .list()
        .iter()
        .map(|service| {
            let exec: Arc<dyn StepExec> = Arc::new(FetchStep::new(
                service.clone(),
                fetch_agent.clone(),
                config.max_internal_steps,
            ));
            StepDefinition::new(service.step_id.clone(), exec)
        })
        .collect();
    builder.add_parallel(fetch_steps)?;

    let summarize: Arc<dyn StepExec> = Arc::new(SummarizeStep::new(
        registry.step_ids(),
        summarize_agent,
        config.max_internal_steps,
    ));
    builder.then(
        StepDefinition::new(SUMMARIZE_STEP_ID, summarize),
        registry.step_ids(),
    )?;

    builder.commit()
}
