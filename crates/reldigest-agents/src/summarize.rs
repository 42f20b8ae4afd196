use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::info;

use reldigest_core::error::{DigestError, Result};
use reldigest_core::traits::{AgentCapability, AgentRequest};
use reldigest_core::types::StepId;
use reldigest_workflow::step::{StepContext, StepExec};

/// Aggregation step: joins all fetch results and asks the summarize-agent
/// capability for the consolidated report.
///
/// Results are joined in registry order — never map iteration order — so
/// the aggregated input is deterministic regardless of which fetch step
/// happened to finish first. The scheduler guarantees every dependency has
/// exactly one recorded result before this step runs.
pub struct SummarizeStep {
    order: Vec<StepId>,
    agent: Arc<dyn AgentCapability>,
    max_internal_steps: u32,
}

impl SummarizeStep {
    pub fn new(order: Vec<StepId>, agent: Arc<dyn AgentCapability>, max_internal_steps: u32) -> Self {
        Self {
            order,
            agent,
            max_internal_steps,
        }
    }

    fn joined_input(&self, ctx: &StepContext) -> Result<String> {
        let mut parts = Vec::with_capacity(self.order.len());
        for id in &self.order {
            let text = ctx.prior(id).ok_or_else(|| DigestError::StepExecution {
                step: ctx.step_id.to_string(),
                message: format!("Missing fetch result for '{}'", id),
            })?;
            parts.push(text);
        }
        Ok(parts.join("\n\n"))
    }
}

impl StepExec for SummarizeStep {
    fn execute(&self, ctx: StepContext) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let joined = self.joined_input(&ctx)?;
            info!(
                step = %ctx.step_id,
                sources = self.order.len(),
                input_bytes = joined.len(),
                "Summarizing release notes"
            );

            let response = self
                .agent
                .generate(AgentRequest {
                    instruction: format!(
                        "Summarize the following release information.\n\n{}",
                        joined
                    ),
                    session_key: ctx.session_key(),
                    max_internal_steps: self.max_internal_steps,
                })
                .await?;

            Ok(response.text)
        })
    }
}
