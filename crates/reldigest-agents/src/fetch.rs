use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::info;

use reldigest_core::error::Result;
use reldigest_core::traits::{AgentCapability, AgentRequest};
use reldigest_core::types::ServiceDescriptor;
use reldigest_workflow::step::{StepContext, StepExec};

/// Fetch step for one registered service.
///
/// Builds a natural-language instruction around the service's source
/// locator and hands it to the fetch-agent capability under this step's
/// session key. The capability's text response is returned verbatim —
/// content correctness is entirely the capability's responsibility.
pub struct FetchStep {
    service: ServiceDescriptor,
    agent: Arc<dyn AgentCapability>,
    max_internal_steps: u32,
}

impl FetchStep {
    pub fn new(
        service: ServiceDescriptor,
        agent: Arc<dyn AgentCapability>,
        max_internal_steps: u32,
    ) -> Self {
        Self {
            service,
            agent,
            max_internal_steps,
        }
    }

    fn instruction(&self) -> String {
        format!(
            "Fetch the release information for {} from {}.",
            self.service.display_name, self.service.source_locator
        )
    }
}

impl StepExec for FetchStep {
    fn execute(&self, ctx: StepContext) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            info!(
                step = %ctx.step_id,
                service = %self.service.display_name,
                url = %self.service.source_locator,
                "Fetching release notes"
            );

            let response = self
                .agent
                .generate(AgentRequest {
                    instruction: self.instruction(),
                    session_key: ctx.session_key(),
                    max_internal_steps: self.max_internal_steps,
                })
                .await?;

            Ok(response.text)
        })
    }
}
