use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::SessionKey;

/// Request sent to an external agent capability.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    /// Natural-language instruction for this call.
    pub instruction: String,
    /// Scopes the capability's conversational memory.
    pub session_key: SessionKey,
    /// Bound on the capability's internal tool-use steps.
    pub max_internal_steps: u32,
}

/// Response from an external agent capability.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub text: String,
}

/// External agent capability — an opaque LLM-backed collaborator.
///
/// Both the fetch agent and the summarize agent are instances of this
/// trait. Internal retries and tool use are the capability's own business;
/// the workflow core only sees the request/response contract.
pub trait AgentCapability: Send + Sync + 'static {
    /// Capability name, for logging.
    fn name(&self) -> &str;

    /// Send one instruction and receive the text response.
    fn generate(&self, request: AgentRequest) -> BoxFuture<'_, Result<AgentResponse>>;
}
