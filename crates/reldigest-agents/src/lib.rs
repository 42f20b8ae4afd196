//! LLM-backed agent capabilities and the release-digest workflow assembly.

pub mod fetch;
pub mod llm;
pub mod prompts;
pub mod registry;
pub mod summarize;
pub mod workflow;

pub use fetch::FetchStep;
pub use llm::GeminiAgent;
pub use registry::{ServiceRegistry, SUMMARIZE_STEP_ID};
pub use summarize::SummarizeStep;
pub use workflow::build_digest_workflow;
