use thiserror::Error;

#[derive(Debug, Error)]
pub enum DigestError {
    // Graph definition errors — programmer errors, fatal before commit,
    // impossible at run time once a graph is committed.
    #[error("Duplicate step id: {0}")]
    DuplicateStepId(String),

    #[error("Step '{step}' depends on unknown step '{dependency}'")]
    UnknownDependency { step: String, dependency: String },

    #[error("Cyclic dependency among steps: {0}")]
    CyclicDependency(String),

    #[error("Graph already committed")]
    GraphAlreadyCommitted,

    // Run errors
    #[error("Step '{step}' failed: {message}")]
    StepExecution { step: String, message: String },

    #[error("Step '{step}' timed out after {timeout_secs}s")]
    StepTimeout { step: String, timeout_secs: u64 },

    #[error("Run '{invocation}' failed at steps {failed_steps:?}: {cause}")]
    RunFailed {
        invocation: String,
        failed_steps: Vec<String>,
        cause: String,
    },

    #[error("Result for step '{0}' already recorded")]
    DuplicateResult(String),

    #[error("Run cancelled")]
    Cancelled,

    // LLM errors
    #[error("LLM request failed: {0}")]
    LlmRequest(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DigestError>;
