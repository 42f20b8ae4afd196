use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DigestError, Result};

/// Top-level reldigest configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    /// Target services, in report order.
    #[serde(default = "default_services")]
    pub services: Vec<ServiceConfig>,
    #[serde(default)]
    pub cron: Option<CronConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    pub model_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Per-step bound on external capability calls. An unresponsive call
    /// must not block the level barrier indefinitely.
    #[serde(default = "default_step_timeout")]
    pub step_timeout_secs: u64,
    /// Bound on each capability's internal tool-use steps.
    #[serde(default = "default_max_internal_steps")]
    pub max_internal_steps: u32,
    /// Trailing window, in days, that the report covers.
    #[serde(default = "default_report_window")]
    pub report_window_days: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            step_timeout_secs: default_step_timeout(),
            max_internal_steps: default_max_internal_steps(),
            report_window_days: default_report_window(),
        }
    }
}

/// One target service: `id` becomes the fetch step's id and must be unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub id: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronConfig {
    /// Cron expression for scheduled digest runs.
    pub schedule: String,
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_temperature() -> f32 {
    0.7
}

fn default_step_timeout() -> u64 {
    120
}

fn default_max_internal_steps() -> u32 {
    10
}

fn default_report_window() -> u32 {
    7
}

fn default_services() -> Vec<ServiceConfig> {
    vec![
        ServiceConfig {
            id: "releaseFetchCline".to_string(),
            name: "Cline".to_string(),
            url: "https://github.com/cline/cline/releases".to_string(),
        },
        ServiceConfig {
            id: "releaseFetchRooCode".to_string(),
            name: "Roo Code".to_string(),
            url: "https://github.com/RooVetGit/Roo-Code/releases".to_string(),
        },
    ]
}

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| DigestError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        toml::from_str(&expanded).map_err(|e| DigestError::Config(e.to_string()))
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}
