use std::collections::HashSet;

use url::Url;

use reldigest_core::config::ServiceConfig;
use reldigest_core::error::{DigestError, Result};
use reldigest_core::types::{ServiceDescriptor, StepId};

/// Step id reserved for the aggregation step.
pub const SUMMARIZE_STEP_ID: &str = "summarize";

/// Fixed ordered list of target services.
///
/// Built once from static configuration. URL well-formedness and step-id
/// uniqueness are validated here, not per call.
#[derive(Debug)]
pub struct ServiceRegistry {
    services: Vec<ServiceDescriptor>,
}

impl ServiceRegistry {
    pub fn from_config(configs: &[ServiceConfig]) -> Result<Self> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut services = Vec::with_capacity(configs.len());

        for config in configs {
            if config.id == SUMMARIZE_STEP_ID {
                return Err(DigestError::Config(format!(
                    "Service id '{}' is reserved for the aggregation step",
                    SUMMARIZE_STEP_ID
                )));
            }
            if !seen.insert(&config.id) {
                return Err(DigestError::DuplicateStepId(config.id.clone()));
            }
            let source_locator = Url::parse(&config.url).map_err(|e| {
                DigestError::Config(format!("Invalid URL for service '{}': {}", config.id, e))
            })?;
            services.push(ServiceDescriptor {
                step_id: StepId::new(&config.id),
                display_name: config.name.clone(),
                source_locator,
            });
        }

        Ok(Self { services })
    }

    /// Registered services, in configuration order.
    pub fn list(&self) -> &[ServiceDescriptor] {
        &self.services
    }

    /// Fetch-step ids, in configuration order.
    pub fn step_ids(&self) -> Vec<StepId> {
        self.services.iter().map(|s| s.step_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
