use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use reldigest_core::config::ModelConfig;
use reldigest_core::error::{DigestError, Result};
use reldigest_core::traits::{AgentCapability, AgentRequest, AgentResponse};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini backed agent capability.
///
/// One instance per agent role (fetch, summarize), each with its own
/// standing instructions sent as the system instruction on every call.
pub struct GeminiAgent {
    name: String,
    instructions: String,
    model: ModelConfig,
    http: Client,
}

impl GeminiAgent {
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        model: ModelConfig,
    ) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            model,
            http: Client::new(),
        }
    }
}

// ── Request types ────────────────────────────────────────────────

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize, Debug)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize, Debug)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

// ── Response types ───────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize, Debug)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

impl AgentCapability for GeminiAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, request: AgentRequest) -> BoxFuture<'_, Result<AgentResponse>> {
        Box::pin(async move {
            let api_key = self
                .model
                .api_key
                .as_deref()
                .ok_or_else(|| DigestError::Config("Gemini: api_key is required".into()))?;

            let base = self.model.base_url.as_deref().unwrap_or(GEMINI_BASE_URL);
            let url = format!(
                "{}/models/{}:generateContent?key={}",
                base, self.model.model_id, api_key
            );

            let body = GeminiRequest {
                contents: vec![GeminiContent {
                    role: Some("user".to_string()),
                    parts: vec![GeminiPart {
                        text: request.instruction,
                    }],
                }],
                system_instruction: Some(GeminiContent {
                    role: None,
                    parts: vec![GeminiPart {
                        text: self.instructions.clone(),
                    }],
                }),
                generation_config: Some(GenerationConfig {
                    max_output_tokens: Some(self.model.max_tokens),
                    temperature: if self.model.temperature > 0.0 {
                        Some(self.model.temperature)
                    } else {
                        None
                    },
                }),
            };

            debug!(
                agent = %self.name,
                session_key = %request.session_key,
                max_internal_steps = request.max_internal_steps,
                "Dispatching agent request"
            );

            let response = self
                .http
                .post(&url)
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
                .map_err(|e| DigestError::LlmRequest(e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unknown".to_string());
                return Err(DigestError::LlmRequest(format!("HTTP {}: {}", status, body)));
            }

            let parsed: GeminiResponse = response
                .json()
                .await
                .map_err(|e| DigestError::LlmRequest(e.to_string()))?;

            let text = parsed
                .candidates
                .into_iter()
                .next()
                .and_then(|c| c.content)
                .map(|content| {
                    content
                        .parts
                        .into_iter()
                        .map(|p| p.text)
                        .collect::<Vec<_>>()
                        .join("")
                })
                .ok_or_else(|| {
                    DigestError::LlmRequest("Gemini returned no candidates".to_string())
                })?;

            Ok(AgentResponse { text })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text_extraction() {
        let raw = r#"{
            "candidates": [
                { "content": { "role": "model", "parts": [ { "text": "Hello " }, { "text": "world" } ] } }
            ]
        }"#;
        let parsed: GeminiResponse = serde_json::from_str(raw).unwrap();
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap();
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn test_empty_candidates_parse() {
        let parsed: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.candidates.is_empty());
    }
}
