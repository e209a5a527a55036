//! HTTP scene generator talking to a model endpoint.

use std::time::Duration;

use async_trait::async_trait;
use scenesmith_core::job::GenerationRequest;
use serde::{Deserialize, Serialize};

use crate::config::GeneratorConfig;
use crate::extract::extract_source;
use crate::prompt::{system_prompt, user_prompt};
use crate::{GenerationError, SceneGenerator};

/// Generator backed by an HTTP model endpoint.
pub struct HttpSceneGenerator {
    config: GeneratorConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequestBody<'a> {
    model: &'a str,
    system: &'a str,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponseBody {
    output: String,
}

impl HttpSceneGenerator {
    /// Build a generator from configuration. Fails only when the HTTP
    /// client itself cannot be constructed.
    pub fn new(config: GeneratorConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GenerationError::Transport(format!("Failed to build client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> Result<Self, GenerationError> {
        Self::new(GeneratorConfig::from_env())
    }
}

#[async_trait]
impl SceneGenerator for HttpSceneGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let body = GenerateRequestBody {
            model: &self.config.model,
            system: system_prompt(),
            prompt: user_prompt(request),
        };

        let mut http_request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(key) = &self.config.api_key {
            http_request = http_request.bearer_auth(key);
        }

        tracing::debug!(
            ordinal = request.ordinal,
            model = %self.config.model,
            "Requesting scene generation"
        );

        let response = http_request.send().await.map_err(|e| {
            GenerationError::Transport(format!(
                "Failed to reach generator at {}: {e}",
                self.config.endpoint
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Transport(format!(
                "Generator answered {status}: {text}"
            )));
        }

        let parsed: GenerateResponseBody = response.json().await.map_err(|e| {
            GenerationError::Transport(format!("Generator answered malformed JSON: {e}"))
        })?;

        extract_source(&parsed.output).ok_or_else(|| GenerationError::UnusableOutput {
            detail: "response contained no component source".into(),
            raw_output: parsed.output,
        })
    }
}
