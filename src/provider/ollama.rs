// src/provider/ollama.rs — Ollama local model generator

use async_trait::async_trait;
use std::time::Duration;

use super::{GenerateRequest, ResponseGenerator};
use crate::infra::errors::GlitchError;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

pub struct OllamaGenerator {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| "http://localhost:11434".into());
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Names of the models the server has pulled.
    pub async fn list_models(&self) -> Result<Vec<String>, GlitchError> {
        let resp = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| GlitchError::provider("ollama", format!("Cannot reach Ollama: {e}")))?;

        let body: serde_json::Value = resp.json().await.map_err(|e| {
            GlitchError::provider("ollama", format!("Invalid Ollama response: {e}"))
        })?;

        Ok(body["models"]
            .as_array()
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m["name"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl Default for OllamaGenerator {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Ollama reports untagged models as `name:latest`.
pub fn model_available(models: &[String], wanted: &str) -> bool {
    models.iter().any(|m| {
        m == wanted || (!wanted.contains(':') && m.strip_suffix(":latest") == Some(wanted))
    })
}

fn request_error(e: reqwest::Error, after: Duration) -> GlitchError {
    if e.is_timeout() {
        GlitchError::Timeout {
            provider: "ollama".into(),
            after,
        }
    } else {
        GlitchError::provider("ollama", e.to_string())
    }
}

#[async_trait]
impl ResponseGenerator for OllamaGenerator {
    fn id(&self) -> &str {
        "ollama"
    }

    async fn probe(&self, model: &str) -> Result<(), GlitchError> {
        let models = self.list_models().await?;
        if model_available(&models, model) {
            tracing::debug!("Ollama at {} serves {model}", self.base_url);
            Ok(())
        } else {
            Err(GlitchError::provider(
                "ollama",
                format!(
                    "model '{model}' is not available at {} (have: {}). Try `ollama pull {model}`",
                    self.base_url,
                    models.join(", ")
                ),
            ))
        }
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, GlitchError> {
        let body = serde_json::json!({
            "model": request.model,
            "system": request.system,
            "prompt": request.prompt,
            "stream": false,
            "options": { "temperature": request.temperature },
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(e, request.timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(GlitchError::provider(
                "ollama",
                format!("HTTP {status}: {error_body}"),
            ));
        }

        let resp: serde_json::Value = response
            .json()
            .await
            .map_err(|e| request_error(e, request.timeout))?;

        extract_response(&resp)
    }
}

/// Pull the answer out of a `/api/generate` body. An empty answer counts as a failure.
fn extract_response(resp: &serde_json::Value) -> Result<String, GlitchError> {
    match resp["response"].as_str() {
        Some("") => Err(GlitchError::provider("ollama", "empty response")),
        Some(text) => Ok(text.to_string()),
        None => Err(GlitchError::provider("ollama", "response has no `response` field")),
    }
}
