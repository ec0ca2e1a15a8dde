// src/provider/openai_compat.rs — OpenAI-compatible chat completions generator
//
// One implementation serves OpenAI, DeepSeek and any endpoint speaking the
// `/chat/completions` protocol. Only the id, base URL and key differ.

use async_trait::async_trait;
use std::time::Duration;

use super::{GenerateRequest, ResponseGenerator};
use crate::infra::errors::GlitchError;

/// Probe timeout for the models endpoint.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct OpenAICompatGenerator {
    id_str: String,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAICompatGenerator {
    pub fn new(id: impl Into<String>, api_key: String, base_url: String) -> Self {
        Self {
            id_str: id.into(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn user_agent() -> String {
        format!("glitchscan/{}", env!("CARGO_PKG_VERSION"))
    }

    fn request_error(&self, e: reqwest::Error, after: Duration) -> GlitchError {
        if e.is_timeout() {
            GlitchError::Timeout {
                provider: self.id_str.clone(),
                after,
            }
        } else {
            GlitchError::provider(&self.id_str, e.to_string())
        }
    }

    /// Model ids listed by `GET {base}/models`.
    pub async fn list_models(&self) -> Result<Vec<String>, GlitchError> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("User-Agent", Self::user_agent())
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                GlitchError::provider(&self.id_str, format!("Failed to probe /models: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GlitchError::provider(
                &self.id_str,
                format!("/models returned HTTP {status}: {body}"),
            ));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            GlitchError::provider(&self.id_str, format!("Failed to parse /models response: {e}"))
        })?;

        Ok(parse_model_ids(&body))
    }
}

/// `{"data": [{"id": "..."}, ...]}` -> ids.
fn parse_model_ids(body: &serde_json::Value) -> Vec<String> {
    body["data"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|m| m["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn build_body(request: &GenerateRequest) -> serde_json::Value {
    let mut messages = Vec::with_capacity(2);
    if !request.system.is_empty() {
        messages.push(serde_json::json!({"role": "system", "content": request.system}));
    }
    messages.push(serde_json::json!({"role": "user", "content": request.prompt}));

    serde_json::json!({
        "model": request.model,
        "messages": messages,
        "temperature": request.temperature,
        "stream": false,
    })
}

fn extract_content(resp: &serde_json::Value) -> Option<String> {
    resp["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl ResponseGenerator for OpenAICompatGenerator {
    fn id(&self) -> &str {
        &self.id_str
    }

    async fn probe(&self, model: &str) -> Result<(), GlitchError> {
        let models = self.list_models().await?;
        // Some compatible servers return an empty list; only a listed miss is fatal.
        if models.is_empty() || models.iter().any(|m| m == model) {
            Ok(())
        } else {
            Err(GlitchError::provider(
                &self.id_str,
                format!("model '{model}' is not offered by {}", self.base_url),
            ))
        }
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, GlitchError> {
        let body = build_body(&request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("User-Agent", Self::user_agent())
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(e, request.timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(GlitchError::provider(
                &self.id_str,
                format!("HTTP {status}: {error_body}"),
            ));
        }

        let resp: serde_json::Value = response
            .json()
            .await
            .map_err(|e| self.request_error(e, request.timeout))?;

        extract_content(&resp).ok_or_else(|| {
            GlitchError::provider(&self.id_str, "response has no choices[0].message.content")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_includes_system_and_user() {
        let req = GenerateRequest::new("gpt-4o-mini", "Repeat 'x'", "Be exact.");
        let body = build_body(&req);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "Be exact.");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Repeat 'x'");
        assert_eq!(body["temperature"], 0.0);
    }

    #[test]
    fn test_body_omits_empty_system() {
        let body = build_body(&GenerateRequest::new("m", "p", ""));
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
    }

    #[test]
    fn test_extract_content() {
        let resp = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "x"}}]
        });
        assert_eq!(extract_content(&resp).as_deref(), Some("x"));
        assert!(extract_content(&serde_json::json!({"choices": []})).is_none());
    }

    #[test]
    fn test_parse_model_ids() {
        let body =
            serde_json::json!({"data": [{"id": "deepseek-chat"}, {"id": "deepseek-reasoner"}]});
        assert_eq!(parse_model_ids(&body), vec!["deepseek-chat", "deepseek-reasoner"]);
        assert!(parse_model_ids(&serde_json::json!({})).is_empty());
    }

    #[test]
    fn test_id_and_base_url() {
        let g =
            OpenAICompatGenerator::new("deepseek", "k".into(), "https://api.deepseek.com/".into());
        assert_eq!(g.id(), "deepseek");
        assert_eq!(g.base_url(), "https://api.deepseek.com");
    }
}
