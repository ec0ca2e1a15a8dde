// src/provider/mod.rs — Response generator layer

pub mod guard;
pub mod ollama;
pub mod openai_compat;
pub mod resolver;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::infra::errors::GlitchError;

pub use guard::{GuardedGenerator, Outcome, ERROR_SENTINEL_PREFIX, TIMEOUT_SENTINEL};

/// Core trait that all response generators implement.
///
/// `generate` may fail or overrun its deadline; the pipeline only ever talks
/// to a generator through [`GuardedGenerator`], which turns both into
/// sentinel strings.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    fn id(&self) -> &str;

    /// Startup check that the endpoint answers and the model exists.
    async fn probe(&self, _model: &str) -> Result<(), GlitchError> {
        Ok(())
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, GlitchError>;
}

/// One single-turn request: a system instruction plus a user prompt.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub system: String,
    pub temperature: f32,
    /// Per-call deadline. Implementations should give up by then.
    pub timeout: Duration,
}

impl GenerateRequest {
    pub fn new(
        model: impl Into<String>,
        prompt: impl Into<String>,
        system: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: system.into(),
            temperature: 0.0,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Which backend serves the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProviderKind {
    #[default]
    #[serde(rename = "ollama")]
    Ollama,
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "openai-compatible")]
    OpenAICompatible,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::OpenAI => "openai",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::OpenAICompatible => "openai-compatible",
        }
    }

    pub fn default_base_url(self) -> Option<&'static str> {
        match self {
            ProviderKind::Ollama => Some("http://localhost:11434"),
            ProviderKind::OpenAI => Some("https://api.openai.com/v1"),
            ProviderKind::DeepSeek => Some("https://api.deepseek.com"),
            ProviderKind::OpenAICompatible => None,
        }
    }

    /// Environment variable consulted for the API key when none is configured.
    pub fn default_key_env(self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAI => Some("OPENAI_API_KEY"),
            ProviderKind::DeepSeek => Some("DEEPSEEK_API_KEY"),
            ProviderKind::Ollama | ProviderKind::OpenAICompatible => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "openai" => Ok(ProviderKind::OpenAI),
            "deepseek" => Ok(ProviderKind::DeepSeek),
            "openai-compatible" | "openai_compatible" | "compat" => {
                Ok(ProviderKind::OpenAICompatible)
            }
            other => Err(format!(
                "unknown provider '{other}'. Options: ollama, openai, deepseek, openai-compatible"
            )),
        }
    }
}
