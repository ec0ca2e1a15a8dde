// src/provider/resolver.rs — Build a generator from configuration

use std::sync::Arc;

use super::ollama::OllamaGenerator;
use super::openai_compat::OpenAICompatGenerator;
use super::{ProviderKind, ResponseGenerator};
use crate::infra::config::GeneratorConfig;
use crate::infra::errors::GlitchError;

/// Resolve the base URL for a provider: explicit config wins, then the
/// provider's well-known endpoint.
pub fn resolve_base_url(config: &GeneratorConfig) -> Result<String, GlitchError> {
    let raw = match (&config.base_url, config.provider.default_base_url()) {
        (Some(url), _) => url.clone(),
        (None, Some(default)) => default.to_string(),
        (None, None) => {
            return Err(GlitchError::Config(format!(
                "provider '{}' needs generator.base_url",
                config.provider
            )))
        }
    };

    let parsed = url::Url::parse(&raw)
        .map_err(|e| GlitchError::Config(format!("invalid base_url '{raw}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(GlitchError::Config(format!(
            "base_url '{raw}' must use http or https"
        )));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

/// Instantiate the configured generator. Credentials must already be resolved
/// into `config.api_key` (see `Config::resolve_credentials`).
pub fn build_generator(
    config: &GeneratorConfig,
) -> Result<Arc<dyn ResponseGenerator>, GlitchError> {
    let base_url = resolve_base_url(config)?;

    let generator: Arc<dyn ResponseGenerator> = match config.provider {
        ProviderKind::Ollama => Arc::new(OllamaGenerator::new(Some(base_url))),
        ProviderKind::OpenAI | ProviderKind::DeepSeek => {
            let key = config.api_key.clone().ok_or_else(|| {
                GlitchError::Config(format!(
                    "provider '{}' needs an API key. Set {} or generator.api_key",
                    config.provider,
                    config
                        .api_key_env
                        .as_deref()
                        .or(config.provider.default_key_env())
                        .unwrap_or("generator.api_key_env"),
                ))
            })?;
            Arc::new(OpenAICompatGenerator::new(config.provider.as_str(), key, base_url))
        }
        // Local compatible servers often run without auth.
        ProviderKind::OpenAICompatible => Arc::new(OpenAICompatGenerator::new(
            config.provider.as_str(),
            config.api_key.clone().unwrap_or_default(),
            base_url,
        )),
    };

    tracing::debug!("Using provider {}", generator.id());
    Ok(generator)
}
