// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::checkpoint::CheckpointCadence;
use crate::infra::paths;
use crate::provider::ProviderKind;
use crate::stages::MissingPredicate;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub generator: GeneratorConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub provider: ProviderKind,
    /// Overrides the provider's default endpoint (e.g. a tunnelled Ollama).
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Environment variable holding the API key. Defaults per provider.
    pub api_key_env: Option<String>,
    pub timeout_seconds: u64,
    pub temperature: f32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Ollama,
            base_url: None,
            api_key: None,
            api_key_env: None,
            timeout_seconds: 30,
            temperature: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Generator calls in flight per stage. 1 = strictly sequential.
    pub concurrency: usize,
    /// Only test the first N vocabulary entries (source order).
    pub top_n: Option<usize>,
    pub missing_predicate: MissingPredicate,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            top_n: None,
            missing_predicate: MissingPredicate::RetainAll,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    pub interval: u64,
    pub cadence: CheckpointCadence,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: paths::default_checkpoint_dir(),
            interval: 300,
            cadence: CheckpointCadence::Processed,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub enabled: bool,
    pub pushover_api_token: Option<String>,
    pub pushover_user_key: Option<String>,
}

impl Config {
    /// Load config from the default location, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        match paths::config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Fill unset credentials from the process environment.
    pub fn resolve_credentials(&mut self) {
        self.resolve_credentials_with(|key| std::env::var(key).ok());
    }

    /// Fill unset credentials through `lookup`. Called once at startup so the
    /// rest of the program never touches the environment.
    pub fn resolve_credentials_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.generator.api_key.is_none() {
            let var = self
                .generator
                .api_key_env
                .clone()
                .or_else(|| self.generator.provider.default_key_env().map(String::from));
            if let Some(var) = var {
                self.generator.api_key = lookup(&var).filter(|k| !k.is_empty());
            }
        }
        if self.notify.pushover_api_token.is_none() {
            self.notify.pushover_api_token = lookup("PUSHOVER_API_TOKEN");
        }
        if self.notify.pushover_user_key.is_none() {
            self.notify.pushover_user_key = lookup("PUSHOVER_USER_KEY");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_reasonable() {
        let c = Config::default();
        assert_eq!(c.generator.provider, ProviderKind::Ollama);
        assert_eq!(c.generator.timeout_seconds, 30);
        assert_eq!(c.generator.temperature, 0.0);
        assert_eq!(c.pipeline.concurrency, 1);
        assert!(c.pipeline.top_n.is_none());
        assert_eq!(c.pipeline.missing_predicate, MissingPredicate::RetainAll);
        assert!(c.checkpoint.enabled);
        assert_eq!(c.checkpoint.interval, 300);
        assert_eq!(c.checkpoint.cadence, CheckpointCadence::Processed);
        assert!(!c.notify.enabled);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.checkpoint.interval, 300);
        assert_eq!(config.generator.timeout_seconds, 30);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[generator]
provider = "deepseek"
timeout_seconds = 60
temperature = 0.0

[pipeline]
concurrency = 8
top_n = 1000
missing_predicate = "reject"

[checkpoint]
enabled = false
dir = "runs/partial"
interval = 500
cadence = "token-id"

[notify]
enabled = true
pushover_user_key = "u-123"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.generator.provider, ProviderKind::DeepSeek);
        assert_eq!(config.generator.timeout_seconds, 60);
        assert_eq!(config.pipeline.concurrency, 8);
        assert_eq!(config.pipeline.top_n, Some(1000));
        assert_eq!(config.pipeline.missing_predicate, MissingPredicate::Reject);
        assert!(!config.checkpoint.enabled);
        assert_eq!(config.checkpoint.dir, PathBuf::from("runs/partial"));
        assert_eq!(config.checkpoint.cadence, CheckpointCadence::TokenId);
        assert!(config.notify.enabled);
        assert_eq!(config.notify.pushover_user_key.as_deref(), Some("u-123"));
        assert!(config.notify.pushover_api_token.is_none());
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: Config = toml::from_str("[checkpoint]\ninterval = 10\n").unwrap();
        assert_eq!(config.checkpoint.interval, 10);
        assert!(config.checkpoint.enabled);
        assert_eq!(config.checkpoint.dir, paths::default_checkpoint_dir());
    }

    #[test]
    fn test_parse_openai_compatible_provider() {
        let toml_str = r#"
[generator]
provider = "openai-compatible"
base_url = "http://gpu-box:8000/v1"
api_key_env = "MY_KEY"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.generator.provider, ProviderKind::OpenAICompatible);
        assert_eq!(
            config.generator.base_url.as_deref(),
            Some("http://gpu-box:8000/v1")
        );
    }

    #[test]
    fn test_resolve_credentials_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-test"),
            ("PUSHOVER_API_TOKEN", "tok"),
            ("PUSHOVER_USER_KEY", "usr"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.generator.provider = ProviderKind::OpenAI;
        config.resolve_credentials_with(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.generator.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.notify.pushover_api_token.as_deref(), Some("tok"));
        assert_eq!(config.notify.pushover_user_key.as_deref(), Some("usr"));
    }

    #[test]
    fn test_resolve_credentials_keeps_explicit_values() {
        let mut config = Config::default();
        config.generator.provider = ProviderKind::OpenAI;
        config.generator.api_key = Some("from-file".into());
        config.resolve_credentials_with(|_| Some("from-env".into()));
        assert_eq!(config.generator.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_resolve_credentials_custom_env_name() {
        let mut config = Config::default();
        config.generator.api_key_env = Some("MY_KEY".into());
        config.resolve_credentials_with(|k| (k == "MY_KEY").then(|| "abc".to_string()));
        assert_eq!(config.generator.api_key.as_deref(), Some("abc"));
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let mut config = Config::default();
        config.resolve_credentials_with(|_| None);
        assert!(config.generator.api_key.is_none());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.checkpoint.interval, config.checkpoint.interval);
        assert_eq!(deserialized.generator.provider, config.generator.provider);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }
}
