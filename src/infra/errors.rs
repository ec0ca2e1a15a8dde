// src/infra/errors.rs — Error types for glitchscan

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::predicate::PredicateError;

#[derive(Error, Debug)]
pub enum GlitchError {
    // Input errors (fatal, raised before any stage runs)
    #[error("Unsupported or malformed vocabulary '{}': {message}", path.display())]
    Format { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid predicate for stage {stage}: {source}")]
    Predicate {
        stage: usize,
        #[source]
        source: PredicateError,
    },

    // Generator errors (converted to sentinel responses by the pipeline)
    #[error("Provider '{provider}' error: {message}")]
    Provider { provider: String, message: String },

    #[error("Provider '{provider}' timed out after {}s", after.as_secs())]
    Timeout { provider: String, after: Duration },

    // Infra
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GlitchError {
    pub fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        GlitchError::Format {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        GlitchError::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}
