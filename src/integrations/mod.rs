// src/integrations/mod.rs — Notification integrations

pub mod pushover;
pub mod types;

use std::sync::Arc;

use crate::infra::config::NotifyConfig;

pub use pushover::PushoverNotifier;
pub use types::{NoopNotifier, Notifier};

/// Pick the notifier for this run. Disabled or missing credentials yield the no-op sink.
pub fn from_config(config: &NotifyConfig) -> Arc<dyn Notifier> {
    if !config.enabled {
        return Arc::new(NoopNotifier);
    }
    match (&config.pushover_api_token, &config.pushover_user_key) {
        (Some(token), Some(user)) if !token.is_empty() && !user.is_empty() => {
            Arc::new(PushoverNotifier::new(token.clone(), user.clone()))
        }
        _ => {
            tracing::warn!(
                "Notifications enabled but PUSHOVER_API_TOKEN / PUSHOVER_USER_KEY are not set"
            );
            Arc::new(NoopNotifier)
        }
    }
}
