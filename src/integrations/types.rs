// src/integrations/types.rs — Notification sink trait

use async_trait::async_trait;

/// Remote status updates for long runs. Delivery is best effort: callers log
/// failures and carry on.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, message: &str) -> anyhow::Result<()>;
}

/// Used when notifications are disabled or credentials are absent.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    fn name(&self) -> &str {
        "none"
    }

    async fn notify(&self, message: &str) -> anyhow::Result<()> {
        tracing::trace!("notification suppressed: {message}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_always_succeeds() {
        assert!(NoopNotifier.notify("hello").await.is_ok());
        assert_eq!(NoopNotifier.name(), "none");
    }
}
