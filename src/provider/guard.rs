// src/provider/guard.rs — Deadline and failure guard around a generator
//
// Wraps any ResponseGenerator so that a call always resolves to an Outcome:
//   - the provider answers          -> Text, recorded as is
//   - the deadline passes           -> Timeout, recorded as "timeout"
//   - the provider errors or panics -> Failed, recorded as "ERROR occurred: <message>"
// There is no retry. Each call is attempted exactly once.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use super::{GenerateRequest, ResponseGenerator};
use crate::infra::errors::GlitchError;

/// Response recorded when a call overruns its deadline.
pub const TIMEOUT_SENTINEL: &str = "timeout";

/// Prefix of the response recorded when a call fails.
pub const ERROR_SENTINEL_PREFIX: &str = "ERROR occurred: ";

pub fn error_sentinel(message: impl std::fmt::Display) -> String {
    format!("{ERROR_SENTINEL_PREFIX}{message}")
}

/// Result of one guarded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Text(String),
    Timeout,
    Failed(String),
}

impl Outcome {
    /// The string stored in the result table and matched by the predicate.
    pub fn into_text(self) -> String {
        match self {
            Outcome::Text(text) => text,
            Outcome::Timeout => TIMEOUT_SENTINEL.to_string(),
            Outcome::Failed(message) => error_sentinel(message),
        }
    }
}

/// A generator wrapper whose calls cannot fail or hang.
#[derive(Clone)]
pub struct GuardedGenerator {
    inner: Arc<dyn ResponseGenerator>,
}

impl GuardedGenerator {
    pub fn new(inner: Arc<dyn ResponseGenerator>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Arc<dyn ResponseGenerator> {
        &self.inner
    }

    /// Run one call, bounded by `request.timeout`.
    pub async fn respond(&self, request: GenerateRequest) -> Outcome {
        let deadline = request.timeout;
        let call = AssertUnwindSafe(self.inner.generate(request)).catch_unwind();

        match tokio::time::timeout(deadline, call).await {
            Ok(Ok(Ok(text))) => Outcome::Text(text),
            Ok(Ok(Err(GlitchError::Timeout { .. }))) | Err(_) => {
                tracing::warn!(
                    provider = self.inner.id(),
                    "No response within {}s",
                    deadline.as_secs_f32()
                );
                Outcome::Timeout
            }
            Ok(Ok(Err(e))) => {
                tracing::warn!(provider = self.inner.id(), "Generator call failed: {e}");
                Outcome::Failed(e.to_string())
            }
            Ok(Err(panic)) => {
                let message = panic_message(panic.as_ref());
                tracing::warn!(provider = self.inner.id(), "Generator panicked: {message}");
                Outcome::Failed(message)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "generator panicked".to_string()
    }
}
