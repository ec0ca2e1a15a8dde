// src/integrations/pushover.rs — Pushover push notifications
//
// Uses the Pushover message API (https://pushover.net/api).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::integrations::types::Notifier;

const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";

pub struct PushoverNotifier {
    client: Client,
    api_token: String,
    user_key: String,
    endpoint: String,
}

#[derive(Deserialize)]
struct PushoverResponse {
    status: i64,
    #[serde(default)]
    errors: Vec<String>,
}

impl PushoverNotifier {
    pub fn new(api_token: String, user_key: String) -> Self {
        Self {
            client: Client::new(),
            api_token,
            user_key,
            endpoint: PUSHOVER_API_URL.to_string(),
        }
    }

    fn form<'a>(&'a self, message: &'a str) -> [(&'static str, &'a str); 3] {
        [
            ("token", self.api_token.as_str()),
            ("user", self.user_key.as_str()),
            ("message", message),
        ]
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    fn name(&self) -> &str {
        "pushover"
    }

    async fn notify(&self, message: &str) -> anyhow::Result<()> {
        let resp = self
            .client
            .post(&self.endpoint)
            .form(&self.form(message))
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await?;

        let status = resp.status();
        let body: PushoverResponse = resp.json().await?;
        if !status.is_success() || body.status != 1 {
            anyhow::bail!(
                "Pushover rejected message (HTTP {status}): {}",
                if body.errors.is_empty() {
                    "unknown".to_string()
                } else {
                    body.errors.join("; ")
                }
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_fields() {
        let n = PushoverNotifier::new("app-token".into(), "user-key".into());
        assert_eq!(
            n.form("hi"),
            [("token", "app-token"), ("user", "user-key"), ("message", "hi")]
        );
        assert_eq!(n.endpoint, PUSHOVER_API_URL);
    }

    #[test]
    fn test_response_parsing() {
        let ok: PushoverResponse =
            serde_json::from_str(r#"{"status":1,"request":"abc"}"#).unwrap();
        assert_eq!(ok.status, 1);
        assert!(ok.errors.is_empty());

        let bad: PushoverResponse =
            serde_json::from_str(r#"{"status":0,"errors":["user key is invalid"]}"#).unwrap();
        assert_eq!(bad.errors, vec!["user key is invalid"]);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_errors() {
        let mut n = PushoverNotifier::new("t".into(), "u".into());
        n.endpoint = "http://127.0.0.1:9/1/messages.json".into();
        assert!(n.notify("x").await.is_err());
    }
}
