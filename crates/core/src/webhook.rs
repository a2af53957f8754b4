//! Webhook-backed notification dispatcher.
//!
//! Default delivery collaborator: posts the event as JSON to the
//! channel endpoint, signing the body when the channel carries a
//! secret. Any transport error, timeout, or non-success status is a
//! failed delivery — the caller retries on a later tick.

use async_trait::async_trait;
use chrono::Utc;
use rankvote_common::NotifyConfig;
use rankvote_store::ChannelLink;
use serde::Serialize;
use sha2::Sha256;

use crate::notify::{EventKind, EventPayload, NotificationDispatcher};

/// Body posted to the channel endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookBody<'a> {
    event: &'a str,
    timestamp: String,
    data: &'a EventPayload,
}

/// Webhook dispatcher.
#[derive(Clone)]
pub struct WebhookDispatcher {
    http_client: reqwest::Client,
}

impl WebhookDispatcher {
    /// Create a dispatcher with the configured per-attempt timeout.
    #[must_use]
    #[allow(clippy::expect_used)] // Client build only fails with incompatible TLS settings
    pub fn new(config: &NotifyConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.delivery_timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self { http_client }
    }

    #[allow(clippy::expect_used)] // HMAC accepts any key size, this cannot fail
    fn sign_payload(payload: &str, secret: &str) -> String {
        use hmac::{Hmac, Mac};

        type HmacSha256 = Hmac<Sha256>;

        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
        mac.update(payload.as_bytes());
        let result = mac.finalize();

        format!("sha256={}", hex::encode(result.into_bytes()))
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookDispatcher {
    async fn dispatch(
        &self,
        channel: &ChannelLink,
        kind: EventKind,
        payload: &EventPayload,
    ) -> bool {
        let body = WebhookBody {
            event: kind.as_str(),
            timestamp: Utc::now().to_rfc3339(),
            data: payload,
        };
        let Ok(body_json) = serde_json::to_string(&body) else {
            tracing::error!(event = %kind, "Failed to serialize webhook body");
            return false;
        };

        let mut request = self
            .http_client
            .post(&channel.endpoint)
            .header("Content-Type", "application/json")
            .header("User-Agent", "Rankvote-Webhook/1.0");

        if let Some(ref secret) = channel.secret {
            request = request.header("X-Rankvote-Signature", Self::sign_payload(&body_json, secret));
        }

        match request.body(body_json).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(
                    endpoint = %channel.endpoint,
                    event = %kind,
                    "Webhook delivered"
                );
                true
            }
            Ok(response) => {
                tracing::warn!(
                    endpoint = %channel.endpoint,
                    event = %kind,
                    status = %response.status(),
                    "Webhook rejected"
                );
                false
            }
            Err(e) => {
                tracing::warn!(
                    endpoint = %channel.endpoint,
                    event = %kind,
                    error = %e,
                    "Webhook delivery failed"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_stable() {
        let a = WebhookDispatcher::sign_payload("{\"event\":\"vote_closed\"}", "secret");
        let b = WebhookDispatcher::sign_payload("{\"event\":\"vote_closed\"}", "secret");
        assert_eq!(a, b);
        assert!(a.starts_with("sha256="));
    }

    #[test]
    fn test_signature_depends_on_secret() {
        let a = WebhookDispatcher::sign_payload("body", "secret-a");
        let b = WebhookDispatcher::sign_payload("body", "secret-b");
        assert_ne!(a, b);
    }
}
