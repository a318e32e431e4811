//! Report dispatch through an HTTP mail relay

use async_trait::async_trait;
use mia_core::{DeliveryError, Settings};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Sends plain-text mail
#[async_trait]
pub trait Mailer: Send + Sync + std::fmt::Debug {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError>;
}

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

/// Posts `{to, subject, text}` JSON to a transactional mail relay
#[derive(Debug, Clone)]
pub struct RelayMailer {
    client: Client,
    relay_url: Option<String>,
    token: Option<String>,
}

impl RelayMailer {
    #[must_use]
    pub fn new(relay_url: Option<String>, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            relay_url,
            token,
        }
    }

    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let non_blank = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self::new(
            non_blank(&settings.email_relay_url),
            non_blank(&settings.email_relay_token),
        )
    }
}

#[async_trait]
impl Mailer for RelayMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        let Some(relay_url) = &self.relay_url else {
            tracing::warn!("Email relay is not configured, skipping dispatch");
            return Err(DeliveryError::NotConfigured("Email relay"));
        };
        if to.trim().is_empty() {
            return Err(DeliveryError::NotConfigured("EMAIL_USER"));
        }

        let mut request = self
            .client
            .post(relay_url)
            .timeout(Duration::from_secs(30))
            .json(&RelayMessage {
                to: [to],
                subject,
                text: body,
            });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "Mail relay rejected message");
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(to, subject, "Email dispatched");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_message_shape() {
        let message = RelayMessage {
            to: ["ops@example.com"],
            subject: "Agent Report: Update",
            text: "body",
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "to": ["ops@example.com"],
                "subject": "Agent Report: Update",
                "text": "body"
            })
        );
    }

    #[tokio::test]
    async fn unconfigured_relay_is_rejected() {
        let mailer = RelayMailer::from_settings(&Settings::default());
        assert!(matches!(
            mailer.send("ops@example.com", "s", "b").await,
            Err(DeliveryError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn blank_recipient_is_rejected() {
        let mailer = RelayMailer::new(Some("http://127.0.0.1:1/send".to_string()), None);
        assert!(matches!(
            mailer.send("  ", "s", "b").await,
            Err(DeliveryError::NotConfigured("EMAIL_USER"))
        ));
    }

    #[tokio::test]
    async fn unreachable_relay_is_transport_error() {
        let mailer =
            RelayMailer::new(Some("http://127.0.0.1:1/send".to_string()), Some("t".into()));
        assert!(matches!(
            mailer.send("ops@example.com", "s", "b").await,
            Err(DeliveryError::Transport(_))
        ));
    }
}
