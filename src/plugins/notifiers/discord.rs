use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;

use crate::config::DiscordConfig;
use crate::plugins::traits::{truncate_message, NotificationResult, NotifierPlugin};
use crate::{AppError, Result};

const CHANNEL: &str = "discord";
const WEBHOOK_PREFIX: &str = "https://discord.com/api/webhooks/";
const MAX_CONTENT_CHARS: usize = 2000;

pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
    username: String,
}

impl DiscordNotifier {
    pub fn new(webhook_url: impl Into<String>, username: impl Into<String>) -> Self {
        DiscordNotifier {
            client: Client::new(),
            webhook_url: webhook_url.into(),
            username: username.into(),
        }
    }

    /// `None` when no webhook is configured; an error when it is not a Discord webhook URL.
    pub fn from_config(config: &DiscordConfig) -> Option<Result<Self>> {
        let webhook_url = config.webhook_url.as_deref()?;
        if !webhook_url.starts_with(WEBHOOK_PREFIX) {
            return Some(Err(AppError::Validation(
                "Invalid Discord webhook URL format".to_string(),
            )));
        }
        Some(Ok(Self::new(webhook_url, &config.username)))
    }

    fn create_webhook_payload(&self, message: &str) -> serde_json::Value {
        json!({
            "content": truncate_message(message, MAX_CONTENT_CHARS),
            "username": self.username,
        })
    }
}

#[async_trait]
impl NotifierPlugin for DiscordNotifier {
    fn name(&self) -> &'static str {
        "Discord Notifier"
    }

    fn plugin_type(&self) -> &'static str {
        CHANNEL
    }

    async fn notify(&self, message: &str) -> Result<NotificationResult> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&self.create_webhook_payload(message))
            .send()
            .await
            .map_err(|e| AppError::delivery(CHANNEL, format!("request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            tracing::info!("Discord webhook message sent");
            return Ok(NotificationResult {
                channel: CHANNEL.to_string(),
                message_id: None,
            });
        }

        let body: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = body
                .get("retry_after")
                .and_then(|v| v.as_f64())
                .map(|secs| secs.ceil() as u64)
                .unwrap_or(1);
            return Err(AppError::RateLimited {
                channel: CHANNEL.to_string(),
                retry_after_secs: retry_after,
            });
        }

        let description = body
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown Discord webhook error");
        Err(AppError::delivery(CHANNEL, format!("{} ({})", description, status)))
    }
}
