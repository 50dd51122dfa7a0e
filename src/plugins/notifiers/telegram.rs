use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::config::TelegramConfig;
use crate::plugins::traits::{truncate_message, NotificationResult, NotifierPlugin};
use crate::{AppError, Result};

const CHANNEL: &str = "telegram";
// Bot API limit for a single message
const MAX_MESSAGE_CHARS: usize = 4096;

/// Sends plain-text messages through the Telegram Bot API `sendMessage` endpoint.
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Result<Self> {
        let bot_token = bot_token.into();
        let chat_id = chat_id.into();
        if bot_token.trim().is_empty() {
            return Err(AppError::Validation("Telegram bot token must not be empty".into()));
        }
        if chat_id.trim().is_empty() {
            return Err(AppError::Validation("Telegram chat id must not be empty".into()));
        }

        Ok(Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token,
            chat_id,
        })
    }

    /// `None` when the token or chat id is not configured.
    pub fn from_config(config: &TelegramConfig) -> Option<Result<Self>> {
        match (&config.bot_token, &config.chat_id) {
            (Some(token), Some(chat_id)) => Some(Self::new(token, chat_id, &config.api_base)),
            _ => None,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

#[async_trait]
impl NotifierPlugin for TelegramNotifier {
    fn name(&self) -> &'static str {
        "Telegram Notifier"
    }

    fn plugin_type(&self) -> &'static str {
        CHANNEL
    }

    async fn notify(&self, message: &str) -> Result<NotificationResult> {
        let body = json!({
            "chat_id": self.chat_id,
            "text": truncate_message(message, MAX_MESSAGE_CHARS),
            "disable_web_page_preview": true,
        });

        tracing::debug!(chat_id = %self.chat_id, chars = message.chars().count(), "Sending Telegram message");

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::delivery(CHANNEL, format!("request failed: {}", e)))?;

        let status = response.status();
        let resp_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::delivery(CHANNEL, format!("unreadable response ({}): {}", status, e)))?;

        if resp_body.get("ok") == Some(&serde_json::Value::Bool(true)) {
            let message_id = resp_body
                .pointer("/result/message_id")
                .map(|id| id.to_string());
            tracing::info!(chat_id = %self.chat_id, "Telegram message sent");
            return Ok(NotificationResult {
                channel: CHANNEL.to_string(),
                message_id,
            });
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp_body
                .pointer("/parameters/retry_after")
                .and_then(|v| v.as_u64())
                .unwrap_or(30);
            return Err(AppError::RateLimited {
                channel: CHANNEL.to_string(),
                retry_after_secs: retry_after,
            });
        }

        let description = resp_body
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown Telegram API error");
        Err(AppError::delivery(CHANNEL, format!("{} ({})", description, status)))
    }
}
