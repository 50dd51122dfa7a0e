use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationResult {
    pub channel: String,
    pub message_id: Option<String>,
}

/// Trait for chat channels that accept one preformatted text message.
///
/// Rejections (rate limits, unknown recipients, bad credentials) are returned
/// as errors; implementations never retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotifierPlugin: Send + Sync {
    /// Plugin metadata
    fn name(&self) -> &'static str;
    fn plugin_type(&self) -> &'static str;

    async fn notify(&self, message: &str) -> Result<NotificationResult>;
}

/// Cut `message` to at most `max_chars` characters, marking the cut with an ellipsis.
pub fn truncate_message(message: &str, max_chars: usize) -> String {
    if message.chars().count() <= max_chars {
        return message.to_string();
    }
    let mut truncated: String = message.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}
