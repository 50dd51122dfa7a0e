use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::notifiers::{DiscordNotifier, TelegramNotifier};
use super::traits::{NotificationResult, NotifierPlugin};
use crate::config::NotificationsConfig;
use crate::{AppError, Result};

pub type NotifierPluginBox = Box<dyn NotifierPlugin>;

/// Registered notifiers, keyed by their channel name.
#[derive(Clone)]
pub struct PluginManager {
    notifiers: Arc<RwLock<HashMap<String, NotifierPluginBox>>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self {
            notifiers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register every notifier whose credentials are present in `config`.
    pub async fn from_config(config: &NotificationsConfig) -> Result<Self> {
        let manager = Self::new();

        if let Some(telegram) = TelegramNotifier::from_config(&config.telegram) {
            manager.register_notifier(Box::new(telegram?)).await?;
        }
        if let Some(discord) = DiscordNotifier::from_config(&config.discord) {
            manager.register_notifier(Box::new(discord?)).await?;
        }

        if !manager.has_notifier(config.channel.as_str()).await {
            tracing::warn!(
                channel = config.channel.as_str(),
                "Selected notification channel has no credentials; deliveries will fail"
            );
        }

        Ok(manager)
    }

    /// Register a notifier plugin
    pub async fn register_notifier(&self, plugin: NotifierPluginBox) -> Result<()> {
        let plugin_type = plugin.plugin_type().to_string();
        tracing::debug!(plugin = plugin.name(), "Registering notifier");

        let mut notifiers = self.notifiers.write().await;
        notifiers.insert(plugin_type, plugin);
        Ok(())
    }

    /// Check if a notifier plugin exists
    pub async fn has_notifier(&self, plugin_type: &str) -> bool {
        let notifiers = self.notifiers.read().await;
        notifiers.contains_key(plugin_type)
    }

    /// List all available notifier types
    pub async fn list_notifier_types(&self) -> Vec<String> {
        let notifiers = self.notifiers.read().await;
        let mut types: Vec<String> = notifiers.keys().cloned().collect();
        types.sort();
        types
    }

    /// Send one message through the notifier registered for `channel`.
    pub async fn notify(&self, channel: &str, message: &str) -> Result<NotificationResult> {
        let notifiers = self.notifiers.read().await;
        match notifiers.get(channel) {
            Some(notifier) => notifier.notify(message).await,
            None => Err(AppError::delivery(
                channel,
                format!("notifier '{}' is not configured", channel),
            )),
        }
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}
