pub mod manager;
pub mod notifiers;
pub mod traits;

pub use manager::PluginManager;
pub use notifiers::{DiscordNotifier, TelegramNotifier};
pub use traits::{NotificationResult, NotifierPlugin};
