pub mod notifier;

pub use notifier::{truncate_message, NotificationResult, NotifierPlugin};
