use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // `source` is reserved by thiserror for the error chain, hence `source_name`.
    #[error("Source unavailable: {source_name} ({url}) selector '{selector}': {reason}")]
    SourceUnavailable {
        source_name: String,
        url: String,
        selector: String,
        reason: String,
    },

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Delivery failed via {channel}: {message}")]
    Delivery { channel: String, message: String },

    #[error("Rate limited by {channel}, retry after {retry_after_secs}s")]
    RateLimited { channel: String, retry_after_secs: u64 },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn source_unavailable(
        source_name: impl Into<String>,
        url: impl Into<String>,
        selector: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        AppError::SourceUnavailable {
            source_name: source_name.into(),
            url: url.into(),
            selector: selector.into(),
            reason: reason.into(),
        }
    }

    pub fn delivery(channel: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Delivery {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Errors raised by an upstream page or the notification sink rather than by us.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AppError::SourceUnavailable { .. }
                | AppError::Delivery { .. }
                | AppError::RateLimited { .. }
        )
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
