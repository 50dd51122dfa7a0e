use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};

use crate::aggregator::FailurePolicy;
use crate::models::SourceConfig;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; JobScout/0.1)";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub scraper: ScraperConfig,
    pub dedupe: DedupeConfig,
    pub pipeline: PipelineConfig,
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScraperEngine {
    Chrome,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub engine: ScraperEngine,
    pub user_agent: String,
    pub chrome_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupeConfig {
    pub state_path: PathBuf,
    pub bound: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub default_max: usize,
    pub on_source_failure: FailurePolicy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Telegram,
    Discord,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationChannel::Telegram => "telegram",
            NotificationChannel::Discord => "discord",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub channel: NotificationChannel,
    pub telegram: TelegramConfig,
    pub discord: DiscordConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: Option<String>,
    pub username: String,
}

/// Periodic runs. Disabled unless `cron` is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub cron: Option<String>,
    #[serde(default)]
    pub include: String,
    #[serde(default)]
    pub exclude: String,
    pub max: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Daily rolling log files are written here when set.
    pub directory: Option<PathBuf>,
}

impl AppConfig {
    /// Defaults, then `{dir}/default`, `{dir}/{RUN_MODE}`, `{dir}/local`, then
    /// `JOB_SCOUT__SECTION__KEY` environment variables.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let file = |name: &str| {
            File::with_name(&config_dir.join(name).to_string_lossy()).required(false)
        };

        let s = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("scraper.engine", "chrome")?
            .set_default("scraper.user_agent", DEFAULT_USER_AGENT)?
            .set_default("dedupe.state_path", "data/seen.json")?
            .set_default("dedupe.bound", 50)?
            .set_default("pipeline.default_max", 10)?
            .set_default("pipeline.on_source_failure", "abort")?
            .set_default("notifications.channel", "telegram")?
            .set_default("notifications.telegram.api_base", "https://api.telegram.org")?
            .set_default("notifications.discord.username", "Job Scout")?
            .set_default("logging.level", "info")?
            .add_source(file("default"))
            .add_source(file(&run_mode))
            .add_source(file("local"))
            .add_source(
                Environment::with_prefix("JOB_SCOUT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;
        config.apply_env_fallbacks();
        config.validate()?;
        Ok(config)
    }

    /// Conventional variable names used when the config files leave these unset.
    fn apply_env_fallbacks(&mut self) {
        if self.scraper.chrome_path.is_none() {
            self.scraper.chrome_path = env::var("CHROME_PATH").ok();
        }
        let telegram = &mut self.notifications.telegram;
        if telegram.bot_token.is_none() {
            telegram.bot_token = env::var("TELEGRAM_BOT_TOKEN").ok();
        }
        if telegram.chat_id.is_none() {
            telegram.chat_id = env::var("TELEGRAM_CHAT_ID").ok();
        }
        if self.notifications.discord.webhook_url.is_none() {
            self.notifications.discord.webhook_url = env::var("DISCORD_WEBHOOK_URL").ok();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port must be greater than 0".into()));
        }

        if self.dedupe.bound == 0 {
            return Err(ConfigError::Message("Dedupe bound must be greater than 0".into()));
        }

        if self.pipeline.default_max == 0 {
            return Err(ConfigError::Message("Pipeline default_max must be greater than 0".into()));
        }

        if self.sources.is_empty() {
            return Err(ConfigError::Message("At least one source must be configured".into()));
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            source.validate().map_err(ConfigError::Message)?;
            if !names.insert(source.name.as_str()) {
                return Err(ConfigError::Message(format!("Duplicate source name: {}", source.name)));
            }
            source
                .compile()
                .map_err(|e| ConfigError::Message(format!("Source '{}': {}", source.name, e)))?;
        }

        if let Some(cron) = &self.scheduler.cron {
            if !is_valid_cron(cron) {
                return Err(ConfigError::Message("Invalid cron expression in scheduler.cron".into()));
            }
        }

        Ok(())
    }
}

/// Six or seven fields (seconds first), as the job scheduler expects.
pub fn is_valid_cron(cron_expr: &str) -> bool {
    let parts: Vec<&str> = cron_expr.split_whitespace().collect();
    if !(6..=7).contains(&parts.len()) {
        return false;
    }

    parts.iter().all(|part| {
        part.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '*' | '-' | ',' | '/' | '?'))
    })
}
