pub mod aggregator;
pub mod config;
pub mod extractor;
pub mod filter;
pub mod models;
pub mod pipeline;
pub mod plugins;
pub mod scheduler;
pub mod scraper;
pub mod seen_store;
pub mod utils;
pub mod web;

// Re-export commonly used types
pub use aggregator::{Aggregator, FailurePolicy};
pub use config::AppConfig;
pub use extractor::Extractor;
pub use filter::RecordFilter;
pub use models::{CompiledSource, RawRecord, SeenState, SourceConfig};
pub use pipeline::{Pipeline, RunOptions, RunOutcome, RunReport};
pub use plugins::PluginManager;
pub use scheduler::ScoutScheduler;
pub use scraper::{PageSource, RenderedPage};
pub use seen_store::SeenStore;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
