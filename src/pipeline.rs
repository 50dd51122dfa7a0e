//! One run of the job scout: scrape every source, filter, drop links that were
//! already delivered, cap the output and hand the message to the notifier.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::aggregator::{Aggregator, SourceFailure};
use crate::config::AppConfig;
use crate::filter::RecordFilter;
use crate::models::{CompiledSource, RawRecord, SourceConfig};
use crate::plugins::{NotificationResult, PluginManager};
use crate::scraper::PageSource;
use crate::seen_store::{SeenStore, DEFAULT_BOUND};
use crate::{AppError, Result};

pub const DEFAULT_MAX: usize = 10;
/// Records included in the sample returned by a test run.
pub const TEST_SAMPLE_SIZE: usize = 10;
const SAMPLE_LINKS: usize = 5;
const DEBUG_LOGGED_RECORDS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub include: String,
    pub exclude: String,
    /// Output cap; the pipeline default when unset, never less than one.
    pub max: Option<usize>,
    pub debug: bool,
    pub dedupe: bool,
    pub reset: bool,
    pub test: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            include: String::new(),
            exclude: String::new(),
            max: None,
            debug: false,
            dedupe: true,
            reset: false,
            test: false,
        }
    }
}

/// Counters describing how many records survived each stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub counts_by_source: BTreeMap<String, usize>,
    pub total_scraped: usize,
    pub total_filtered: usize,
    pub total_after_dedupe: usize,
    pub sample_links: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub failures: Vec<SourceFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    NoNewItems(RunReport),
    TestSample(RunReport, Vec<RawRecord>),
    Delivered(RunReport, Vec<RawRecord>, NotificationResult),
}

impl RunOutcome {
    pub fn report(&self) -> &RunReport {
        match self {
            RunOutcome::NoNewItems(report)
            | RunOutcome::TestSample(report, _)
            | RunOutcome::Delivered(report, _, _) => report,
        }
    }
}

pub struct Pipeline {
    aggregator: Aggregator,
    sources: Vec<CompiledSource>,
    seen_store: SeenStore,
    notifiers: PluginManager,
    channel: String,
    bound: usize,
    default_max: usize,
    // Overlapping runs would both read the same seen state and double-deliver.
    run_lock: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        aggregator: Aggregator,
        sources: &[SourceConfig],
        seen_store: SeenStore,
        notifiers: PluginManager,
        channel: impl Into<String>,
    ) -> Result<Self> {
        let sources = sources
            .iter()
            .map(SourceConfig::compile)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            aggregator,
            sources,
            seen_store,
            notifiers,
            channel: channel.into(),
            bound: DEFAULT_BOUND,
            default_max: DEFAULT_MAX,
            run_lock: Mutex::new(()),
        })
    }

    pub fn with_bound(mut self, bound: usize) -> Self {
        self.bound = bound.max(1);
        self
    }

    pub fn with_default_max(mut self, default_max: usize) -> Self {
        self.default_max = default_max.max(1);
        self
    }

    /// Wire up the pipeline described by `config` around an existing page source.
    pub async fn from_config(config: &AppConfig, page_source: Arc<dyn PageSource>) -> Result<Self> {
        let aggregator = Aggregator::new(page_source, config.pipeline.on_source_failure);
        let notifiers = PluginManager::from_config(&config.notifications).await?;

        Ok(Self::new(
            aggregator,
            &config.sources,
            SeenStore::new(&config.dedupe.state_path),
            notifiers,
            config.notifications.channel.as_str(),
        )?
        .with_bound(config.dedupe.bound)
        .with_default_max(config.pipeline.default_max))
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn sources(&self) -> &[CompiledSource] {
        &self.sources
    }

    pub fn seen_store(&self) -> &SeenStore {
        &self.seen_store
    }

    pub async fn run(&self, options: RunOptions) -> Result<RunOutcome> {
        let _guard = self.run_lock.lock().await;
        let max = options.max.unwrap_or(self.default_max).max(1);

        tracing::info!(
            include = %options.include,
            exclude = %options.exclude,
            max,
            dedupe = options.dedupe,
            reset = options.reset,
            test = options.test,
            "Starting run"
        );

        if options.reset {
            self.with_seen_store(SeenStore::reset).await?;
        }

        let aggregation = self.aggregator.run(&self.sources).await?;
        let scraped = aggregation.records;

        if options.debug {
            for record in scraped.iter().take(DEBUG_LOGGED_RECORDS) {
                tracing::debug!(
                    source = %record.source,
                    title = %record.title,
                    link = %record.link,
                    company = ?record.company,
                    location = ?record.location,
                    "Scraped record"
                );
            }
        }

        let mut report = RunReport {
            counts_by_source: aggregation.counts_by_source,
            total_scraped: scraped.len(),
            sample_links: scraped
                .iter()
                .take(SAMPLE_LINKS)
                .map(|r| r.link.clone())
                .collect(),
            failures: aggregation.failures,
            ..RunReport::default()
        };

        let filtered = RecordFilter::new(&options.include, &options.exclude).apply(scraped);
        report.total_filtered = filtered.len();

        let deduped = if options.dedupe && !options.test {
            let bound = self.bound;
            self.with_seen_store(move |store| store.filter_new(filtered, bound))
                .await?
        } else {
            filtered
        };
        report.total_after_dedupe = deduped.len();

        let mut top = deduped;
        top.truncate(max);

        tracing::info!(
            scraped = report.total_scraped,
            filtered = report.total_filtered,
            after_dedupe = report.total_after_dedupe,
            selected = top.len(),
            "Run summary"
        );

        if top.is_empty() {
            return Ok(RunOutcome::NoNewItems(report));
        }

        if options.test {
            top.truncate(TEST_SAMPLE_SIZE);
            return Ok(RunOutcome::TestSample(report, top));
        }

        let message = format_message(&top);
        let receipt = self.notifiers.notify(&self.channel, &message).await?;
        tracing::info!(channel = %self.channel, records = top.len(), "Delivered new listings");

        Ok(RunOutcome::Delivered(report, top, receipt))
    }

    /// Seen-state access does file I/O under a blocking lock; keep it off the runtime.
    async fn with_seen_store<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&SeenStore) -> Result<T> + Send + 'static,
    {
        let store = self.seen_store.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| AppError::Internal(format!("seen store task failed: {}", e)))?
    }
}

/// One block per record, separated by a blank line.
pub fn format_message(records: &[RawRecord]) -> String {
    records
        .iter()
        .map(RawRecord::to_message_block)
        .collect::<Vec<_>>()
        .join("\n\n")
}
