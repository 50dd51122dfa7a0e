use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::extractor::Extractor;
use crate::models::{CompiledSource, RawRecord};
use crate::scraper::PageSource;
use crate::Result;

/// What to do when one source cannot be read.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Fail the whole run.
    #[default]
    Abort,
    /// Log, record the failure and continue with the remaining sources.
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: String,
    pub error: String,
}

/// Records from all sources, in source-declaration order.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub records: Vec<RawRecord>,
    pub counts_by_source: BTreeMap<String, usize>,
    pub failures: Vec<SourceFailure>,
}

pub struct Aggregator {
    page_source: Arc<dyn PageSource>,
    extractor: Extractor,
    policy: FailurePolicy,
}

impl Aggregator {
    pub fn new(page_source: Arc<dyn PageSource>, policy: FailurePolicy) -> Self {
        Self {
            page_source,
            extractor: Extractor::new(),
            policy,
        }
    }

    /// Fetch and extract a single source.
    pub async fn scrape_source(&self, source: &CompiledSource) -> Result<Vec<RawRecord>> {
        let page = self.page_source.render(&source.config).await?;
        self.extractor.extract(&page, source)
    }

    /// Scrape every source sequentially and concatenate the results.
    pub async fn run(&self, sources: &[CompiledSource]) -> Result<Aggregation> {
        let mut aggregation = Aggregation::default();

        for source in sources {
            match self.scrape_source(source).await {
                Ok(records) => {
                    tracing::info!(source = %source.name(), count = records.len(), "Scraped source");
                    aggregation
                        .counts_by_source
                        .insert(source.name().to_string(), records.len());
                    aggregation.records.extend(records);
                }
                Err(e) => match self.policy {
                    FailurePolicy::Abort => {
                        tracing::error!(source = %source.name(), error = %e, "Source failed, aborting run");
                        return Err(e);
                    }
                    FailurePolicy::Skip => {
                        tracing::warn!(source = %source.name(), error = %e, "Source failed, skipping");
                        aggregation.failures.push(SourceFailure {
                            source: source.name().to_string(),
                            error: e.to_string(),
                        });
                    }
                },
            }
        }

        Ok(aggregation)
    }
}
