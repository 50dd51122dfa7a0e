use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::extractor::selector::{parse_selector, SelectorChain};
use crate::extractor::text::TitlePattern;
use crate::Result;

/// Declarative description of one listing page and how to read items from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    pub item_selector: String,

    // Comma-separated fallback lists, tried left to right
    #[serde(default = "default_title_selector")]
    pub title_selector: String,
    #[serde(default = "default_link_selector")]
    pub link_selector: String,
    #[serde(default)]
    pub company_selector: String,
    #[serde(default)]
    pub location_selector: String,

    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_strip_after")]
    pub strip_after: Vec<String>,
    #[serde(default)]
    pub title_remove_patterns: Vec<String>,
}

fn default_title_selector() -> String {
    "h2, h3, a".to_string()
}

fn default_link_selector() -> String {
    "a".to_string()
}

fn default_limit() -> usize {
    5
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_strip_after() -> Vec<String> {
    vec!["•".to_string(), "|".to_string()]
}

impl SourceConfig {
    /// A source with the given identity and selector, everything else defaulted.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        item_selector: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            item_selector: item_selector.into(),
            title_selector: default_title_selector(),
            link_selector: default_link_selector(),
            company_selector: String::new(),
            location_selector: String::new(),
            limit: default_limit(),
            timeout_ms: default_timeout_ms(),
            strip_after: default_strip_after(),
            title_remove_patterns: Vec::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Structural checks that do not need selector parsing.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Source name must not be empty".into());
        }
        if Url::parse(&self.url).is_err() {
            return Err(format!("Source '{}' has an invalid URL: {}", self.name, self.url));
        }
        if self.item_selector.trim().is_empty() {
            return Err(format!("Source '{}' has an empty item_selector", self.name));
        }
        if self.limit == 0 {
            return Err(format!("Source '{}' limit must be greater than 0", self.name));
        }
        if self.timeout_ms == 0 {
            return Err(format!("Source '{}' timeout_ms must be greater than 0", self.name));
        }
        Ok(())
    }

    /// Parse every selector and regex once. Selector errors are fatal; regex
    /// errors only disable the offending pattern.
    pub fn compile(&self) -> Result<CompiledSource> {
        let item = parse_selector(&self.item_selector)?;
        let title_patterns = self
            .title_remove_patterns
            .iter()
            .map(|pattern| {
                let compiled = TitlePattern::compile(pattern);
                if let TitlePattern::Invalid { pattern, error } = &compiled {
                    tracing::warn!(
                        source = %self.name,
                        pattern = %pattern,
                        error = %error,
                        "Skipping invalid title pattern"
                    );
                }
                compiled
            })
            .collect();

        Ok(CompiledSource {
            item,
            title: SelectorChain::parse(&self.title_selector)?,
            link: SelectorChain::parse(&self.link_selector)?,
            company: SelectorChain::parse(&self.company_selector)?,
            location: SelectorChain::parse(&self.location_selector)?,
            title_patterns,
            config: self.clone(),
        })
    }
}

/// A `SourceConfig` with its selectors and patterns resolved.
#[derive(Debug, Clone)]
pub struct CompiledSource {
    pub config: SourceConfig,
    pub item: Selector,
    pub title: SelectorChain,
    pub link: SelectorChain,
    pub company: SelectorChain,
    pub location: SelectorChain,
    pub title_patterns: Vec<TitlePattern>,
}

impl CompiledSource {
    pub fn name(&self) -> &str {
        &self.config.name
    }
}
