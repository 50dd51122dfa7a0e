// Shared fixtures for the integration tests: canned listing pages, a notifier
// that records what it was asked to send, and pipeline builders around them.

pub mod api_tests;
pub mod pipeline_tests;
pub mod transport_tests;

use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;

use job_scout::{
    aggregator::{Aggregator, FailurePolicy},
    plugins::{NotificationResult, NotifierPlugin, PluginManager},
    scraper::{PageSource, RenderedPage},
    web::{create_router, AppState},
    AppError, Pipeline, SeenStore, SourceConfig,
};

/// Four listings per board; two of them mention "Engineer".
pub const BOARDS: [(&str, [&str; 4]); 3] = [
    ("Alpha", ["Rust Engineer", "Product Designer", "Data Engineer", "Sales Lead"]),
    ("Beta", ["Support Agent", "Backend Engineer", "Recruiter", "Platform Engineer"]),
    ("Gamma", ["Staff Engineer", "Copywriter", "QA Engineer", "Office Manager"]),
];

pub fn board_url(name: &str) -> String {
    format!("https://{}.example.com/jobs", name.to_lowercase())
}

pub fn board_html(titles: &[&str]) -> String {
    let items: String = titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            format!(
                r#"<li class="job"><a href="/jobs/{}"><h3>{} • Remote</h3></a><span class="company">Co {}</span></li>"#,
                i + 1,
                title,
                i + 1
            )
        })
        .collect();
    format!("<html><body><ul>{}</ul></body></html>", items)
}

pub fn board_sources() -> Vec<SourceConfig> {
    BOARDS
        .iter()
        .map(|(name, _)| SourceConfig::new(*name, board_url(name), "li.job"))
        .collect()
}

/// Serves canned markup by URL; unknown URLs behave like a page whose
/// listings never appeared.
#[derive(Default)]
pub struct FixturePageSource {
    pages: HashMap<String, String>,
}

impl FixturePageSource {
    pub fn boards() -> Self {
        let pages = BOARDS
            .iter()
            .map(|(name, titles)| (board_url(name), board_html(titles)))
            .collect();
        Self { pages }
    }

    pub fn without(mut self, name: &str) -> Self {
        self.pages.remove(&board_url(name));
        self
    }
}

#[async_trait]
impl PageSource for FixturePageSource {
    fn engine(&self) -> &'static str {
        "fixture"
    }

    async fn render(&self, source: &SourceConfig) -> job_scout::Result<RenderedPage> {
        let html = self.pages.get(&source.url).ok_or_else(|| {
            AppError::source_unavailable(
                &source.name,
                &source.url,
                &source.item_selector,
                format!("timed out after {}ms", source.timeout_ms),
            )
        })?;
        let url = Url::parse(&source.url).map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(RenderedPage::new(html.clone(), url))
    }
}

/// Accepts every message and keeps a copy.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotifierPlugin for RecordingNotifier {
    fn name(&self) -> &'static str {
        "Recording Notifier"
    }

    fn plugin_type(&self) -> &'static str {
        "telegram"
    }

    async fn notify(&self, message: &str) -> job_scout::Result<NotificationResult> {
        let mut messages = self.messages.lock().unwrap();
        messages.push(message.to_string());
        Ok(NotificationResult {
            channel: "telegram".to_string(),
            message_id: Some(messages.len().to_string()),
        })
    }
}

pub struct TestPipeline {
    pub pipeline: Arc<Pipeline>,
    pub notifier: RecordingNotifier,
    pub dir: TempDir,
}

impl TestPipeline {
    pub fn seen_links(&self) -> Vec<String> {
        self.pipeline.seen_store().load().urls
    }
}

pub async fn create_test_pipeline(
    page_source: FixturePageSource,
    policy: FailurePolicy,
) -> anyhow::Result<TestPipeline> {
    let dir = tempfile::tempdir()?;
    let notifier = RecordingNotifier::default();
    let plugins = PluginManager::new();
    plugins.register_notifier(Box::new(notifier.clone())).await?;

    let pipeline = Pipeline::new(
        Aggregator::new(Arc::new(page_source), policy),
        &board_sources(),
        SeenStore::new(dir.path().join("data").join("seen.json")),
        plugins,
        "telegram",
    )?;

    Ok(TestPipeline {
        pipeline: Arc::new(pipeline),
        notifier,
        dir,
    })
}

pub fn create_test_router(test: &TestPipeline) -> Router {
    create_router(AppState::new(Arc::clone(&test.pipeline)))
}

/// Issue a GET and return the status and the body as text.
pub async fn get(app: &Router, uri: &str) -> anyhow::Result<(axum::http::StatusCode, String)> {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty())?)
        .await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, String::from_utf8(bytes.to_vec())?))
}
