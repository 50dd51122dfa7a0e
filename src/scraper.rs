use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::{ScraperConfig, ScraperEngine};
use crate::models::SourceConfig;
use crate::{AppError, Result};

// Headroom on top of the selector wait for tab setup and navigation.
const NAVIGATION_GRACE: Duration = Duration::from_secs(5);

/// A fetched (and possibly rendered) page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    /// Final address after redirects; relative links resolve against it.
    pub url: Url,
}

impl RenderedPage {
    pub fn new(html: impl Into<String>, url: Url) -> Self {
        Self { html: html.into(), url }
    }
}

/// Anything that can turn a source address into page markup.
///
/// Implementations must give up after `source.timeout()` and report
/// [`AppError::SourceUnavailable`] rather than hang.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageSource: Send + Sync {
    fn engine(&self) -> &'static str;
    async fn render(&self, source: &SourceConfig) -> Result<RenderedPage>;
}

pub fn page_source_from_config(config: &ScraperConfig) -> Result<Arc<dyn PageSource>> {
    match config.engine {
        ScraperEngine::Chrome => Ok(Arc::new(ChromePageSource::launch(config)?)),
        ScraperEngine::Http => Ok(Arc::new(HttpPageSource::new(config)?)),
    }
}

fn unavailable(source: &SourceConfig, reason: impl Into<String>) -> AppError {
    AppError::source_unavailable(&source.name, &source.url, &source.item_selector, reason)
}

/// Renders pages in a shared headless Chrome so script-built listings are visible.
pub struct ChromePageSource {
    browser: Arc<Browser>,
    user_agent: String,
}

impl ChromePageSource {
    pub fn launch(config: &ScraperConfig) -> Result<Self> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false) // Often needed in containerized environments
            .args(vec![
                std::ffi::OsStr::new("--no-sandbox"),
                std::ffi::OsStr::new("--disable-dev-shm-usage"),
                std::ffi::OsStr::new("--disable-gpu"),
                std::ffi::OsStr::new("--disable-extensions"),
            ])
            .build()
            .map_err(|e| AppError::Browser(format!("Failed to create launch options: {}", e)))?;

        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(chrome_path));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| AppError::Browser(format!("Failed to launch browser: {}", e)))?;
        tracing::info!("Headless browser launched");

        Ok(Self {
            browser: Arc::new(browser),
            user_agent: config.user_agent.clone(),
        })
    }

    fn render_blocking(browser: &Browser, user_agent: &str, source: &SourceConfig) -> Result<RenderedPage> {
        let tab = browser
            .new_tab()
            .map_err(|e| AppError::Browser(format!("Failed to create tab: {}", e)))?;
        let result = Self::load(&tab, user_agent, source);
        // Close tab to free resources
        let _ = tab.close(true);
        result
    }

    fn load(tab: &Tab, user_agent: &str, source: &SourceConfig) -> Result<RenderedPage> {
        let timeout = source.timeout();
        tab.set_default_timeout(timeout);
        tab.set_user_agent(user_agent, None, None)
            .map_err(|e| AppError::Browser(format!("Failed to set user agent: {}", e)))?;

        tab.navigate_to(&source.url)
            .map_err(|e| unavailable(source, format!("navigation failed: {}", e)))?;
        tab.wait_until_navigated()
            .map_err(|e| unavailable(source, format!("page load failed: {}", e)))?;
        tab.wait_for_element_with_custom_timeout(&source.item_selector, timeout)
            .map_err(|e| unavailable(source, format!("no match within {}ms: {}", source.timeout_ms, e)))?;

        let html = tab
            .get_content()
            .map_err(|e| AppError::Browser(format!("Failed to get page content: {}", e)))?;
        let url = Url::parse(&tab.get_url())
            .or_else(|_| Url::parse(&source.url))
            .map_err(|e| unavailable(source, format!("invalid page URL: {}", e)))?;

        Ok(RenderedPage { html, url })
    }
}

#[async_trait]
impl PageSource for ChromePageSource {
    fn engine(&self) -> &'static str {
        "chrome"
    }

    async fn render(&self, source: &SourceConfig) -> Result<RenderedPage> {
        let browser = Arc::clone(&self.browser);
        let user_agent = self.user_agent.clone();
        let owned = source.clone();
        let task = tokio::task::spawn_blocking(move || {
            Self::render_blocking(&browser, &user_agent, &owned)
        });

        match tokio::time::timeout(source.timeout() + NAVIGATION_GRACE, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(AppError::Internal(format!("Render task failed: {}", join_error))),
            Err(_) => Err(unavailable(
                source,
                format!("timed out after {}ms", source.timeout_ms),
            )),
        }
    }
}

/// Plain HTTP fetch without script execution. Listings must be present in the
/// served markup; the extractor reports a source with no item matches as
/// unavailable.
pub struct HttpPageSource {
    client: reqwest::Client,
}

impl HttpPageSource {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    fn engine(&self) -> &'static str {
        "http"
    }

    async fn render(&self, source: &SourceConfig) -> Result<RenderedPage> {
        let response = self
            .client
            .get(&source.url)
            .timeout(source.timeout())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    unavailable(source, format!("timed out after {}ms", source.timeout_ms))
                } else {
                    unavailable(source, format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(source, format!("HTTP {}", status)));
        }

        let url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| unavailable(source, format!("failed to read body: {}", e)))?;

        tracing::debug!(source = %source.name, url = %url, bytes = html.len(), "Fetched page");
        Ok(RenderedPage { html, url })
    }
}
