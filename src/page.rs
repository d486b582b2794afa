use std::path::Path;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::Page as CrPage;
use chromiumoxide::page::ScreenshotParams;

use crate::element::Element;
use crate::error::{Error, Result};

/// Wrapper around a chromiumoxide Page with the operations the job-board
/// session and the form engine need.
#[derive(Clone)]
pub struct Page {
    inner: CrPage,
    default_timeout: Duration,
}

impl Page {
    pub(crate) fn new(inner: CrPage, default_timeout: Duration) -> Self {
        Self {
            inner,
            default_timeout,
        }
    }

    /// Returns a reference to the underlying chromiumoxide Page.
    pub fn inner(&self) -> &CrPage {
        &self.inner
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    // ── Navigation ──────────────────────────────────────────────────

    /// Navigate to the given URL and wait for the page to load.
    pub async fn goto(&self, url: &str) -> Result<()> {
        self.inner
            .goto(url)
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?;
        Ok(())
    }

    /// Get the current page URL.
    pub async fn url(&self) -> Result<String> {
        self.inner
            .url()
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?
            .ok_or_else(|| Error::NavigationError("No URL found".into()))
    }

    /// Poll until the current URL contains `fragment`, bounded by the
    /// default timeout.
    pub async fn wait_for_url(&self, fragment: &str) -> Result<()> {
        let interval = Duration::from_millis(250);
        let start = std::time::Instant::now();
        loop {
            if self.url().await?.contains(fragment) {
                return Ok(());
            }
            if start.elapsed() >= self.default_timeout {
                return Err(Error::Timeout(format!("URL containing: {fragment}")));
            }
            tokio::time::sleep(interval).await;
        }
    }

    // ── Actions ─────────────────────────────────────────────────────

    /// Click on an element matching the given CSS selector.
    pub async fn click(&self, selector: &str) -> Result<()> {
        let el = self.find_element(selector).await?;
        el.click().await
    }

    /// Type text into an element matching the given CSS selector.
    pub async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        let el = self.find_element(selector).await?;
        el.click().await?;
        el.fill(text).await
    }

    /// Press a key against the page body (e.g. "PageDown").
    pub async fn press_key(&self, key: &str) -> Result<()> {
        let el = self.find_element("body").await?;
        el.press_key(key).await
    }

    /// Scroll down by the specified number of pixels.
    pub async fn scroll_down(&self, pixels: u32) -> Result<()> {
        let js = format!("window.scrollBy(0, {})", pixels);
        self.inner
            .evaluate(js)
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        Ok(())
    }

    // ── Waits ───────────────────────────────────────────────────────

    /// Wait for an element matching the given CSS selector to appear in
    /// the DOM. Polls every 100ms up to the default timeout.
    pub async fn wait_for_selector(&self, selector: &str) -> Result<Element> {
        let interval = Duration::from_millis(100);
        let start = std::time::Instant::now();

        loop {
            match self.find_element(selector).await {
                Ok(el) => return Ok(el),
                Err(_) if start.elapsed() < self.default_timeout => {
                    tokio::time::sleep(interval).await;
                }
                Err(_) => {
                    return Err(Error::Timeout(format!(
                        "Timed out waiting for selector: {}",
                        selector
                    )));
                }
            }
        }
    }

    /// Wait for every element matching the selector to detach from the
    /// DOM, bounded by `timeout`.
    pub async fn wait_for_detached(&self, selector: &str, timeout: Duration) -> Result<()> {
        let interval = Duration::from_millis(100);
        let start = std::time::Instant::now();

        loop {
            if self.find_element(selector).await.is_err() {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(Error::Timeout(format!(
                    "Timed out waiting for detach: {}",
                    selector
                )));
            }
            tokio::time::sleep(interval).await;
        }
    }

    // ── Observations ────────────────────────────────────────────────

    /// Get the text content of an element matching the given CSS selector.
    pub async fn text_content(&self, selector: &str) -> Result<String> {
        let el = self.find_element(selector).await?;
        el.inner_text().await
    }

    /// First element among `selectors` that exists, with its text; used
    /// for job-card fields whose markup varies across page versions.
    pub async fn first_text(&self, selectors: &[&str]) -> Option<String> {
        for selector in selectors {
            if let Ok(el) = self.find_element(selector).await {
                if let Ok(text) = el.inner_text().await {
                    let text = text.trim().to_string();
                    if !text.is_empty() {
                        return Some(text);
                    }
                }
            }
        }
        None
    }

    /// Take a screenshot and save it to a file (PNG).
    pub async fn screenshot_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.inner
            .save_screenshot(params, path)
            .await
            .map_err(|e| Error::ScreenshotError(e.to_string()))?;
        Ok(())
    }

    /// Evaluate a JavaScript expression without caring about the result.
    pub async fn evaluate_void(&self, expression: &str) -> Result<()> {
        self.inner
            .evaluate(expression)
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        Ok(())
    }

    /// Evaluate a JavaScript expression and return its JSON value.
    pub async fn evaluate(&self, expression: &str) -> Result<serde_json::Value> {
        let result = self
            .inner
            .evaluate(expression)
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    // ── Element Queries ─────────────────────────────────────────────

    /// Find an element matching the given CSS selector.
    pub async fn find_element(&self, selector: &str) -> Result<Element> {
        let el = self
            .inner
            .find_element(selector)
            .await
            .map_err(|e| Error::ElementNotFound(e.to_string()))?;
        Ok(Element::new(el))
    }

    /// Find all elements matching the given CSS selector.
    pub async fn find_elements(&self, selector: &str) -> Result<Vec<Element>> {
        let els = self
            .inner
            .find_elements(selector)
            .await
            .map_err(|e| Error::ElementNotFound(e.to_string()))?;
        Ok(els.into_iter().map(Element::new).collect())
    }
}
