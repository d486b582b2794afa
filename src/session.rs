//! The job-search loop surrounding the form engine: sign-in, search
//! navigation, list scrolling, job-card extraction and result storage.
//! Thin wrappers only; the hard logic lives in the Step Driver.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::answer::AnswerSource;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::modal::ApplyModal;
use crate::page::Page;
use crate::record::ApplicationResult;
use crate::step::{RandomPacer, StepDriver};

const JOB_CARD: &str = "div.job-card-container";
const APPLY_BUTTON: &str = "button.jobs-apply-button";

const TITLE_SELECTORS: &[&str] = &["h2.topcard__title", "h1"];
const COMPANY_SELECTORS: &[&str] = &[
    "a.topcard__org-name-link",
    "span.topcard__flavor",
    "div.artdeco-entity-lockup__subtitle",
];
const LOCATION_SELECTORS: &[&str] = &[
    "span.jobs-unified-top-card__bullet",
    "span.topcard__flavor--bullet",
    "div.artdeco-entity-lockup__caption",
];
const DESCRIPTION_SELECTORS: &[&str] = &["div.job-details-module.jobs-description"];

/// Receives one [`ApplicationResult`] per completed or abandoned job.
#[async_trait]
pub trait ResultSink: Send {
    async fn store(&mut self, result: &ApplicationResult) -> Result<()>;
}

/// Appends one JSON object per application to a file.
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ResultSink for JsonLinesSink {
    async fn store(&mut self, result: &ApplicationResult) -> Result<()> {
        let line = serde_json::to_string(result)
            .map_err(|e| Error::IoError(std::io::Error::other(e)))?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }
}

/// One signed-in job-search session driving a single page sequentially.
pub struct JobSession {
    page: Page,
    config: EngineConfig,
}

impl JobSession {
    pub fn new(page: Page, config: EngineConfig) -> Self {
        Self { page, config }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Sign in with the given credentials and wait for the feed to load.
    /// A screenshot is saved on failure (captcha, bad credentials).
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        self.page.goto("https://www.linkedin.com/login").await?;
        self.page.type_text("input#username", username).await?;
        self.page.type_text("input#password", password).await?;
        self.page.click("button[type=\"submit\"]").await?;

        match self.page.wait_for_url("/feed").await {
            Ok(()) => {
                info!("signed in");
                Ok(())
            }
            Err(e) => {
                let _ = self.page.screenshot_to_file("login_failed.png").await;
                warn!(error = %e, "sign-in did not reach the feed");
                Err(e)
            }
        }
    }

    /// Navigate to an Easy-Apply-filtered job search for the given title
    /// and location.
    pub async fn search_jobs(&self, title: &str, location: &str) -> Result<()> {
        let url = url::Url::parse_with_params(
            "https://www.linkedin.com/jobs/search/",
            &[("f_AL", "true"), ("keywords", title), ("location", location)],
        )
        .map_err(|e| Error::NavigationError(e.to_string()))?;
        info!(%url, "opening job search");
        self.page.goto(url.as_str()).await?;
        tokio::time::sleep(self.config.render_wait).await;
        Ok(())
    }

    /// Scroll the job list until `target` cards are loaded or loading
    /// stalls. Bounded by an attempt ceiling; falls back to full-page
    /// scrolling if no scrollable container is found.
    pub async fn scroll_job_list(&self, target: usize) -> Result<usize> {
        self.page.wait_for_selector(JOB_CARD).await?;

        let scroll_js = format!(
            r#"(() => {{
                const card = document.querySelector('{JOB_CARD}');
                if (!card) return false;
                let el = card.parentElement;
                while (el && el.scrollHeight <= el.clientHeight) {{
                    el = el.parentElement;
                }}
                if (el) {{ el.scrollBy(0, 1000); }} else {{ window.scrollBy(0, 1000); }}
                return true;
            }})()"#
        );

        let mut prev = usize::MAX;
        let mut stalled = 0;
        for _ in 0..60 {
            let count = self
                .page
                .find_elements(JOB_CARD)
                .await
                .map(|cards| cards.len())
                .unwrap_or(0);
            if count >= target {
                info!(count, "job list target reached");
                return Ok(count);
            }
            if count == prev {
                stalled += 1;
                if stalled >= 4 {
                    warn!(count, "job list stopped growing");
                    break;
                }
            } else {
                stalled = 0;
            }
            prev = count;

            if let Err(e) = self.page.evaluate_void(&scroll_js).await {
                warn!(error = %e, "scroll failed, falling back to PageDown");
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
            let _ = self.page.press_key("PageDown").await;
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        let count = self
            .page
            .find_elements(JOB_CARD)
            .await
            .map(|cards| cards.len())
            .unwrap_or(0);
        info!(count, "job list scroll finished");
        Ok(count)
    }

    /// Walk the loaded job cards, run the form engine against each
    /// openable application, and hand every outcome to `sink`. Per-card
    /// failures are logged and skipped; nothing here is fatal to the
    /// session.
    pub async fn apply_to_listings(
        &self,
        answers: &AnswerSource,
        sink: &mut dyn ResultSink,
        max_jobs: usize,
    ) -> Result<Vec<ApplicationResult>> {
        let mut results = Vec::new();
        let mut processed: HashSet<String> = HashSet::new();

        let cards = self.page.find_elements(JOB_CARD).await?;
        for (idx, card) in cards.into_iter().enumerate() {
            if results.len() >= max_jobs {
                break;
            }

            let job_id = card
                .attribute("data-job-id")
                .await
                .ok()
                .flatten()
                .unwrap_or_else(|| format!("job-{idx}"));
            if !processed.insert(job_id.clone()) {
                continue;
            }

            if let Err(e) = self.open_card(&card).await {
                warn!(%job_id, error = %e, "could not open job card");
                continue;
            }

            if self.page.find_element(APPLY_BUTTON).await.is_err() {
                info!(%job_id, "already applied, skipping");
                continue;
            }

            let details = self.read_job_details().await;

            if let Err(e) = self.page.click(APPLY_BUTTON).await {
                warn!(%job_id, error = %e, "could not open application modal");
                continue;
            }
            tokio::time::sleep(self.config.render_wait).await;

            let modal = ApplyModal::easy_apply(self.page.clone(), self.config.discard_wait);
            let pacer = RandomPacer::from_config(&self.config);
            let traversal = StepDriver::new(&modal, answers, &pacer, &self.config)
                .run()
                .await;
            info!(%job_id, state = ?traversal.state, "application finished");

            let result = ApplicationResult {
                title: details.0,
                company: details.1,
                location: details.2,
                description: details.3,
                responses: traversal.responses,
            };
            if let Err(e) = sink.store(&result).await {
                warn!(%job_id, error = %e, "could not store application result");
            }
            results.push(result);
        }

        Ok(results)
    }

    async fn open_card(&self, card: &crate::element::Element) -> Result<()> {
        card.scroll_into_view().await?;
        card.click().await?;
        tokio::time::sleep(self.config.render_wait).await;
        Ok(())
    }

    async fn read_job_details(&self) -> (String, String, String, String) {
        // Nudge the details panel so lazy content renders before reading.
        let _ = self.page.scroll_down(5000).await;

        let or_na = |value: Option<String>| value.unwrap_or_else(|| "N/A".to_string());
        (
            or_na(self.page.first_text(TITLE_SELECTORS).await),
            or_na(self.page.first_text(COMPANY_SELECTORS).await),
            or_na(self.page.first_text(LOCATION_SELECTORS).await),
            or_na(self.page.first_text(DESCRIPTION_SELECTORS).await),
        )
    }
}
