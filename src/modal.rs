//! chromiumoxide-backed implementation of the engine's surface traits.
//!
//! Handles are located fresh on every call; the host page re-renders
//! between steps and nothing here is cached. Upward DOM traversals
//! (ancestor containers, choice groups) work by marking the found nodes
//! with a one-shot data attribute and re-locating them by selector,
//! since CSS cannot select ancestors directly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::element::Element;
use crate::error::Result;
use crate::page::Page;
use crate::surface::{Control, ControlFacts, Label, Modal, SelectOption};

/// Root of the Easy Apply dialog on the host page.
pub const APPLY_MODAL_SELECTOR: &str = "div.jobs-easy-apply-modal";

const MARK_ATTR: &str = "data-apply-pilot-mark";

static MARK_SEQ: AtomicU64 = AtomicU64::new(0);

fn next_mark() -> u64 {
    MARK_SEQ.fetch_add(1, Ordering::Relaxed)
}

fn quote_attr(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// The multi-step application dialog, located by selector.
pub struct ApplyModal {
    page: Page,
    selector: String,
    detach_timeout: Duration,
}

impl ApplyModal {
    pub fn new(page: Page, selector: impl Into<String>, detach_timeout: Duration) -> Self {
        Self {
            page,
            selector: selector.into(),
            detach_timeout,
        }
    }

    /// Attach to the host page's Easy Apply dialog.
    pub fn easy_apply(page: Page, detach_timeout: Duration) -> Self {
        Self::new(page, APPLY_MODAL_SELECTOR, detach_timeout)
    }

    async fn root(&self) -> Result<Element> {
        self.page
            .find_element(&self.selector)
            .await
            .map_err(|e| crate::error::Error::ModalNotFound(e.to_string()))
    }
}

#[async_trait]
impl Modal for ApplyModal {
    async fn labels(&self) -> Result<Vec<Box<dyn Label>>> {
        let root = self.root().await?;
        let nodes = root.find_elements("label, span, p").await?;
        debug!(count = nodes.len(), "scanned label-like nodes");
        Ok(nodes
            .into_iter()
            .map(|el| {
                Box::new(PageLabel {
                    page: self.page.clone(),
                    modal_selector: self.selector.clone(),
                    el,
                }) as Box<dyn Label>
            })
            .collect())
    }

    async fn button_with_text(&self, text: &str) -> Result<Option<Box<dyn Control>>> {
        let needle = text.to_lowercase();
        let buttons = match self.page.find_elements("button").await {
            Ok(buttons) => buttons,
            Err(_) => return Ok(None),
        };
        for button in buttons {
            let label = button.inner_text().await.unwrap_or_default();
            if !label.to_lowercase().contains(&needle) {
                continue;
            }
            if button.is_visible().await.unwrap_or(false) {
                return Ok(Some(Box::new(PageControl {
                    page: self.page.clone(),
                    el: button,
                })));
            }
        }
        Ok(None)
    }

    async fn dismiss_button(&self) -> Result<Option<Box<dyn Control>>> {
        let candidates = match self
            .page
            .find_elements("button[aria-label='Dismiss'], button[aria-label='Close']")
            .await
        {
            Ok(candidates) => candidates,
            Err(_) => return Ok(None),
        };
        for button in candidates {
            if button.is_visible().await.unwrap_or(false) {
                return Ok(Some(Box::new(PageControl {
                    page: self.page.clone(),
                    el: button,
                })));
            }
        }
        Ok(None)
    }

    async fn wait_detached(&self) -> Result<()> {
        self.page
            .wait_for_detached(&self.selector, self.detach_timeout)
            .await
    }
}

/// One label-like node inside the modal.
struct PageLabel {
    page: Page,
    modal_selector: String,
    el: Element,
}

#[async_trait]
impl Label for PageLabel {
    async fn text(&self) -> Result<String> {
        self.el.inner_text().await
    }

    async fn explicit_target(&self) -> Result<Option<Box<dyn Control>>> {
        let Some(target) = self.el.attribute("for").await? else {
            return Ok(None);
        };
        let selector = format!("{} [id=\"{}\"]", self.modal_selector, quote_attr(&target));
        match self.page.find_element(&selector).await {
            Ok(el) => Ok(Some(Box::new(PageControl {
                page: self.page.clone(),
                el,
            }))),
            Err(_) => Ok(None),
        }
    }

    async fn descendant_control(&self) -> Result<Option<Box<dyn Control>>> {
        match self.el.find_element("input, select, textarea").await {
            Ok(el) => Ok(Some(Box::new(PageControl {
                page: self.page.clone(),
                el,
            }))),
            Err(_) => Ok(None),
        }
    }

    async fn container_control(&self) -> Result<Option<Box<dyn Control>>> {
        let mark = next_mark();
        let js = format!(
            r#"function() {{
                const container = this.closest('div, fieldset');
                const control = container
                    ? container.querySelector('input, select, textarea')
                    : null;
                if (!control) return false;
                control.setAttribute('{MARK_ATTR}', '{mark}');
                return true;
            }}"#,
        );
        if !self.el.eval_json(&js).await?.as_bool().unwrap_or(false) {
            return Ok(None);
        }
        let el = self
            .page
            .find_element(&format!("[{MARK_ATTR}=\"{mark}\"]"))
            .await?;
        el.eval_json(&format!(
            "function() {{ this.removeAttribute('{MARK_ATTR}'); }}"
        ))
        .await?;
        Ok(Some(Box::new(PageControl {
            page: self.page.clone(),
            el,
        })))
    }
}

/// One interactive control, backed by a located element.
struct PageControl {
    page: Page,
    el: Element,
}

#[async_trait]
impl Control for PageControl {
    async fn facts(&self) -> Result<ControlFacts> {
        self.el.facts().await
    }

    async fn text(&self) -> Result<String> {
        self.el.inner_text().await
    }

    async fn is_enabled(&self) -> Result<bool> {
        self.el.is_enabled().await
    }

    async fn option_text(&self) -> Result<String> {
        self.el.option_text().await
    }

    async fn choice_group(&self) -> Result<Vec<(String, Box<dyn Control>)>> {
        let mark = next_mark();
        // Mark every radio/checkbox under the nearest fieldset/div and
        // collect their option texts in document order.
        let js = format!(
            r#"function() {{
                const group = this.closest('fieldset, div') || this.parentElement;
                if (!group) return [];
                const options = Array.from(
                    group.querySelectorAll("input[type='radio'], input[type='checkbox']"));
                return options.map((el, i) => {{
                    el.setAttribute('{MARK_ATTR}', '{mark}-' + i);
                    const next = el.nextElementSibling;
                    const parent = el.parentElement;
                    return ((next && next.innerText) || (parent && parent.innerText) || '').trim();
                }});
            }}"#,
        );
        let texts = self.el.eval_json(&js).await?;
        let texts: Vec<String> = texts
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .map(|t| t.as_str().unwrap_or_default().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let mut group: Vec<(String, Box<dyn Control>)> = Vec::with_capacity(texts.len());
        for (i, text) in texts.into_iter().enumerate() {
            let el = self
                .page
                .find_element(&format!("[{MARK_ATTR}=\"{mark}-{i}\"]"))
                .await?;
            el.eval_json(&format!(
                "function() {{ this.removeAttribute('{MARK_ATTR}'); }}"
            ))
            .await?;
            group.push((
                text,
                Box::new(PageControl {
                    page: self.page.clone(),
                    el,
                }),
            ));
        }
        Ok(group)
    }

    async fn select_options(&self) -> Result<Vec<SelectOption>> {
        self.el.select_options().await
    }

    async fn check(&self) -> Result<()> {
        self.el.check().await
    }

    async fn click(&self) -> Result<()> {
        self.el.click().await
    }

    async fn force_click(&self) -> Result<()> {
        self.el.force_click().await
    }

    async fn fill(&self, text: &str) -> Result<()> {
        self.el.fill(text).await
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.el.press_key(key).await
    }

    async fn select_value(&self, value: &str) -> Result<()> {
        self.el.select_value(value).await
    }
}
