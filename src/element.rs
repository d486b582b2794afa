use chromiumoxide::element::Element as CrElement;

use crate::error::{Error, Result};
use crate::surface::{ControlFacts, SelectOption};

/// Wrapper around a chromiumoxide Element with the reads and actions the
/// form engine needs.
pub struct Element {
    inner: CrElement,
}

impl Element {
    pub(crate) fn new(inner: CrElement) -> Self {
        Self { inner }
    }

    /// Call a JS function against this element and return its JSON value.
    pub async fn eval_json(&self, function: &str) -> Result<serde_json::Value> {
        let returns = self
            .inner
            .call_js_fn(function, false)
            .await
            .map_err(Error::CdpError)?;
        Ok(returns.result.value.unwrap_or(serde_json::Value::Null))
    }

    async fn eval_string(&self, function: &str) -> Result<String> {
        Ok(self
            .eval_json(function)
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    /// Read tag, type attribute, value and checked state in one pass.
    pub async fn facts(&self) -> Result<ControlFacts> {
        let value = self
            .eval_json(
                r#"function() {
                    return {
                        tag: (this.tagName || '').toLowerCase(),
                        type: this.type || '',
                        value: this.value || '',
                        checked: !!this.checked
                    };
                }"#,
            )
            .await?;
        Ok(ControlFacts {
            tag: value["tag"].as_str().unwrap_or_default().to_string(),
            input_type: value["type"].as_str().unwrap_or_default().to_string(),
            value: value["value"].as_str().unwrap_or_default().to_string(),
            checked: value["checked"].as_bool().unwrap_or(false),
        })
    }

    /// Visible text of a choice control's own option, read from its next
    /// sibling or parent.
    pub async fn option_text(&self) -> Result<String> {
        self.eval_string(
            r#"function() {
                const next = this.nextElementSibling;
                const parent = this.parentElement;
                return ((next && next.innerText) || (parent && parent.innerText) || '').trim();
            }"#,
        )
        .await
    }

    pub async fn inner_text(&self) -> Result<String> {
        Ok(self
            .inner
            .inner_text()
            .await
            .map_err(Error::CdpError)?
            .unwrap_or_default())
    }

    pub async fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.inner.attribute(name).await.map_err(Error::CdpError)
    }

    pub async fn is_visible(&self) -> Result<bool> {
        let value = self
            .eval_json(
                r#"function() {
                    const style = window.getComputedStyle(this);
                    return style.display !== 'none'
                        && style.visibility !== 'hidden'
                        && this.offsetParent !== null;
                }"#,
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    pub async fn is_enabled(&self) -> Result<bool> {
        let value = self
            .eval_json("function() { return !this.disabled; }")
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Click this element (scrolls into view first).
    pub async fn click(&self) -> Result<()> {
        self.inner.click().await.map_err(Error::CdpError)?;
        Ok(())
    }

    /// Simulated pointer activation, bypassing actionability checks.
    pub async fn force_click(&self) -> Result<()> {
        self.eval_json("function() { this.click(); }").await?;
        Ok(())
    }

    /// Set a radio/checkbox to checked and fire the change event.
    pub async fn check(&self) -> Result<()> {
        self.eval_json(
            r#"function() {
                if (!this.checked) {
                    this.checked = true;
                    this.dispatchEvent(new Event('input', { bubbles: true }));
                    this.dispatchEvent(new Event('change', { bubbles: true }));
                }
            }"#,
        )
        .await?;
        Ok(())
    }

    /// Replace the element's value and fire the input/change events the
    /// host page listens for.
    pub async fn fill(&self, text: &str) -> Result<()> {
        let text_js = serde_json::to_string(text).map_err(|e| Error::JsError(e.to_string()))?;
        let js = format!(
            r#"function() {{
                this.focus();
                this.value = {text_js};
                this.dispatchEvent(new Event('input', {{ bubbles: true }}));
                this.dispatchEvent(new Event('change', {{ bubbles: true }}));
            }}"#,
        );
        self.eval_json(&js).await?;
        Ok(())
    }

    /// Press a key on this element (e.g. "Enter", "ArrowDown").
    pub async fn press_key(&self, key: &str) -> Result<()> {
        self.inner.press_key(key).await.map_err(Error::CdpError)?;
        Ok(())
    }

    /// The options of a `<select>` element in document order.
    pub async fn select_options(&self) -> Result<Vec<SelectOption>> {
        let value = self
            .eval_json(
                r#"function() {
                    return Array.from(this.options || []).map(o => ({
                        value: o.value,
                        text: (o.innerText || '').trim()
                    }));
                }"#,
            )
            .await?;
        let options = value
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .map(|o| SelectOption {
                        value: o["value"].as_str().unwrap_or_default().to_string(),
                        text: o["text"].as_str().unwrap_or_default().to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(options)
    }

    /// Choose a `<select>` option by its value and fire the change event.
    pub async fn select_value(&self, value: &str) -> Result<()> {
        let value_js = serde_json::to_string(value).map_err(|e| Error::JsError(e.to_string()))?;
        let js = format!(
            r#"function() {{
                this.value = {value_js};
                this.dispatchEvent(new Event('change', {{ bubbles: true }}));
            }}"#,
        );
        self.eval_json(&js).await?;
        Ok(())
    }

    pub async fn scroll_into_view(&self) -> Result<()> {
        self.inner
            .scroll_into_view()
            .await
            .map_err(Error::CdpError)?;
        Ok(())
    }

    /// Find a descendant element matching the given CSS selector.
    pub async fn find_element(&self, selector: &str) -> Result<Element> {
        let el = self
            .inner
            .find_element(selector)
            .await
            .map_err(|e| Error::ElementNotFound(e.to_string()))?;
        Ok(Element::new(el))
    }

    /// Find all descendant elements matching the given CSS selector.
    pub async fn find_elements(&self, selector: &str) -> Result<Vec<Element>> {
        let els = self
            .inner
            .find_elements(selector)
            .await
            .map_err(|e| Error::ElementNotFound(e.to_string()))?;
        Ok(els.into_iter().map(Element::new).collect())
    }
}
