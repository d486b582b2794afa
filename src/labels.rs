use std::collections::HashSet;

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::surface::{Control, Label, Modal};

/// UI chrome that shows up as label-like text but is never a question.
const SKIP_KEYWORDS: &[&str] = &[
    "submit",
    "next",
    "review",
    "done",
    "upload",
    "cover letter",
    "resume",
    "cv",
    "dialog content",
    "powered by",
    "help center",
    "application settings",
    "33%",
    "50%",
    "66%",
    "100%",
    "last used",
    "learn more",
    "view",
    "back",
    "doc",
    "pdf",
    "mb",
];

/// Text that is an option's own label rather than a question; these are
/// reached through the question's resolution instead.
const OPTION_WORDS: &[&str] = &["yes", "no", "none", "other", "submit"];

/// Whether a candidate label text looks like a form question.
///
/// `seen` carries the case-folded texts already accepted in this scan,
/// so duplicates within one step are dropped.
pub fn is_question_label(text: &str, max_len: usize, seen: &mut HashSet<String>) -> bool {
    let text = text.trim();
    if text.is_empty() || text.len() > max_len {
        return false;
    }
    let lower = text.to_lowercase();
    if seen.contains(&lower) {
        return false;
    }
    if SKIP_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return false;
    }
    if OPTION_WORDS.contains(&lower.as_str()) {
        debug!(label = text, "skipping standalone option label");
        return false;
    }
    seen.insert(lower);
    true
}

/// Resolve the control a label element governs, trying in order: an
/// explicit label-target attribute, a control nested inside the label,
/// then a control under the nearest ancestor container.
async fn resolve_control(label: &dyn Label) -> Option<Box<dyn Control>> {
    match label.explicit_target().await {
        Ok(Some(control)) => return Some(control),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "explicit label target lookup failed"),
    }
    match label.descendant_control().await {
        Ok(Some(control)) => return Some(control),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "descendant control lookup failed"),
    }
    match label.container_control().await {
        Ok(Some(control)) => Some(control),
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "container control lookup failed");
            None
        }
    }
}

/// Scan the current modal step and pair each question-like label with
/// the control it governs. Candidates whose control cannot be found are
/// discarded. Document order is preserved.
pub async fn resolve_fields(
    modal: &dyn Modal,
    config: &EngineConfig,
) -> crate::error::Result<Vec<(String, Box<dyn Control>)>> {
    let mut fields = Vec::new();
    let mut seen = HashSet::new();

    for label in modal.labels().await? {
        let text = match label.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "unreadable label text, skipping");
                continue;
            }
        };
        if !is_question_label(&text, config.max_label_len, &mut seen) {
            continue;
        }
        match resolve_control(label.as_ref()).await {
            Some(control) => {
                debug!(label = %text.trim(), "resolved form field");
                fields.push((text.trim().to_string(), control));
            }
            None => debug!(label = %text.trim(), "no control found for label"),
        }
    }

    Ok(fields)
}
