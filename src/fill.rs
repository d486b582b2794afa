use tracing::{debug, info, warn};

use crate::answer::AnswerSource;
use crate::classify::{classify, is_satisfied, ControlKind};
use crate::config::EngineConfig;
use crate::record::{AbortSignal, LabelRecord, NOT_ANSWERED};
use crate::surface::{Control, ControlFacts};

/// A handle to one interactive control plus its resolved label text,
/// control kind and state snapshot. Built fresh each time a step is
/// processed; the page may have changed between steps, so these are
/// never cached across them.
pub struct FormField {
    pub label: String,
    pub kind: ControlKind,
    pub facts: ControlFacts,
    pub control: Box<dyn Control>,
}

impl FormField {
    /// Snapshot the control once and classify it; every later decision
    /// works off this read instead of re-inspecting the element.
    pub async fn resolve(label: String, control: Box<dyn Control>) -> crate::error::Result<Self> {
        let facts = control.facts().await?;
        Ok(Self {
            kind: classify(&facts),
            label,
            facts,
            control,
        })
    }
}

/// Brings one form field to a satisfied state, recording the outcome.
/// Composes the classifier, the Answer Source and the Option Matcher;
/// the only condition under which it raises the abort signal is the
/// Answer Source producing nothing for an unsatisfied field.
pub struct FieldFiller<'a> {
    answers: &'a AnswerSource,
    config: &'a EngineConfig,
    record: &'a mut LabelRecord,
    abort: &'a mut AbortSignal,
}

impl<'a> FieldFiller<'a> {
    pub fn new(
        answers: &'a AnswerSource,
        config: &'a EngineConfig,
        record: &'a mut LabelRecord,
        abort: &'a mut AbortSignal,
    ) -> Self {
        Self {
            answers,
            config,
            record,
            abort,
        }
    }

    pub async fn fill_field(&mut self, field: &FormField) {
        let label = field.label.as_str();
        let control = field.control.as_ref();

        if field.kind == ControlKind::FileUpload {
            // Uploads are pre-attached by the host page; an empty one is
            // not a hard failure and gets no answer from this engine.
            if is_satisfied(field.kind, &field.facts) {
                info!(label, "document already attached");
                self.record.insert(label, field.facts.value.trim());
            } else {
                debug!(label, "empty file upload, skipping");
            }
            return;
        }

        if is_satisfied(field.kind, &field.facts) {
            let current = match field.kind {
                ControlKind::Choice => control
                    .option_text()
                    .await
                    .ok()
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| "Yes".to_string()),
                _ => field.facts.value.trim().to_string(),
            };
            info!(label, answer = %current, "field already satisfied");
            self.record.insert(label, current);
            return;
        }

        if field.kind == ControlKind::Unsupported {
            warn!(label, tag = %field.facts.tag, "unsupported control kind");
            self.record.insert(label, NOT_ANSWERED);
            return;
        }

        let answer = match self.answers.answer(label).await {
            Some(answer) => answer,
            None => {
                info!(label, "no usable answer, flagging traversal for abandonment");
                self.record.insert(label, NOT_ANSWERED);
                self.abort.set();
                return;
            }
        };
        self.record.insert(label, answer.as_str());

        let applied = match field.kind {
            ControlKind::Choice => self.apply_choice(control, &answer).await,
            ControlKind::TextInput => self.apply_text(label, control, &answer).await,
            ControlKind::SingleSelect => self.apply_select(control, &answer).await,
            ControlKind::MultiLineText => control.fill(&answer).await,
            ControlKind::FileUpload | ControlKind::Unsupported => unreachable!(),
        };
        if let Err(e) = applied {
            // Interaction failures are transient; the answer stays
            // recorded and the traversal moves on.
            warn!(label, error = %e, "failed to apply answer");
        }
    }

    async fn apply_choice(&self, control: &dyn Control, answer: &str) -> crate::error::Result<()> {
        let group = control.choice_group().await?;
        let texts: Vec<String> = group.iter().map(|(text, _)| text.clone()).collect();
        for text in &texts {
            debug!(option = %text, "found choice option");
        }
        match crate::matcher::best_option(answer, &texts, self.config.fuzzy_threshold) {
            Some(i) => {
                let (text, option) = &group[i];
                if let Err(e) = option.check().await {
                    warn!(option = %text, error = %e, "check failed, forcing click");
                    option.force_click().await?;
                }
                info!(option = %text, "selected choice option");
                Ok(())
            }
            None => {
                warn!(answer, "no matching choice option");
                Ok(())
            }
        }
    }

    async fn apply_text(
        &self,
        label: &str,
        control: &dyn Control,
        answer: &str,
    ) -> crate::error::Result<()> {
        let lower = label.to_lowercase();
        if lower.contains("location") || lower.contains("city") {
            // Geographic inputs only register a value chosen from their
            // autocomplete list; type, then confirm the first suggestion.
            control.click().await?;
            control.fill(answer).await?;
            tokio::time::sleep(self.config.suggest_wait).await;
            control.press_key("ArrowDown").await?;
            tokio::time::sleep(self.config.suggest_wait / 2).await;
            control.press_key("Enter").await?;
            info!(label, "confirmed location via autocomplete");
        } else {
            control.fill(answer).await?;
            debug!(label, "filled text input");
        }
        Ok(())
    }

    async fn apply_select(&self, control: &dyn Control, answer: &str) -> crate::error::Result<()> {
        let options = control.select_options().await?;
        let texts: Vec<String> = options.iter().map(|o| o.text.clone()).collect();
        match crate::matcher::best_option(answer, &texts, self.config.fuzzy_threshold) {
            Some(i) => {
                control.select_value(&options[i].value).await?;
                info!(option = %options[i].text, "selected dropdown option");
            }
            None => warn!(answer, "no matching dropdown option"),
        }
        Ok(())
    }
}
