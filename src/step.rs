use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::distr::{Distribution, Uniform};
use tracing::{info, warn};

use crate::answer::AnswerSource;
use crate::config::EngineConfig;
use crate::fill::{FieldFiller, FormField};
use crate::labels;
use crate::record::{AbortSignal, LabelRecord};
use crate::surface::{Control, Modal};

/// Navigation buttons tried in priority order when advancing a step.
const NAV_BUTTONS: &[&str] = &["Next", "Review", "Submit"];

/// States of one modal traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalState {
    /// Filling every field visible in the current step.
    ProcessingStep,
    /// A "continue applying" re-render prompt was acknowledged.
    Continuing,
    /// Looking for the step's navigation control.
    AwaitingNav,
    /// The form completed, or the modal exited non-fatally.
    Done,
    /// A required field could not be answered; the application was
    /// discarded without submitting.
    Abandoned,
    /// No way forward; the job is skipped.
    Failed,
}

impl TraversalState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Abandoned | Self::Failed)
    }
}

/// Outcome of a full multi-step traversal.
#[derive(Debug)]
pub struct Traversal {
    pub state: TraversalState,
    pub responses: LabelRecord,
}

/// Injectable pacing between interactions. The randomized pause is a
/// deliberate control against anti-automation detection, not a
/// correctness requirement; tests substitute a no-op.
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Long, randomized human-like pause after activating a navigation
    /// control.
    async fn pause(&self);

    /// Short wait for client-side re-rendering after an interaction.
    async fn settle(&self);
}

/// Default pacer: uniform random pause within the configured bounds.
pub struct RandomPacer {
    min: Duration,
    max: Duration,
    settle: Duration,
}

impl RandomPacer {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            min: config.pause_min,
            max: config.pause_max,
            settle: config.render_wait,
        }
    }
}

#[async_trait]
impl Pacer for RandomPacer {
    async fn pause(&self) {
        let millis = {
            let (lo, hi) = (self.min.as_millis() as u64, self.max.as_millis() as u64);
            match Uniform::new_inclusive(lo, hi.max(lo)) {
                Ok(dist) => dist.sample(&mut rand::rng()),
                Err(_) => lo,
            }
        };
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }

    async fn settle(&self) {
        tokio::time::sleep(self.settle).await;
    }
}

/// Pacer that never sleeps, for tests.
pub struct NoopPacer;

#[async_trait]
impl Pacer for NoopPacer {
    async fn pause(&self) {}
    async fn settle(&self) {}
}

/// Drives one modal through an unknown number of steps: fills every
/// field the Label Resolver finds, then activates the step's navigation
/// control, looping until a terminal state is reached.
pub struct StepDriver<'a> {
    modal: &'a dyn Modal,
    answers: &'a AnswerSource,
    pacer: &'a dyn Pacer,
    config: &'a EngineConfig,
}

impl<'a> StepDriver<'a> {
    pub fn new(
        modal: &'a dyn Modal,
        answers: &'a AnswerSource,
        pacer: &'a dyn Pacer,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            modal,
            answers,
            pacer,
            config,
        }
    }

    pub async fn run(&self) -> Traversal {
        let mut record = LabelRecord::new();
        let mut abort = AbortSignal::new();
        let mut state = TraversalState::ProcessingStep;
        let mut steps = 0usize;

        while !state.is_terminal() {
            state = match state {
                TraversalState::ProcessingStep => {
                    steps += 1;
                    if steps > self.config.max_steps {
                        warn!(steps, "step ceiling reached, giving up on this modal");
                        TraversalState::Failed
                    } else {
                        self.process_step(&mut record, &mut abort).await
                    }
                }
                TraversalState::Continuing => TraversalState::ProcessingStep,
                TraversalState::AwaitingNav => self.advance().await,
                terminal => terminal,
            };
        }

        info!(?state, responses = record.len(), "traversal finished");
        Traversal {
            state,
            responses: record,
        }
    }

    async fn process_step(
        &self,
        record: &mut LabelRecord,
        abort: &mut AbortSignal,
    ) -> TraversalState {
        let fields = match labels::resolve_fields(self.modal, self.config).await {
            Ok(fields) => fields,
            Err(e) => {
                // Structural absence: the modal subtree is gone or
                // unreadable. Report failure, skip the job, no retry.
                warn!(error = %e, "could not scan modal step");
                return TraversalState::Failed;
            }
        };

        for (label, control) in fields {
            if abort.is_set() {
                // Answers recorded so far are preserved, but nothing
                // further is filled once abandonment is decided.
                break;
            }
            let field = match FormField::resolve(label.clone(), control).await {
                Ok(field) => field,
                Err(e) => {
                    // Malformed or detached control; treat like unsupported.
                    warn!(label = %label, error = %e, "could not read control state");
                    record.insert(&label, crate::record::NOT_ANSWERED);
                    continue;
                }
            };
            info!(label = %label, kind = ?field.kind, "processing field");
            FieldFiller::new(self.answers, self.config, record, abort)
                .fill_field(&field)
                .await;
        }

        if abort.is_set() {
            self.abandon().await;
            TraversalState::Abandoned
        } else {
            TraversalState::AwaitingNav
        }
    }

    async fn advance(&self) -> TraversalState {
        // The platform sometimes re-renders the same logical step behind
        // a rate-limit prompt.
        if let Some(button) = self.visible_button("Continue applying").await {
            info!("acknowledging 'Continue applying' prompt");
            if let Err(e) = button.click().await {
                warn!(error = %e, "could not click 'Continue applying'");
                return TraversalState::Failed;
            }
            self.pacer.pause().await;
            self.pacer.settle().await;
            return TraversalState::Continuing;
        }

        let Some(nav) = self.primary_nav_button().await else {
            if let Some(done) = self.visible_button("Done").await {
                info!("clicking Done");
                let _ = done.click().await;
                self.pacer.pause().await;
                return TraversalState::Done;
            }
            if let Some(dismiss) = self.visible_dismiss().await {
                // Non-fatal early exit, e.g. an already-applied notice.
                info!("no navigation control, closing modal");
                let _ = dismiss.click().await;
                self.pacer.pause().await;
                return TraversalState::Done;
            }
            warn!("no navigation, done or dismiss control found");
            return TraversalState::Failed;
        };

        let text = nav.text().await.unwrap_or_default();
        info!(button = %text.trim(), "advancing to next step");
        self.pacer.settle().await;
        if let Err(e) = nav.click().await {
            warn!(error = %e, "could not click navigation control");
            return TraversalState::Failed;
        }
        self.pacer.pause().await;
        self.pacer.settle().await;

        // Some forms complete in one click; check for a terminal Done
        // control before treating this as a new step.
        if let Some(done) = self.visible_button("Done").await {
            info!("form complete");
            let _ = done.click().await;
            self.pacer.pause().await;
            return TraversalState::Done;
        }

        TraversalState::ProcessingStep
    }

    /// Two-stage cancel-then-discard interaction closing the modal
    /// without submitting a partial application. Best-effort: a stuck
    /// modal is left for the outer job loop to skip past.
    pub async fn abandon(&self) {
        info!("discarding in-progress application");
        let Some(dismiss) = self.visible_dismiss().await else {
            warn!("close control not found, cannot discard cleanly");
            return;
        };
        if let Err(e) = dismiss.click().await {
            warn!(error = %e, "could not click close control");
            return;
        }

        let deadline = Instant::now() + self.config.discard_wait;
        let discard = loop {
            match self.visible_button("Discard").await {
                Some(button) => break Some(button),
                None if Instant::now() >= deadline => break None,
                None => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        };
        let Some(discard) = discard else {
            warn!("discard confirmation never appeared");
            return;
        };
        if let Err(e) = discard.click().await {
            warn!(error = %e, "could not click discard control");
            return;
        }

        if let Err(e) = self.modal.wait_detached().await {
            warn!(error = %e, "modal did not detach after discard");
        }
    }

    async fn visible_button(&self, text: &str) -> Option<Box<dyn Control>> {
        match self.modal.button_with_text(text).await {
            Ok(button) => button,
            Err(e) => {
                warn!(text, error = %e, "button lookup failed");
                None
            }
        }
    }

    async fn visible_dismiss(&self) -> Option<Box<dyn Control>> {
        match self.modal.dismiss_button().await {
            Ok(button) => button,
            Err(e) => {
                warn!(error = %e, "dismiss lookup failed");
                None
            }
        }
    }

    /// First enabled control among Next, Review, Submit, in that order.
    async fn primary_nav_button(&self) -> Option<Box<dyn Control>> {
        for text in NAV_BUTTONS {
            if let Some(button) = self.visible_button(text).await {
                if button.is_enabled().await.unwrap_or(false) {
                    return Some(button);
                }
            }
        }
        None
    }
}
