//! Engine tests against in-memory implementations of the surface traits.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use apply_pilot::classify::classify;
use apply_pilot::fill::{FieldFiller, FormField};
use apply_pilot::labels::resolve_fields;
use apply_pilot::record::{AbortSignal, LabelRecord, NOT_ANSWERED};
use apply_pilot::step::{NoopPacer, StepDriver, TraversalState};
use apply_pilot::surface::{Control, ControlFacts, Label, Modal, SelectOption};
use apply_pilot::{AnswerBackend, AnswerSource, EngineConfig, Result};

// ── Mock surfaces ───────────────────────────────────────────────────

#[derive(Default)]
struct FieldState {
    facts: ControlFacts,
    option_text: String,
    group: Vec<(String, MockControl)>,
    options: Vec<SelectOption>,
    filled: Option<String>,
    selected: Option<String>,
    keys: Vec<String>,
    clicks: usize,
}

#[derive(Clone, Default)]
struct MockControl(Arc<Mutex<FieldState>>);

impl MockControl {
    fn text_input(value: &str) -> Self {
        let control = Self::default();
        {
            let mut state = control.0.lock().unwrap();
            state.facts.tag = "input".into();
            state.facts.input_type = "text".into();
            state.facts.value = value.into();
        }
        control
    }

    fn radio(option_text: &str) -> Self {
        let control = Self::default();
        {
            let mut state = control.0.lock().unwrap();
            state.facts.tag = "input".into();
            state.facts.input_type = "radio".into();
            state.option_text = option_text.into();
        }
        control
    }

    fn with_group(self, members: &[MockControl]) -> Self {
        let group: Vec<(String, MockControl)> = members
            .iter()
            .map(|m| (m.0.lock().unwrap().option_text.clone(), m.clone()))
            .collect();
        self.0.lock().unwrap().group = group;
        self
    }

    fn filled(&self) -> Option<String> {
        self.0.lock().unwrap().filled.clone()
    }

    fn checked(&self) -> bool {
        self.0.lock().unwrap().facts.checked
    }
}

#[async_trait]
impl Control for MockControl {
    async fn facts(&self) -> Result<ControlFacts> {
        Ok(self.0.lock().unwrap().facts.clone())
    }

    async fn text(&self) -> Result<String> {
        Ok(String::new())
    }

    async fn is_enabled(&self) -> Result<bool> {
        Ok(true)
    }

    async fn option_text(&self) -> Result<String> {
        Ok(self.0.lock().unwrap().option_text.clone())
    }

    async fn choice_group(&self) -> Result<Vec<(String, Box<dyn Control>)>> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .group
            .iter()
            .map(|(text, control)| (text.clone(), Box::new(control.clone()) as Box<dyn Control>))
            .collect())
    }

    async fn select_options(&self) -> Result<Vec<SelectOption>> {
        Ok(self.0.lock().unwrap().options.clone())
    }

    async fn check(&self) -> Result<()> {
        self.0.lock().unwrap().facts.checked = true;
        Ok(())
    }

    async fn click(&self) -> Result<()> {
        self.0.lock().unwrap().clicks += 1;
        Ok(())
    }

    async fn force_click(&self) -> Result<()> {
        self.0.lock().unwrap().clicks += 1;
        Ok(())
    }

    async fn fill(&self, text: &str) -> Result<()> {
        let mut state = self.0.lock().unwrap();
        state.filled = Some(text.to_string());
        state.facts.value = text.to_string();
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.0.lock().unwrap().keys.push(key.to_string());
        Ok(())
    }

    async fn select_value(&self, value: &str) -> Result<()> {
        self.0.lock().unwrap().selected = Some(value.to_string());
        Ok(())
    }
}

struct MockLabel {
    text: String,
    control: Option<MockControl>,
}

#[async_trait]
impl Label for MockLabel {
    async fn text(&self) -> Result<String> {
        Ok(self.text.clone())
    }

    async fn explicit_target(&self) -> Result<Option<Box<dyn Control>>> {
        Ok(self
            .control
            .clone()
            .map(|c| Box::new(c) as Box<dyn Control>))
    }

    async fn descendant_control(&self) -> Result<Option<Box<dyn Control>>> {
        Ok(None)
    }

    async fn container_control(&self) -> Result<Option<Box<dyn Control>>> {
        Ok(None)
    }
}

struct StepSpec {
    labels: Vec<(String, Option<MockControl>)>,
    /// Navigation button visible on this step.
    nav: Option<&'static str>,
}

#[derive(Default)]
struct ModalState {
    steps: Vec<StepSpec>,
    current: usize,
    /// Whether a nav click on the last step reveals the Done button
    /// (set false to simulate a form that never makes progress).
    advance_on_nav: bool,
    done_visible: bool,
    dismissed: bool,
    discarded: bool,
}

struct MockModal {
    state: Arc<Mutex<ModalState>>,
}

impl MockModal {
    fn new(steps: Vec<StepSpec>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ModalState {
                steps,
                advance_on_nav: true,
                ..ModalState::default()
            })),
        }
    }

    fn frozen(mut self) -> Self {
        self.state.lock().unwrap().advance_on_nav = false;
        self
    }

    fn dismissed(&self) -> bool {
        self.state.lock().unwrap().dismissed
    }

    fn discarded(&self) -> bool {
        self.state.lock().unwrap().discarded
    }
}

/// Button that mutates the shared modal state when clicked.
struct MockButton {
    state: Arc<Mutex<ModalState>>,
    action: &'static str,
}

#[async_trait]
impl Control for MockButton {
    async fn facts(&self) -> Result<ControlFacts> {
        Ok(ControlFacts {
            tag: "button".into(),
            ..ControlFacts::default()
        })
    }

    async fn text(&self) -> Result<String> {
        Ok(self.action.to_string())
    }

    async fn is_enabled(&self) -> Result<bool> {
        Ok(true)
    }

    async fn option_text(&self) -> Result<String> {
        Ok(String::new())
    }

    async fn choice_group(&self) -> Result<Vec<(String, Box<dyn Control>)>> {
        Ok(Vec::new())
    }

    async fn select_options(&self) -> Result<Vec<SelectOption>> {
        Ok(Vec::new())
    }

    async fn check(&self) -> Result<()> {
        Ok(())
    }

    async fn click(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match self.action {
            "nav" => {
                if !state.advance_on_nav {
                    // re-renders the same step forever
                } else if state.current + 1 < state.steps.len() {
                    state.current += 1;
                } else {
                    state.done_visible = true;
                }
            }
            "done" => {}
            "dismiss" => state.dismissed = true,
            "discard" => state.discarded = true,
            _ => unreachable!(),
        }
        Ok(())
    }

    async fn force_click(&self) -> Result<()> {
        self.click().await
    }

    async fn fill(&self, _text: &str) -> Result<()> {
        Ok(())
    }

    async fn press_key(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    async fn select_value(&self, _value: &str) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Modal for MockModal {
    async fn labels(&self) -> Result<Vec<Box<dyn Label>>> {
        let state = self.state.lock().unwrap();
        Ok(state.steps[state.current]
            .labels
            .iter()
            .map(|(text, control)| {
                Box::new(MockLabel {
                    text: text.clone(),
                    control: control.clone(),
                }) as Box<dyn Label>
            })
            .collect())
    }

    async fn button_with_text(&self, text: &str) -> Result<Option<Box<dyn Control>>> {
        let state = self.state.lock().unwrap();
        let button = |action| {
            Some(Box::new(MockButton {
                state: Arc::clone(&self.state),
                action,
            }) as Box<dyn Control>)
        };
        let found = match text {
            "Done" if state.done_visible => button("done"),
            "Discard" if state.dismissed => button("discard"),
            nav if !state.done_visible
                && state.steps[state.current].nav == Some(nav) =>
            {
                button("nav")
            }
            _ => None,
        };
        Ok(found)
    }

    async fn dismiss_button(&self) -> Result<Option<Box<dyn Control>>> {
        Ok(Some(Box::new(MockButton {
            state: Arc::clone(&self.state),
            action: "dismiss",
        })))
    }

    async fn wait_detached(&self) -> Result<()> {
        Ok(())
    }
}

// ── Answer backends ─────────────────────────────────────────────────

struct CountingBackend {
    calls: Arc<AtomicUsize>,
    response: String,
}

impl CountingBackend {
    fn new(response: &str) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: Arc::clone(&calls),
                response: response.to_string(),
            },
            calls,
        )
    }
}

#[async_trait]
impl AnswerBackend for CountingBackend {
    async fn ask(&self, _question: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

fn source(response: &str) -> (AnswerSource, Arc<AtomicUsize>) {
    let (backend, calls) = CountingBackend::new(response);
    (AnswerSource::new(Box::new(backend)), calls)
}

async fn field(label: &str, control: &MockControl) -> FormField {
    FormField::resolve(label.to_string(), Box::new(control.clone()))
        .await
        .unwrap()
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn label_resolver_excludes_boilerplate() {
    let control = MockControl::text_input("");
    let modal = MockModal::new(vec![StepSpec {
        labels: vec![
            ("Submit your application".into(), Some(control.clone())),
            ("Powered by LinkedIn".into(), Some(control.clone())),
            ("Yes".into(), Some(control.clone())),
            ("How many years of Rust experience?".into(), Some(control)),
        ],
        nav: None,
    }]);

    let fields = resolve_fields(&modal, &EngineConfig::instant())
        .await
        .unwrap();
    let labels: Vec<&str> = fields.iter().map(|(l, _)| l.as_str()).collect();
    assert_eq!(labels, ["How many years of Rust experience?"]);
}

#[tokio::test]
async fn label_resolution_is_idempotent() {
    let modal = MockModal::new(vec![StepSpec {
        labels: vec![
            ("Current company".into(), Some(MockControl::text_input(""))),
            ("Notice period".into(), Some(MockControl::text_input(""))),
        ],
        nav: None,
    }]);
    let config = EngineConfig::instant();

    let mut runs = Vec::new();
    for _ in 0..2 {
        let fields = resolve_fields(&modal, &config).await.unwrap();
        let mut pairs = Vec::new();
        for (label, control) in fields {
            pairs.push((label, classify(&control.facts().await.unwrap())));
        }
        runs.push(pairs);
    }
    assert_eq!(runs[0], runs[1]);
}

#[tokio::test]
async fn satisfied_field_skips_answer_source() {
    let (answers, calls) = source("should never be used");
    let config = EngineConfig::instant();
    let mut record = LabelRecord::new();
    let mut abort = AbortSignal::new();

    let control = MockControl::text_input("San Francisco");
    FieldFiller::new(&answers, &config, &mut record, &mut abort)
        .fill_field(&field("Current location", &control).await)
        .await;

    assert_eq!(record.get("Current location"), Some("San Francisco"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!abort.is_set());
    assert_eq!(control.filled(), None);
}

#[tokio::test]
async fn unmatched_choice_is_recorded_but_not_fatal() {
    let (answers, calls) = source("I have 7 years");
    let config = EngineConfig::instant();
    let mut record = LabelRecord::new();
    let mut abort = AbortSignal::new();

    let five = MockControl::radio("5-10 years");
    let ten = MockControl::radio("10+ years");
    let control = five.clone().with_group(&[five.clone(), ten.clone()]);

    FieldFiller::new(&answers, &config, &mut record, &mut abort)
        .fill_field(&field("Experience bracket", &control).await)
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(record.get("Experience bracket"), Some("I have 7 years"));
    assert!(!five.checked() && !ten.checked());
    assert!(!abort.is_set());
}

#[tokio::test]
async fn matched_choice_is_checked() {
    let (answers, _) = source("Yes");
    let config = EngineConfig::instant();
    let mut record = LabelRecord::new();
    let mut abort = AbortSignal::new();

    let yes = MockControl::radio("Yes");
    let no = MockControl::radio("No");
    let control = yes.clone().with_group(&[yes.clone(), no.clone()]);

    FieldFiller::new(&answers, &config, &mut record, &mut abort)
        .fill_field(&field("Are you authorized to work here?", &control).await)
        .await;

    assert!(yes.checked());
    assert!(!no.checked());
    assert!(!abort.is_set());
}

#[tokio::test]
async fn refusal_response_sets_abort() {
    let (answers, _) = source("None.");
    let config = EngineConfig::instant();
    let mut record = LabelRecord::new();
    let mut abort = AbortSignal::new();

    let control = MockControl::text_input("");
    FieldFiller::new(&answers, &config, &mut record, &mut abort)
        .fill_field(&field("Expected salary", &control).await)
        .await;

    assert_eq!(record.get("Expected salary"), Some(NOT_ANSWERED));
    assert!(abort.is_set());
    assert_eq!(control.filled(), None);
}

#[tokio::test]
async fn location_input_is_confirmed_via_keyboard() {
    let (answers, _) = source("Berlin");
    let config = EngineConfig::instant();
    let mut record = LabelRecord::new();
    let mut abort = AbortSignal::new();

    let control = MockControl::text_input("");
    FieldFiller::new(&answers, &config, &mut record, &mut abort)
        .fill_field(&field("City", &control).await)
        .await;

    assert_eq!(control.filled().as_deref(), Some("Berlin"));
    let keys = control.0.lock().unwrap().keys.clone();
    assert_eq!(keys, ["ArrowDown", "Enter"]);
}

#[tokio::test]
async fn two_step_modal_is_abandoned_on_unanswerable_field() {
    // Step 1: one already-satisfied text field. Step 2: one required
    // field the answer service cannot answer.
    let satisfied = MockControl::text_input("Jane Doe");
    let unanswerable = MockControl::text_input("");
    let modal = MockModal::new(vec![
        StepSpec {
            labels: vec![("Full name".into(), Some(satisfied))],
            nav: Some("Next"),
        },
        StepSpec {
            labels: vec![("Security clearance level".into(), Some(unanswerable))],
            nav: Some("Submit"),
        },
    ]);

    let (answers, calls) = source("");
    let config = EngineConfig::instant();
    let driver = StepDriver::new(&modal, &answers, &NoopPacer, &config);
    let traversal = driver.run().await;

    assert_eq!(traversal.state, TraversalState::Abandoned);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(traversal.responses.len(), 2);
    assert_eq!(traversal.responses.get("Full name"), Some("Jane Doe"));
    assert_eq!(
        traversal.responses.get("Security clearance level"),
        Some(NOT_ANSWERED)
    );
    assert!(modal.dismissed());
    assert!(modal.discarded());
}

#[tokio::test]
async fn completed_form_reaches_done() {
    let field = MockControl::text_input("");
    let modal = MockModal::new(vec![StepSpec {
        labels: vec![("Preferred pronouns".into(), Some(field.clone()))],
        nav: Some("Submit"),
    }]);

    let (answers, _) = source("They/them");
    let config = EngineConfig::instant();
    let traversal = StepDriver::new(&modal, &answers, &NoopPacer, &config)
        .run()
        .await;

    assert_eq!(traversal.state, TraversalState::Done);
    assert_eq!(field.filled().as_deref(), Some("They/them"));
    assert!(!modal.dismissed());
}

#[tokio::test]
async fn step_ceiling_bounds_a_frozen_modal() {
    let modal = MockModal::new(vec![StepSpec {
        labels: vec![],
        nav: Some("Next"),
    }])
    .frozen();

    let (answers, _) = source("");
    let config = EngineConfig::builder().max_steps(3).build();
    let traversal = StepDriver::new(&modal, &answers, &NoopPacer, &config)
        .run()
        .await;

    assert_eq!(traversal.state, TraversalState::Failed);
}

#[tokio::test]
async fn modal_without_controls_exits_nonfatally() {
    // No fields, no nav, no Done: the dismiss fallback closes the modal
    // and the traversal counts as a non-fatal early exit.
    let modal = MockModal::new(vec![StepSpec {
        labels: vec![],
        nav: None,
    }]);

    let (answers, calls) = source("");
    let config = EngineConfig::instant();
    let traversal = StepDriver::new(&modal, &answers, &NoopPacer, &config)
        .run()
        .await;

    assert_eq!(traversal.state, TraversalState::Done);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(modal.dismissed());
    assert!(traversal.responses.is_empty());
}
