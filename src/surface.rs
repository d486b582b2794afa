//! Capability traits the form-filling engine is polymorphic over.
//!
//! The engine never touches the browser directly; it drives anything
//! that can enumerate label-like nodes, resolve their controls, and
//! apply the handful of interactions below. `modal.rs` provides the
//! chromiumoxide-backed implementation; tests provide in-memory ones.

use async_trait::async_trait;

use crate::error::Result;

/// One snapshot read of a control's identity and current state. The
/// classifier operates on this alone.
#[derive(Debug, Clone, Default)]
pub struct ControlFacts {
    /// Lowercased tag name ("input", "select", "textarea", ...).
    pub tag: String,
    /// The type attribute for inputs, empty otherwise.
    pub input_type: String,
    /// Current value, unparsed.
    pub value: String,
    /// Checked state for radio/checkbox controls.
    pub checked: bool,
}

/// One entry of a `<select>` control.
#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub text: String,
}

/// A handle to one interactive control inside the modal.
#[async_trait]
pub trait Control: Send + Sync {
    /// Read tag, type, value and checked state in one pass.
    async fn facts(&self) -> Result<ControlFacts>;

    /// Visible text of the control (used for navigation buttons).
    async fn text(&self) -> Result<String>;

    async fn is_enabled(&self) -> Result<bool>;

    /// Visible text of a choice control's own option, read from its
    /// sibling or parent.
    async fn option_text(&self) -> Result<String>;

    /// All members of this control's radio/checkbox group in document
    /// order, each paired with its option text.
    async fn choice_group(&self) -> Result<Vec<(String, Box<dyn Control>)>>;

    /// The options of a `<select>` control in document order.
    async fn select_options(&self) -> Result<Vec<SelectOption>>;

    /// Set a radio/checkbox to checked through a direct state change.
    async fn check(&self) -> Result<()>;

    /// Activate the control (scrolls into view first).
    async fn click(&self) -> Result<()>;

    /// Simulated pointer activation that bypasses actionability checks;
    /// fallback when `check` fails.
    async fn force_click(&self) -> Result<()>;

    /// Replace the control's value and fire the events the host page
    /// listens for.
    async fn fill(&self, text: &str) -> Result<()>;

    async fn press_key(&self, key: &str) -> Result<()>;

    /// Choose a `<select>` option by its underlying value.
    async fn select_value(&self, value: &str) -> Result<()>;
}

/// A label-like text node that may control a form field.
#[async_trait]
pub trait Label: Send + Sync {
    async fn text(&self) -> Result<String>;

    /// The control named by an explicit label-target attribute, if any.
    async fn explicit_target(&self) -> Result<Option<Box<dyn Control>>>;

    /// A control nested inside the label element itself.
    async fn descendant_control(&self) -> Result<Option<Box<dyn Control>>>;

    /// A control found under the nearest ancestor container.
    async fn container_control(&self) -> Result<Option<Box<dyn Control>>>;
}

/// The multi-step application dialog overlaying the host page.
#[async_trait]
pub trait Modal: Send + Sync {
    /// All label-like nodes (label, inline text, paragraph) in the
    /// modal's subtree, in document order.
    async fn labels(&self) -> Result<Vec<Box<dyn Label>>>;

    /// First visible button whose text contains `text`, if any.
    async fn button_with_text(&self, text: &str) -> Result<Option<Box<dyn Control>>>;

    /// The modal's dismiss/close control, if visible.
    async fn dismiss_button(&self) -> Result<Option<Box<dyn Control>>>;

    /// Block until the modal detaches from the page, bounded by the
    /// configured timeout.
    async fn wait_detached(&self) -> Result<()>;
}
