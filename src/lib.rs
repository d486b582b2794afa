pub mod answer;
pub mod browser;
pub mod classify;
pub mod config;
pub mod element;
pub mod error;
pub mod fill;
pub mod labels;
pub mod matcher;
pub mod modal;
pub mod page;
pub mod record;
pub mod session;
pub mod step;
pub mod surface;

pub use answer::{AnswerBackend, AnswerSource, OpenWebUiBackend};
pub use browser::{BrowserConfig, SessionBrowser};
pub use classify::ControlKind;
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use fill::{FieldFiller, FormField};
pub use modal::ApplyModal;
pub use page::Page;
pub use record::{AbortSignal, ApplicationResult, LabelRecord, NOT_ANSWERED};
pub use session::{JobSession, JsonLinesSink, ResultSink};
pub use step::{NoopPacer, Pacer, RandomPacer, StepDriver, Traversal, TraversalState};
pub use surface::{Control, ControlFacts, Label, Modal, SelectOption};
