use std::time::Duration;

/// Tuning knobs for the form-filling engine.
///
/// Every wait and loop bound the engine uses is surfaced here so that
/// worst-case behavior is testable and a hostile or redesigned host page
/// cannot hang a traversal.
#[derive(Clone)]
pub struct EngineConfig {
    /// Hard ceiling on modal steps processed in one traversal.
    pub max_steps: usize,
    /// Bounds of the randomized human-like pause after activating a
    /// navigation control.
    pub pause_min: Duration,
    pub pause_max: Duration,
    /// Fixed wait for client-side re-rendering after an interaction.
    pub render_wait: Duration,
    /// Wait for an autocomplete suggestion list to appear before the
    /// keyboard confirmation on location-style inputs.
    pub suggest_wait: Duration,
    /// Ceiling on label text length; longer text is treated as
    /// descriptive boilerplate rather than a question.
    pub max_label_len: usize,
    /// Minimum similarity score for the Option Matcher's fuzzy tier.
    pub fuzzy_threshold: f64,
    /// Bounded wait for the discard confirmation during abandonment,
    /// and for the modal to detach afterwards.
    pub discard_wait: Duration,
    /// Default timeout for `wait_for_selector`-style element waits.
    pub default_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: 25,
            pause_min: Duration::from_secs(15),
            pause_max: Duration::from_secs(40),
            render_wait: Duration::from_secs(3),
            suggest_wait: Duration::from_secs(1),
            max_label_len: 200,
            fuzzy_threshold: 0.85,
            discard_wait: Duration::from_secs(5),
            default_timeout: Duration::from_secs(30),
        }
    }
}

pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.config.max_steps = max_steps;
        self
    }

    /// Set the bounds of the randomized post-navigation pause.
    pub fn pause_range(mut self, min: Duration, max: Duration) -> Self {
        self.config.pause_min = min;
        self.config.pause_max = max;
        self
    }

    pub fn render_wait(mut self, wait: Duration) -> Self {
        self.config.render_wait = wait;
        self
    }

    pub fn suggest_wait(mut self, wait: Duration) -> Self {
        self.config.suggest_wait = wait;
        self
    }

    pub fn max_label_len(mut self, len: usize) -> Self {
        self.config.max_label_len = len;
        self
    }

    pub fn fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.config.fuzzy_threshold = threshold;
        self
    }

    pub fn discard_wait(mut self, wait: Duration) -> Self {
        self.config.discard_wait = wait;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Config with all waits zeroed, for driving the engine against
    /// in-memory surfaces in tests.
    pub fn instant() -> Self {
        Self {
            pause_min: Duration::ZERO,
            pause_max: Duration::ZERO,
            render_wait: Duration::ZERO,
            suggest_wait: Duration::ZERO,
            discard_wait: Duration::from_millis(10),
            default_timeout: Duration::from_millis(10),
            ..Self::default()
        }
    }
}
