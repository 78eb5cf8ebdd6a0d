//! Tracks the text of the step currently executing

use std::sync::Arc;

use parking_lot::RwLock;

/// A step-started event published by the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStarted {
    /// A textual scenario step, e.g. `Given two numbers 5.0 and 3.0`.
    Text { text: String },
    /// A synthetic step such as a before/after hook.
    Hook { name: String },
}

/// Receives step-started events from the runner.
pub trait StepListener: Send + Sync {
    fn on_step_started(&self, event: &StepStarted);
}

/// Latest step label. The runner writes it; diagnostics read it.
///
/// Cloning shares the underlying label.
#[derive(Debug, Clone, Default)]
pub struct StepTracker {
    label: Arc<RwLock<Option<String>>>,
}

impl StepTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text of the step currently executing, if any step has started.
    pub fn current(&self) -> Option<String> {
        self.label.read().clone()
    }
}

impl StepListener for StepTracker {
    fn on_step_started(&self, event: &StepStarted) {
        if let StepStarted::Text { text } = event {
            *self.label.write() = Some(text.clone());
        }
    }
}
