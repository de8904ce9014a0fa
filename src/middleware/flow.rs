//! # Step Flow Control
//!
//! The per-step continuation guard. Each middleware step receives a
//! [`StepFlow`] and signals exactly one of [`advance`](StepFlow::advance) or
//! [`short_circuit`](StepFlow::short_circuit). The first resolution wins;
//! later calls of either kind are silently ignored, so a misbehaving step
//! cannot double-advance or double-resolve the chain.

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

/// What a step decided for the rest of the run
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Proceed to the next step (or the terminal action)
    Continue,
    /// Abort the remaining stack and resolve the run with this value,
    /// skipping the terminal action
    ShortCircuit(Value),
}

/// Exactly-once resolution guard for a single step invocation.
///
/// A fresh guard is created per step; it is request-local and never shared
/// across runs.
#[derive(Debug, Default)]
pub struct StepFlow {
    resolution: Mutex<Option<Outcome>>,
}

impl StepFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal that the run should continue to the next step
    pub fn advance(&self) {
        self.record(Outcome::Continue);
    }

    /// Signal that the run should resolve immediately with `value`
    pub fn short_circuit(&self, value: Value) {
        self.record(Outcome::ShortCircuit(value));
    }

    /// Has this step already resolved
    pub fn is_resolved(&self) -> bool {
        self.resolution.lock().is_some()
    }

    fn record(&self, outcome: Outcome) {
        let mut resolution = self.resolution.lock();
        if resolution.is_none() {
            *resolution = Some(outcome);
        } else {
            debug!("step already resolved, ignoring duplicate resolution");
        }
    }

    /// Consume the recorded outcome, if any. Called by the orchestrator after
    /// the step future completes.
    pub(crate) fn take(&self) -> Option<Outcome> {
        self.resolution.lock().take()
    }
}
