//! # Run Orchestrator
//!
//! Executes one action's middleware stack for one request with exactly-once
//! continuation semantics, then runs the terminal action callback.
//!
//! Per run the state machine is strictly linear:
//!
//! ```text
//! Pending -> (Continuing)* -> { ShortCircuited | Terminal-invoked | Failed }
//! ```
//!
//! Steps run strictly in order, never concurrently for the same request, so a
//! step always observes the side effects of every step before it. Separate
//! requests are independent runs; the only shared state is the stack itself,
//! which is read-only after setup. No per-step timeout is imposed here;
//! cancellation is an outer collaborator's concern.

use crate::error::{Result, StewardError};
use crate::events::{lifecycle, EventPublisher};
use crate::middleware::flow::{Outcome, StepFlow};
use crate::middleware::stack::{MiddlewareStack, TerminalAction};
use crate::types::Request;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Drives middleware stacks to completion, one request at a time
#[derive(Debug, Clone)]
pub struct Orchestrator {
    stack: Arc<MiddlewareStack>,
    events: EventPublisher,
    /// Steps slower than this get a warning log
    step_warn_threshold_ms: u64,
}

impl Orchestrator {
    pub fn new(stack: Arc<MiddlewareStack>) -> Self {
        Self {
            stack,
            events: EventPublisher::default(),
            step_warn_threshold_ms: 1000,
        }
    }

    pub fn with_event_publisher(mut self, events: EventPublisher) -> Self {
        self.events = events;
        self
    }

    pub fn with_step_warn_threshold_ms(mut self, threshold_ms: u64) -> Self {
        self.step_warn_threshold_ms = threshold_ms;
        self
    }

    /// Run the stack registered for the request's action, then the terminal.
    ///
    /// The terminal runs only when every step advances; a short-circuiting
    /// step resolves the run with its value instead. Any step error rejects
    /// the whole run and skips everything after the failing step.
    pub async fn run_action(
        &self,
        request: &mut Request,
        terminal: &dyn TerminalAction,
    ) -> Result<Value> {
        let action = request.action.name().to_string();
        let steps = self.stack.steps(&action);
        debug!(
            request_id = %request.id,
            action = %action,
            step_count = steps.len(),
            "starting run"
        );
        self.events.publish(
            lifecycle::RUN_STARTED,
            request.id,
            &action,
            json!({"object_kind": request.object_kind, "step_count": steps.len()}),
        );

        for (index, step) in steps.iter().enumerate() {
            let flow = StepFlow::new();
            let started = Instant::now();

            if let Err(error) = step.call(request, &flow).await {
                warn!(
                    request_id = %request.id,
                    action = %action,
                    step = step.name(),
                    %error,
                    "step failed, rejecting run"
                );
                self.events.publish(
                    lifecycle::RUN_FAILED,
                    request.id,
                    &action,
                    json!({"step": index, "error": error.to_string()}),
                );
                return Err(error);
            }

            let elapsed_ms = started.elapsed().as_millis() as u64;
            if elapsed_ms > self.step_warn_threshold_ms {
                warn!(
                    request_id = %request.id,
                    action = %action,
                    step = step.name(),
                    elapsed_ms,
                    "slow middleware step"
                );
            }

            match flow.take() {
                Some(Outcome::Continue) => continue,
                Some(Outcome::ShortCircuit(value)) => {
                    debug!(
                        request_id = %request.id,
                        action = %action,
                        step = step.name(),
                        "run short-circuited"
                    );
                    self.events.publish(
                        lifecycle::RUN_SHORT_CIRCUITED,
                        request.id,
                        &action,
                        json!({"step": index}),
                    );
                    return Ok(value);
                }
                None => {
                    let error = StewardError::unresolved_step(&action, index);
                    self.events.publish(
                        lifecycle::RUN_FAILED,
                        request.id,
                        &action,
                        json!({"step": index, "error": error.to_string()}),
                    );
                    return Err(error);
                }
            }
        }

        match terminal.call(request).await {
            Ok(value) => {
                debug!(request_id = %request.id, action = %action, "run completed");
                self.events.publish(
                    lifecycle::RUN_COMPLETED,
                    request.id,
                    &action,
                    json!({"object_kind": request.object_kind}),
                );
                Ok(value)
            }
            Err(error) => {
                warn!(
                    request_id = %request.id,
                    action = %action,
                    %error,
                    "terminal action failed"
                );
                self.events.publish(
                    lifecycle::RUN_FAILED,
                    request.id,
                    &action,
                    json!({"terminal": true, "error": error.to_string()}),
                );
                Err(error)
            }
        }
    }
}
