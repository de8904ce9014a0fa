//! # Resource Service
//!
//! Composition root for one resource kind: a base schema, a middleware stack
//! and an orchestrator held together by composition rather than inheritance.
//! A service is built once at setup time and shared across requests; all of
//! its state is read-only after `build()`.
//!
//! The ready-made validation step personalizes the base schema for the
//! current requester, validates the candidate in place, and short-circuits
//! with a `{code: 400, body: {error: ...}}` payload on failure — the shape an
//! HTTP-facing layer maps straight to a client response.
//!
//! ```rust
//! use steward_core::schema::SchemaNode;
//! use steward_core::service::ResourceService;
//! use steward_core::middleware::terminal_fn;
//! use steward_core::types::{Action, Requester};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> steward_core::Result<()> {
//! let schema = SchemaNode::from_value(&json!({
//!     "name": { "type": "string", "required": true }
//! }))?;
//!
//! let service = ResourceService::builder("campaign", schema)
//!     .with_validation("create")
//!     .build();
//!
//! let mut request = service.request(
//!     Action::Create,
//!     json!({"name": "Spring Push"}),
//!     Requester::new("ops"),
//! );
//! let terminal = terminal_fn(|req| {
//!     let candidate = req.candidate.clone();
//!     Box::pin(async move { Ok(candidate) })
//! });
//! let result = service.run(&mut request, terminal.as_ref()).await?;
//! assert_eq!(result["name"], json!("Spring Push"));
//! # Ok(())
//! # }
//! ```

use crate::config::StewardConfig;
use crate::error::Result;
use crate::events::{lifecycle, EventPublisher};
use crate::middleware::{Middleware, MiddlewareStack, Orchestrator, StepFlow, TerminalAction};
use crate::schema::{personalize, SchemaNode};
use crate::types::{Action, Request, Requester};
use crate::validation::Validator;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// Middleware step that personalizes the schema and validates the candidate
struct ValidationMiddleware {
    object_kind: String,
    schema: Arc<SchemaNode>,
    max_depth: usize,
    events: EventPublisher,
}

#[async_trait]
impl Middleware for ValidationMiddleware {
    async fn call(&self, request: &mut Request, flow: &StepFlow) -> Result<()> {
        let personalized = personalize(&self.schema, &request.requester, &self.object_kind)?;
        let validator = Validator::new(personalized).with_max_depth(self.max_depth);

        let outcome = validator.validate(
            &request.action,
            &mut request.candidate,
            request.prior.as_ref(),
            &request.requester,
        );

        if outcome.is_valid {
            flow.advance();
        } else {
            let reason = outcome.reason.unwrap_or_default();
            self.events.publish(
                lifecycle::VALIDATION_FAILED,
                request.id,
                request.action.name(),
                json!({"reason": reason}),
            );
            flow.short_circuit(json!({"code": 400, "body": {"error": reason}}));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "validation"
    }
}

enum PendingStep {
    Validation,
    Step(Arc<dyn Middleware>),
}

/// Builder assembling a service's stack in registration order
pub struct ResourceServiceBuilder {
    object_kind: String,
    schema: Arc<SchemaNode>,
    config: StewardConfig,
    pending: Vec<(String, PendingStep)>,
}

impl ResourceServiceBuilder {
    pub fn with_config(mut self, config: StewardConfig) -> Self {
        self.config = config;
        self
    }

    /// Append a middleware step to the named action's stack
    pub fn register(mut self, action: impl Into<String>, step: Arc<dyn Middleware>) -> Self {
        self.pending.push((action.into(), PendingStep::Step(step)));
        self
    }

    /// Append the schema-validation step to the named action's stack
    pub fn with_validation(mut self, action: impl Into<String>) -> Self {
        self.pending.push((action.into(), PendingStep::Validation));
        self
    }

    pub fn build(self) -> ResourceService {
        let events = EventPublisher::new(self.config.events.channel_capacity);

        let mut stack = MiddlewareStack::new();
        for (action, pending) in self.pending {
            let step: Arc<dyn Middleware> = match pending {
                PendingStep::Validation => Arc::new(ValidationMiddleware {
                    object_kind: self.object_kind.clone(),
                    schema: self.schema.clone(),
                    max_depth: self.config.validation.max_depth,
                    events: events.clone(),
                }),
                PendingStep::Step(step) => step,
            };
            stack.register(action, step);
        }

        let orchestrator = Orchestrator::new(Arc::new(stack))
            .with_event_publisher(events.clone())
            .with_step_warn_threshold_ms(self.config.orchestration.step_warn_threshold_ms);

        ResourceService {
            object_kind: self.object_kind,
            schema: self.schema,
            orchestrator,
            events,
        }
    }
}

/// One resource kind's validation schema, middleware stack and orchestrator
pub struct ResourceService {
    object_kind: String,
    schema: Arc<SchemaNode>,
    orchestrator: Orchestrator,
    events: EventPublisher,
}

impl ResourceService {
    pub fn builder(object_kind: impl Into<String>, schema: SchemaNode) -> ResourceServiceBuilder {
        ResourceServiceBuilder {
            object_kind: object_kind.into(),
            schema: Arc::new(schema),
            config: StewardConfig::default(),
            pending: Vec::new(),
        }
    }

    /// Build a request envelope for this service's object kind
    pub fn request(&self, action: Action, candidate: Value, requester: Requester) -> Request {
        Request::new(action, self.object_kind.clone(), candidate, requester)
    }

    /// Run the stack for the request's action, then the terminal callback
    pub async fn run(
        &self,
        request: &mut Request,
        terminal: &dyn TerminalAction,
    ) -> Result<Value> {
        self.orchestrator.run_action(request, terminal).await
    }

    pub fn object_kind(&self) -> &str {
        &self.object_kind
    }

    pub fn schema(&self) -> &SchemaNode {
        &self.schema
    }

    pub fn events(&self) -> &EventPublisher {
        &self.events
    }
}
