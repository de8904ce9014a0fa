#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Steward Core
//!
//! Request-processing substrate shared by resource services: a declarative
//! object-validation/permission engine and an asynchronous middleware-chain
//! orchestrator.
//!
//! ## Overview
//!
//! Every create/edit/delete/custom action on a business object is expressed
//! as (a) a declarative schema describing which fields may be set, by whom,
//! with what constraints, and (b) an ordered stack of asynchronous steps that
//! validate, enrich, and persist the request.
//!
//! A caller personalizes a schema for the current requester, then runs the
//! orchestrator over the relevant middleware stack; the validation step
//! normalizes the candidate object in place; the orchestrator either
//! short-circuits with a pre-built response or falls through to a terminal
//! callback that performs persistence and returns the final response.
//!
//! ## Module Organization
//!
//! - [`schema`] - Schema node model and per-requester personalization
//! - [`validation`] - Recursive candidate validation and normalization
//! - [`middleware`] - Middleware stacks, step flow control, orchestration
//! - [`service`] - Composition root for one resource kind
//! - [`events`] - Request lifecycle event publishing
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Tracing initialization
//!
//! ## Quick Start
//!
//! ```rust
//! use steward_core::schema::SchemaNode;
//! use steward_core::validation::Validator;
//! use steward_core::types::{Action, Requester};
//! use serde_json::json;
//!
//! # fn main() -> steward_core::Result<()> {
//! let schema = SchemaNode::from_value(&json!({
//!     "breed": { "type": "string", "acceptableValues": ["poodle", "lab"] }
//! }))?;
//!
//! let validator = Validator::new(schema);
//! let mut candidate = json!({"breed": "mutt"});
//! let outcome = validator.validate(&Action::Create, &mut candidate, None, &Requester::new("anon"));
//! assert!(!outcome.is_valid);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod middleware;
pub mod schema;
pub mod service;
pub mod types;
pub mod validation;

pub use config::{EventConfig, OrchestrationConfig, StewardConfig, ValidationConfig};
pub use error::{Result, StewardError};
pub use events::{EventPublisher, RequestEvent};
pub use middleware::{
    middleware_fn, terminal_fn, Middleware, MiddlewareStack, Orchestrator, Outcome, StepFlow,
    TerminalAction,
};
pub use schema::{personalize, AcceptableValues, FieldGroup, FieldRule, FieldType, SchemaNode};
pub use service::{ResourceService, ResourceServiceBuilder};
pub use types::{Action, Request, Requester};
pub use validation::{ValidationOutcome, Validator};
