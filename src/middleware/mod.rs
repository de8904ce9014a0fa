//! # Middleware Orchestration
//!
//! Named stacks of asynchronous steps and the orchestrator that drives them
//! with exactly-once continuation semantics. Stacks are built once at service
//! setup and are read-only afterward; each run is request-local.

pub mod flow;
pub mod orchestrator;
pub mod stack;

pub use flow::{Outcome, StepFlow};
pub use orchestrator::Orchestrator;
pub use stack::{middleware_fn, terminal_fn, Middleware, MiddlewareStack, TerminalAction};
