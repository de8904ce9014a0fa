//! # Middleware Stack
//!
//! Named, ordered lists of asynchronous steps. A stack is built once at
//! service setup, then looked up by action name at run time; an unregistered
//! action name behaves as an empty stack. Registration is type-checked:
//! anything registered is callable by construction, which is the compile-time
//! form of the fail-fast registration contract.

use crate::error::Result;
use crate::middleware::flow::StepFlow;
use crate::types::Request;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One asynchronous step in an action's stack.
///
/// A step validates, enriches, or gates the request, then signals exactly one
/// of `flow.advance()` or `flow.short_circuit(value)`. Returning `Err`
/// rejects the whole run.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn call(&self, request: &mut Request, flow: &StepFlow) -> Result<()>;

    /// Step name used in logs
    fn name(&self) -> &str {
        "middleware"
    }
}

/// Adapter turning an async closure into a [`Middleware`]
struct FnMiddleware<F> {
    func: F,
    name: String,
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut Request, &'a StepFlow) -> BoxFuture<'a, Result<()>> + Send + Sync,
{
    async fn call(&self, request: &mut Request, flow: &StepFlow) -> Result<()> {
        (self.func)(request, flow).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wrap an async closure as a middleware step
pub fn middleware_fn<F>(name: impl Into<String>, func: F) -> Arc<dyn Middleware>
where
    F: for<'a> Fn(&'a mut Request, &'a StepFlow) -> BoxFuture<'a, Result<()>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnMiddleware {
        func,
        name: name.into(),
    })
}

/// The action-specific callback run only when every step advances
#[async_trait]
pub trait TerminalAction: Send + Sync {
    async fn call(&self, request: &mut Request) -> Result<serde_json::Value>;
}

struct FnTerminal<F> {
    func: F,
}

#[async_trait]
impl<F> TerminalAction for FnTerminal<F>
where
    F: for<'a> Fn(&'a mut Request) -> BoxFuture<'a, Result<serde_json::Value>> + Send + Sync,
{
    async fn call(&self, request: &mut Request) -> Result<serde_json::Value> {
        (self.func)(request).await
    }
}

/// Wrap an async closure as a terminal action
pub fn terminal_fn<F>(func: F) -> Arc<dyn TerminalAction>
where
    F: for<'a> Fn(&'a mut Request) -> BoxFuture<'a, Result<serde_json::Value>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnTerminal { func })
}

/// Named, ordered middleware lists keyed by action name
#[derive(Default, Clone)]
pub struct MiddlewareStack {
    stacks: HashMap<String, Vec<Arc<dyn Middleware>>>,
}

impl MiddlewareStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step to the named action's stack
    pub fn register(&mut self, action: impl Into<String>, step: Arc<dyn Middleware>) {
        let action = action.into();
        debug!(action = %action, step = step.name(), "registering middleware");
        self.stacks.entry(action).or_default().push(step);
    }

    /// The ordered steps for an action; empty for unregistered names
    pub fn steps(&self, action: &str) -> &[Arc<dyn Middleware>] {
        self.stacks
            .get(action)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Action names with at least one registered step
    pub fn registered_actions(&self) -> Vec<&str> {
        self.stacks.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for MiddlewareStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut sizes: Vec<(&str, usize)> = self
            .stacks
            .iter()
            .map(|(action, steps)| (action.as_str(), steps.len()))
            .collect();
        sizes.sort_unstable();
        f.debug_struct("MiddlewareStack").field("stacks", &sizes).finish()
    }
}
