//! # Request Lifecycle Events
//!
//! Broadcast publisher for request-lifecycle events. Publishing never blocks
//! the run: events sent with no subscribers are dropped, which is acceptable
//! for a fire-and-forget sink.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Lifecycle event names
pub mod lifecycle {
    pub const RUN_STARTED: &str = "request.run.started";
    pub const RUN_COMPLETED: &str = "request.run.completed";
    pub const RUN_SHORT_CIRCUITED: &str = "request.run.short_circuited";
    pub const RUN_FAILED: &str = "request.run.failed";
    pub const VALIDATION_FAILED: &str = "request.validation.failed";
}

/// An event observed during a request run
#[derive(Debug, Clone)]
pub struct RequestEvent {
    pub name: String,
    pub request_id: Uuid,
    pub action: String,
    pub context: Value,
    pub published_at: DateTime<Utc>,
}

/// Broadcast publisher for request lifecycle events
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<RequestEvent>,
}

impl EventPublisher {
    /// Create a publisher with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event; dropped silently when no one is listening
    pub fn publish(
        &self,
        name: impl Into<String>,
        request_id: Uuid,
        action: impl Into<String>,
        context: Value,
    ) {
        let event = RequestEvent {
            name: name.into(),
            request_id,
            action: action.into(),
            context,
            published_at: Utc::now(),
        };
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<RequestEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(1000)
    }
}
