//! # Error Types
//!
//! Structured error handling for steward-core using thiserror.
//!
//! Errors here are *control-flow* failures: a middleware step or terminal
//! action that threw, a malformed schema document, bad configuration. They
//! always surface to the caller as the rejection of the whole run.
//!
//! Validation failures are not errors. They are expected, data-driven results
//! carried as [`crate::validation::ValidationOutcome`] values (or short-circuit
//! payloads) and are never raised through this type.

use thiserror::Error;

/// Control-flow error types for schema handling and orchestration
#[derive(Error, Debug)]
pub enum StewardError {
    #[error("Schema error: {message}")]
    Schema { message: String },

    #[error("Middleware error in action '{action}' at step {step}: {message}")]
    Middleware {
        action: String,
        step: usize,
        message: String,
    },

    #[error("Terminal action error for '{action}': {message}")]
    Terminal { action: String, message: String },

    #[error("Step {step} of action '{action}' completed without continuing or short-circuiting")]
    UnresolvedStep { action: String, step: usize },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StewardError {
    /// Create a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Create a middleware error for a step in a named action stack
    pub fn middleware(
        action: impl Into<String>,
        step: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::Middleware {
            action: action.into(),
            step,
            message: message.into(),
        }
    }

    /// Create a terminal action error
    pub fn terminal(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Terminal {
            action: action.into(),
            message: message.into(),
        }
    }

    /// Create an unresolved-step error
    pub fn unresolved_step(action: impl Into<String>, step: usize) -> Self {
        Self::UnresolvedStep {
            action: action.into(),
            step,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl From<String> for StewardError {
    fn from(message: String) -> Self {
        StewardError::middleware("unknown", 0, message)
    }
}

/// Result type alias for steward-core operations
pub type Result<T> = std::result::Result<T, StewardError>;
