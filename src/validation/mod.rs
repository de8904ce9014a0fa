//! # Validation
//!
//! Recursive validation and normalization of candidate objects against a
//! personalized schema. Failures are data-driven values, never errors.

pub mod validator;

pub use validator::{ValidationOutcome, Validator, DEFAULT_MAX_DEPTH};
