//! # Declarative Validation Schemas
//!
//! Schema trees describing which fields of a business object may be set, by
//! whom, and with what constraints, plus per-requester personalization.
//!
//! Schema trees are built at service-initialization time and are read-only
//! afterward; share them across concurrent requests behind an `Arc`.

pub mod node;
pub mod personalize;

pub use node::{AcceptableValues, FieldGroup, FieldRule, FieldType, SchemaNode};
pub use personalize::personalize;
