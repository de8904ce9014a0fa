//! # Core Types
//!
//! Shared types threaded through validation and orchestration: the action
//! being performed, the acting identity, and the per-run request envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use uuid::Uuid;

/// The action a request performs against a resource.
///
/// `Create`, `Edit` and `Delete` are the primary lifecycle actions; `Custom`
/// names an ad hoc action that reuses the same middleware stack mechanism
/// with its own terminal callback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Create,
    Edit,
    Delete,
    Custom(String),
}

impl Action {
    /// The stack name this action is registered under
    pub fn name(&self) -> &str {
        match self {
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Custom(name) => name,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The acting identity behind a request.
///
/// A requester may carry per-object-kind schema overrides under
/// `fieldValidation`, keyed by object kind and then by dotted field path.
/// Each override is a partial schema node in the plain-map wire format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Requester {
    pub id: String,
    #[serde(default, rename = "fieldValidation")]
    pub field_validation: BTreeMap<String, BTreeMap<String, Value>>,
}

impl Requester {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            field_validation: BTreeMap::new(),
        }
    }

    /// Add a schema override for a field path of an object kind
    pub fn with_override(
        mut self,
        object_kind: impl Into<String>,
        field_path: impl Into<String>,
        attributes: Value,
    ) -> Self {
        self.field_validation
            .entry(object_kind.into())
            .or_default()
            .insert(field_path.into(), attributes);
        self
    }

    /// Overrides this requester carries for the given object kind, if any
    pub fn overrides_for(&self, object_kind: &str) -> Option<&BTreeMap<String, Value>> {
        self.field_validation.get(object_kind)
    }
}

/// Per-run request envelope.
///
/// The candidate payload is mutated in place during validation (defaults
/// applied, forbidden fields trimmed or reverted). `metadata` is free-form
/// scratch space for middleware steps to enrich the request for later steps
/// and the terminal action; steps in one run execute strictly in order, so a
/// step always observes the metadata written by the steps before it.
#[derive(Debug, Clone)]
pub struct Request {
    pub id: Uuid,
    pub action: Action,
    pub object_kind: String,
    pub candidate: Value,
    pub prior: Option<Value>,
    pub requester: Requester,
    pub metadata: HashMap<String, Value>,
}

impl Request {
    pub fn new(
        action: Action,
        object_kind: impl Into<String>,
        candidate: Value,
        requester: Requester,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            object_kind: object_kind.into(),
            candidate,
            prior: None,
            requester,
            metadata: HashMap::new(),
        }
    }

    /// Attach the previously persisted version of the entity (absent on create)
    pub fn with_prior(mut self, prior: Value) -> Self {
        self.prior = Some(prior);
        self
    }
}
