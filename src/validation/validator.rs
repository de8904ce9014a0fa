//! # Candidate Validator
//!
//! Recursively validates and normalizes a candidate object against a
//! (personalized) schema for a given action, requester and prior object
//! state. The candidate is mutated in place: defaults are applied, forbidden
//! fields are reverted to their prior values or trimmed, and date strings are
//! coerced. Processing is depth-first and stops at the first failing field;
//! the candidate is left normalized even when validation fails.
//!
//! Validation failures are values, never errors: the result is always a
//! [`ValidationOutcome`] and this module never panics on user input.

use crate::schema::node::{FieldGroup, FieldRule, FieldType, SchemaNode};
use crate::types::{Action, Requester};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Default cap on schema nesting depth during validation
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Result of validating one candidate object
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub reason: Option<String>,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Validates candidate objects against one schema.
///
/// Holds the schema immutably; safe to share across concurrent requests.
#[derive(Debug, Clone)]
pub struct Validator {
    schema: SchemaNode,
    max_depth: usize,
}

impl Validator {
    pub fn new(schema: SchemaNode) -> Self {
        Self {
            schema,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn schema(&self) -> &SchemaNode {
        &self.schema
    }

    /// Validate and normalize `candidate` in place.
    ///
    /// `prior` is the previously persisted version of the entity, absent on
    /// create. The action and requester are carried for diagnostics; the
    /// create/edit distinction is already expressed by the presence of
    /// `prior`.
    pub fn validate(
        &self,
        action: &Action,
        candidate: &mut Value,
        prior: Option<&Value>,
        requester: &Requester,
    ) -> ValidationOutcome {
        debug!(action = %action, requester = %requester.id, "validating candidate");

        let reason = match &self.schema {
            SchemaNode::Group(group) => {
                if !candidate.is_object() {
                    *candidate = Value::Object(Map::new());
                }
                match candidate.as_object_mut() {
                    Some(map) => {
                        self.check_group(group, map, prior.and_then(Value::as_object), "", 0)
                    }
                    None => None,
                }
            }
            SchemaNode::Leaf(rule) => self.check_value("value", rule, candidate, prior, 0),
        };

        match reason {
            Some(reason) => {
                warn!(action = %action, requester = %requester.id, %reason, "validation failed");
                ValidationOutcome::invalid(reason)
            }
            None => ValidationOutcome::valid(),
        }
    }

    fn check_group(
        &self,
        group: &FieldGroup,
        candidate: &mut Map<String, Value>,
        prior: Option<&Map<String, Value>>,
        prefix: &str,
        depth: usize,
    ) -> Option<String> {
        if depth >= self.max_depth {
            let at = if prefix.is_empty() { "candidate" } else { prefix };
            return Some(format!(
                "{at} exceeds max nesting depth: {}",
                self.max_depth
            ));
        }

        for (name, node) in &group.children {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };
            if let Some(reason) = self.check_field(&path, node, candidate, name, prior, depth) {
                return Some(reason);
            }
        }
        None
    }

    /// Run the per-field pipeline for one schema node against its slot in the
    /// candidate map. Returns the failure reason, if any.
    fn check_field(
        &self,
        path: &str,
        node: &SchemaNode,
        parent: &mut Map<String, Value>,
        key: &str,
        prior_parent: Option<&Map<String, Value>>,
        depth: usize,
    ) -> Option<String> {
        let prior_value = prior_parent
            .and_then(|map| map.get(key))
            .filter(|value| !value.is_null());

        match node {
            SchemaNode::Group(group) => {
                if group.allowed == Some(false) {
                    // Forbidden subtree: revert to prior or trim, no descent
                    match prior_value {
                        Some(prior) => {
                            parent.insert(key.to_string(), prior.clone());
                        }
                        None => {
                            parent.remove(key);
                        }
                    }
                    return None;
                }

                let existed = parent.contains_key(key);
                if !matches!(parent.get(key), Some(value) if value.is_object()) {
                    // Materialize so nested required/default rules can run
                    parent.insert(key.to_string(), Value::Object(Map::new()));
                }
                let reason = match parent.get_mut(key).and_then(Value::as_object_mut) {
                    Some(child) => self.check_group(
                        group,
                        child,
                        prior_value.and_then(Value::as_object),
                        path,
                        depth + 1,
                    ),
                    None => None,
                };
                if !existed
                    && parent
                        .get(key)
                        .and_then(Value::as_object)
                        .is_some_and(Map::is_empty)
                {
                    parent.remove(key);
                }
                reason
            }
            SchemaNode::Leaf(rule) => {
                let has_value = matches!(parent.get(key), Some(value) if !value.is_null());

                if rule.required && !has_value && prior_value.is_none() {
                    return Some(format!("Missing required field: {path}"));
                }

                if !rule.allowed {
                    // The field cannot be set by this request, whatever it contained
                    match (prior_value, &rule.default) {
                        (Some(prior), _) => {
                            parent.insert(key.to_string(), prior.clone());
                        }
                        (None, Some(default)) => {
                            parent.insert(key.to_string(), default.clone());
                        }
                        (None, None) => {
                            parent.remove(key);
                        }
                    }
                    return None;
                }

                if rule.unchangeable {
                    if let Some(prior) = prior_value {
                        parent.insert(key.to_string(), prior.clone());
                    }
                }

                let has_value = matches!(parent.get(key), Some(value) if !value.is_null());
                if !has_value {
                    match (&rule.default, prior_value) {
                        (Some(default), None) => {
                            parent.insert(key.to_string(), default.clone());
                        }
                        _ => return None,
                    }
                }

                let value = parent.get_mut(key)?;
                self.check_value(path, rule, value, prior_value, depth)
            }
        }
    }

    /// Type coercion, format, limit and entry checks for a leaf value.
    fn check_value(
        &self,
        path: &str,
        rule: &FieldRule,
        value: &mut Value,
        prior_value: Option<&Value>,
        depth: usize,
    ) -> Option<String> {
        if let Some(field_type) = rule.field_type {
            if let Some(reason) = coerce_and_check_format(path, field_type, value) {
                return Some(reason);
            }
        }

        if let Some(min) = rule.min {
            if let Some(n) = value.as_f64() {
                if n < min {
                    return Some(format!(
                        "{path} must be greater than the min: {}",
                        format_bound(min)
                    ));
                }
            }
        }

        if let Some(max) = rule.max {
            if let Some(n) = value.as_f64() {
                if n > max {
                    return Some(format!(
                        "{path} must be less than the max: {}",
                        format_bound(max)
                    ));
                }
            }
        }

        if let Some(length) = rule.length {
            if let Some(items) = value.as_array() {
                if items.len() > length {
                    return Some(format!("{path} must be less than max entries: {length}"));
                }
            }
        }

        if let Some(acceptable) = &rule.acceptable_values {
            match &*value {
                Value::Array(items) => {
                    for (index, item) in items.iter().enumerate() {
                        if !acceptable.accepts(item) {
                            return Some(format!(
                                "{path}[{index}] is UNACCEPTABLE! acceptable values are: [{}]",
                                acceptable.display_list()
                            ));
                        }
                    }
                }
                other => {
                    if !acceptable.accepts(other) {
                        return Some(format!(
                            "{path} is UNACCEPTABLE! acceptable values are: [{}]",
                            acceptable.display_list()
                        ));
                    }
                }
            }
        }

        if let Some(entries) = &rule.entries {
            if let Value::Array(items) = value {
                let prior_items = prior_value.and_then(Value::as_array);
                for (index, item) in items.iter_mut().enumerate() {
                    let element_path = format!("{path}[{index}]");
                    let prior_item = prior_items.and_then(|prior| prior.get(index));
                    let reason = match entries.as_ref() {
                        SchemaNode::Group(group) => match item.as_object_mut() {
                            Some(element) => self.check_group(
                                group,
                                element,
                                prior_item.and_then(Value::as_object),
                                &element_path,
                                depth + 1,
                            ),
                            None => Some(format!("{element_path} must be in format: object")),
                        },
                        SchemaNode::Leaf(element_rule) => self.check_value(
                            &element_path,
                            element_rule,
                            item,
                            prior_item,
                            depth + 1,
                        ),
                    };
                    if reason.is_some() {
                        return reason;
                    }
                }
            }
        }

        None
    }
}

/// Coerce date strings and verify the value matches the declared type.
fn coerce_and_check_format(path: &str, field_type: FieldType, value: &mut Value) -> Option<String> {
    let mismatch = || Some(format!("{path} must be in format: {}", field_type.wire_name()));

    match field_type {
        FieldType::String if value.is_string() => None,
        FieldType::Number if value.is_number() => None,
        FieldType::Boolean if value.is_boolean() => None,
        FieldType::Date => match coerce_date(value) {
            Some(()) => None,
            None => mismatch(),
        },
        FieldType::ObjectArray => match value {
            Value::Array(items) if items.iter().all(Value::is_object) => None,
            _ => mismatch(),
        },
        FieldType::StringArray
        | FieldType::NumberArray
        | FieldType::BooleanArray
        | FieldType::DateArray => {
            let Value::Array(items) = value else {
                return mismatch();
            };
            let Some(element_type) = field_type.element_type() else {
                return None;
            };
            for item in items.iter_mut() {
                let ok = match element_type {
                    FieldType::String => item.is_string(),
                    FieldType::Number => item.is_number(),
                    FieldType::Boolean => item.is_boolean(),
                    FieldType::Date => coerce_date(item).is_some(),
                    _ => false,
                };
                if !ok {
                    return mismatch();
                }
            }
            None
        }
        _ => mismatch(),
    }
}

/// Parse a date string and normalize it to RFC 3339 UTC in place.
/// A value that fails to parse is a format failure, not a silent drop.
fn coerce_date(value: &mut Value) -> Option<()> {
    let text = value.as_str()?;
    let parsed = parse_date(text)?;
    *value = Value::String(parsed.to_rfc3339());
    Some(())
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

/// Integral bounds print without a trailing `.0`
fn format_bound(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator(schema: Value) -> Validator {
        Validator::new(SchemaNode::from_value(&schema).unwrap())
    }

    fn anon() -> Requester {
        Requester::new("anon")
    }

    #[test]
    fn test_missing_required_field() {
        let validator = validator(json!({
            "name": { "type": "string", "required": true }
        }));
        let mut candidate = json!({});

        let outcome = validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert!(!outcome.is_valid);
        assert_eq!(
            outcome.reason.as_deref(),
            Some("Missing required field: name")
        );
    }

    #[test]
    fn test_required_satisfied_by_prior() {
        let validator = validator(json!({
            "name": { "type": "string", "required": true }
        }));
        let mut candidate = json!({});
        let prior = json!({"name": "scruffles"});

        let outcome = validator.validate(&Action::Edit, &mut candidate, Some(&prior), &anon());
        assert!(outcome.is_valid);
    }

    #[test]
    fn test_forbidden_field_reverts_to_prior() {
        let validator = validator(json!({
            "name": { "type": "string", "allowed": false }
        }));
        let mut candidate = json!({"name": "scruffles"});
        let prior = json!({"name": "puffles"});

        let outcome = validator.validate(&Action::Edit, &mut candidate, Some(&prior), &anon());
        assert!(outcome.is_valid);
        assert_eq!(candidate["name"], json!("puffles"));
    }

    #[test]
    fn test_forbidden_field_applies_default() {
        let validator = validator(json!({
            "status": { "allowed": false, "default": "PENDING" }
        }));
        let mut candidate = json!({"status": "APPROVED"});

        let outcome = validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert!(outcome.is_valid);
        assert_eq!(candidate["status"], json!("PENDING"));
    }

    #[test]
    fn test_forbidden_field_removed_entirely() {
        let validator = validator(json!({
            "secret": { "type": "string", "allowed": false }
        }));
        let mut candidate = json!({"secret": "hunter2"});

        let outcome = validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert!(outcome.is_valid);
        assert!(candidate.get("secret").is_none());
    }

    #[test]
    fn test_unchangeable_forced_back_to_prior() {
        let validator = validator(json!({
            "slug": { "type": "string", "unchangeable": true }
        }));
        let mut candidate = json!({"slug": "new-slug"});
        let prior = json!({"slug": "original-slug"});

        let outcome = validator.validate(&Action::Edit, &mut candidate, Some(&prior), &anon());
        assert!(outcome.is_valid);
        assert_eq!(candidate["slug"], json!("original-slug"));
    }

    #[test]
    fn test_unchangeable_settable_without_prior() {
        let validator = validator(json!({
            "slug": { "type": "string", "unchangeable": true }
        }));
        let mut candidate = json!({"slug": "first-slug"});

        let outcome = validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert!(outcome.is_valid);
        assert_eq!(candidate["slug"], json!("first-slug"));
    }

    #[test]
    fn test_default_applied_when_absent() {
        let validator = validator(json!({
            "tier": { "type": "string", "default": "BRONZE" }
        }));
        let mut candidate = json!({});

        let outcome = validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert!(outcome.is_valid);
        assert_eq!(candidate["tier"], json!("BRONZE"));
    }

    #[test]
    fn test_default_not_applied_over_prior() {
        let validator = validator(json!({
            "tier": { "type": "string", "default": "BRONZE" }
        }));
        let mut candidate = json!({});
        let prior = json!({"tier": "GOLD"});

        let outcome = validator.validate(&Action::Edit, &mut candidate, Some(&prior), &anon());
        assert!(outcome.is_valid);
        assert!(candidate.get("tier").is_none());
    }

    #[test]
    fn test_type_mismatch_message() {
        let validator = validator(json!({
            "paws": { "type": "number" }
        }));
        let mut candidate = json!({"paws": "four"});

        let outcome = validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert_eq!(
            outcome.reason.as_deref(),
            Some("paws must be in format: number")
        );
    }

    #[test]
    fn test_date_coercion() {
        let validator = validator(json!({
            "startsAt": { "type": "date" }
        }));
        let mut candidate = json!({"startsAt": "2024-06-01"});

        let outcome = validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert!(outcome.is_valid);
        assert_eq!(candidate["startsAt"], json!("2024-06-01T00:00:00+00:00"));
    }

    #[test]
    fn test_unparseable_date_is_format_failure() {
        let validator = validator(json!({
            "startsAt": { "type": "date" }
        }));
        let mut candidate = json!({"startsAt": "soonish"});

        let outcome = validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert_eq!(
            outcome.reason.as_deref(),
            Some("startsAt must be in format: date")
        );
    }

    #[test]
    fn test_min_max_messages() {
        let validator = validator(json!({
            "bid": { "type": "number", "min": 5, "max": 100 }
        }));

        let mut low = json!({"bid": 2});
        let outcome = validator.validate(&Action::Create, &mut low, None, &anon());
        assert_eq!(
            outcome.reason.as_deref(),
            Some("bid must be greater than the min: 5")
        );

        let mut high = json!({"bid": 250});
        let outcome = validator.validate(&Action::Create, &mut high, None, &anon());
        assert_eq!(
            outcome.reason.as_deref(),
            Some("bid must be less than the max: 100")
        );
    }

    #[test]
    fn test_length_limit() {
        let validator = validator(json!({
            "tags": { "type": "stringArray", "length": 2 }
        }));
        let mut candidate = json!({"tags": ["a", "b", "c"]});

        let outcome = validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert_eq!(
            outcome.reason.as_deref(),
            Some("tags must be less than max entries: 2")
        );
    }

    #[test]
    fn test_acceptable_values() {
        let validator = validator(json!({
            "breed": { "type": "string", "acceptableValues": ["poodle", "lab"] }
        }));
        let mut candidate = json!({"breed": "mutt"});

        let outcome = validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert_eq!(
            outcome.reason.as_deref(),
            Some("breed is UNACCEPTABLE! acceptable values are: [poodle,lab]")
        );
    }

    #[test]
    fn test_acceptable_values_wildcard() {
        let validator = validator(json!({
            "breed": { "type": "string", "acceptableValues": "*" }
        }));
        let mut candidate = json!({"breed": "mutt"});

        let outcome = validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert!(outcome.is_valid);
    }

    #[test]
    fn test_scalar_array_elements_checked() {
        let validator = validator(json!({
            "scores": { "type": "numberArray" }
        }));
        let mut candidate = json!({"scores": [1, 2, "three"]});

        let outcome = validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert_eq!(
            outcome.reason.as_deref(),
            Some("scores must be in format: numberArray")
        );
    }

    #[test]
    fn test_object_array_entries_report_index() {
        let validator = validator(json!({
            "doggieFriends": {
                "type": "objectArray",
                "entries": {
                    "name": { "type": "string", "required": true },
                    "paws": { "type": "number", "max": 4 }
                }
            }
        }));
        let mut candidate = json!({
            "doggieFriends": [
                {"name": "rex", "paws": 4},
                {"name": "spot", "paws": 4},
                {"name": "octo", "paws": 8}
            ]
        });

        let outcome = validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert_eq!(
            outcome.reason.as_deref(),
            Some("doggieFriends[2].paws must be less than the max: 4")
        );
    }

    #[test]
    fn test_acceptable_values_and_entries_on_same_field() {
        // both limit checks run against the same array value
        let validator = validator(json!({
            "litters": {
                "type": "objectArray",
                "acceptableValues": "*",
                "entries": {
                    "pups": { "type": "number", "max": 10 }
                }
            }
        }));
        let mut candidate = json!({"litters": [{"pups": 3}, {"pups": 12}]});

        let outcome = validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert_eq!(
            outcome.reason.as_deref(),
            Some("litters[1].pups must be less than the max: 10")
        );
    }

    #[test]
    fn test_acceptable_values_numeric_equivalence() {
        let validator = validator(json!({
            "paws": { "type": "number", "acceptableValues": [4] }
        }));

        let mut candidate = json!({"paws": 4.0});
        let outcome = validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert!(outcome.is_valid);

        let mut candidate = json!({"paws": 5});
        let outcome = validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert_eq!(
            outcome.reason.as_deref(),
            Some("paws is UNACCEPTABLE! acceptable values are: [4]")
        );
    }

    #[test]
    fn test_forbidden_group_trimmed_without_descent() {
        let validator = validator(json!({
            "internal": {
                "allowed": false,
                "score": { "type": "number", "required": true }
            }
        }));
        let mut candidate = json!({"internal": {"score": "not even a number"}});

        let outcome = validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert!(outcome.is_valid);
        assert!(candidate.get("internal").is_none());
    }

    #[test]
    fn test_forbidden_group_reverts_to_prior() {
        let validator = validator(json!({
            "internal": {
                "allowed": false,
                "score": { "type": "number" }
            }
        }));
        let mut candidate = json!({"internal": {"score": 9000}});
        let prior = json!({"internal": {"score": 10}});

        let outcome = validator.validate(&Action::Edit, &mut candidate, Some(&prior), &anon());
        assert!(outcome.is_valid);
        assert_eq!(candidate["internal"]["score"], json!(10));
    }

    #[test]
    fn test_nested_group_paths_in_messages() {
        let validator = validator(json!({
            "owner": {
                "email": { "type": "string", "required": true }
            }
        }));
        let mut candidate = json!({"owner": {}});

        let outcome = validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert_eq!(
            outcome.reason.as_deref(),
            Some("Missing required field: owner.email")
        );
    }

    #[test]
    fn test_schema_not_mutated_by_validation() {
        let schema = SchemaNode::from_value(&json!({
            "name": { "type": "string", "required": true }
        }))
        .unwrap();
        let validator = Validator::new(schema.clone());
        let mut candidate = json!({"name": "scruffles"});

        validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert_eq!(validator.schema(), &schema);
    }

    #[test]
    fn test_validation_idempotent_on_normalized_output() {
        let validator = validator(json!({
            "name": { "type": "string", "required": true },
            "tier": { "type": "string", "default": "BRONZE" },
            "secret": { "type": "string", "allowed": false },
            "startsAt": { "type": "date" }
        }));
        let mut candidate = json!({
            "name": "scruffles",
            "secret": "hunter2",
            "startsAt": "2024-06-01"
        });

        let first = validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert!(first.is_valid);
        let normalized = candidate.clone();

        let second = validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert!(second.is_valid);
        assert_eq!(candidate, normalized);
    }

    #[test]
    fn test_first_failure_wins_but_candidate_stays_normalized() {
        let validator = validator(json!({
            "alpha": { "type": "string", "allowed": false },
            "beta": { "type": "number" }
        }));
        let mut candidate = json!({"alpha": "trimmed", "beta": "oops"});

        let outcome = validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert!(!outcome.is_valid);
        // alpha was processed (and trimmed) before beta failed
        assert!(candidate.get("alpha").is_none());
    }

    #[test]
    fn test_depth_guard() {
        let validator = validator(json!({
            "a": { "b": { "c": { "d": { "x": { "type": "string" } } } } }
        }))
        .with_max_depth(3);
        let mut candidate = json!({"a": {"b": {"c": {"d": {"x": "deep"}}}}});

        let outcome = validator.validate(&Action::Create, &mut candidate, None, &anon());
        assert!(!outcome.is_valid);
        assert!(outcome
            .reason
            .as_deref()
            .unwrap()
            .contains("exceeds max nesting depth"));
    }
}
