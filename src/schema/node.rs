//! # Schema Nodes
//!
//! The declarative validation schema: a tree of [`SchemaNode`]s where each
//! node is either a [`Leaf`](SchemaNode::Leaf) describing one field's type,
//! permission and limit rules, or a [`Group`](SchemaNode::Group) describing a
//! nested object of child fields.
//!
//! ## Wire format
//!
//! Schemas are authored as plain nested maps and that format is preserved
//! bit-for-bit at the boundary: a mapping with a `type` key, or whose keys are
//! all leaf attribute names, parses as a Leaf; any other mapping parses as a
//! Group whose keys are child field names. A Group may carry an `allowed` key
//! alongside its children; `allowed: false` on a Group forbids the entire
//! subtree.
//!
//! ```rust
//! use steward_core::schema::SchemaNode;
//! use serde_json::json;
//!
//! let schema = SchemaNode::from_value(&json!({
//!     "name": { "type": "string", "required": true },
//!     "owner": {
//!         "allowed": false,
//!         "email": { "type": "string" }
//!     }
//! })).unwrap();
//! assert!(matches!(schema, SchemaNode::Group(_)));
//! ```

use crate::error::{Result, StewardError};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute names that may appear on a leaf node in the wire format.
const LEAF_ATTRIBUTES: [&str; 11] = [
    "type",
    "allowed",
    "required",
    "default",
    "locked",
    "unchangeable",
    "min",
    "max",
    "length",
    "acceptableValues",
    "entries",
];

/// Primitive field types, including their array forms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    StringArray,
    NumberArray,
    BooleanArray,
    DateArray,
    ObjectArray,
}

impl FieldType {
    /// Parse a wire-format type name
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "date" => Some(Self::Date),
            "stringArray" => Some(Self::StringArray),
            "numberArray" => Some(Self::NumberArray),
            "booleanArray" => Some(Self::BooleanArray),
            "dateArray" => Some(Self::DateArray),
            "objectArray" => Some(Self::ObjectArray),
            _ => None,
        }
    }

    /// The wire-format name, used verbatim in failure messages
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::StringArray => "stringArray",
            Self::NumberArray => "numberArray",
            Self::BooleanArray => "booleanArray",
            Self::DateArray => "dateArray",
            Self::ObjectArray => "objectArray",
        }
    }

    /// Element type for the scalar array forms
    pub fn element_type(&self) -> Option<FieldType> {
        match self {
            Self::StringArray => Some(Self::String),
            Self::NumberArray => Some(Self::Number),
            Self::BooleanArray => Some(Self::Boolean),
            Self::DateArray => Some(Self::Date),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Self::StringArray
                | Self::NumberArray
                | Self::BooleanArray
                | Self::DateArray
                | Self::ObjectArray
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

/// Closed set of acceptable values, or the `*` wildcard accepting anything
#[derive(Debug, Clone, PartialEq)]
pub enum AcceptableValues {
    Any,
    OneOf(Vec<Value>),
}

impl AcceptableValues {
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) if s == "*" => Ok(Self::Any),
            Value::Array(values) => Ok(Self::OneOf(values.clone())),
            other => Err(StewardError::schema(format!(
                "acceptableValues must be '*' or an array, got: {other}"
            ))),
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::OneOf(values) => values.iter().any(|member| loose_equal(member, value)),
        }
    }

    /// Comma-joined value list for failure messages, strings unquoted
    pub fn display_list(&self) -> String {
        match self {
            Self::Any => "*".to_string(),
            Self::OneOf(values) => values
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Any => Value::String("*".to_string()),
            Self::OneOf(values) => Value::Array(values.clone()),
        }
    }
}

/// A leaf node: one field's type, permission and limit rules
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    /// Primitive type; a permission-only leaf (e.g. `{allowed: false}`) has none
    pub field_type: Option<FieldType>,
    /// May the requester set this field at all
    pub allowed: bool,
    pub required: bool,
    /// Applied when neither candidate nor prior carries a value
    pub default: Option<Value>,
    /// A locked node ignores all personalization overrides
    pub locked: bool,
    /// Once set on a prior object the value can never change
    pub unchangeable: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Max element count for array fields
    pub length: Option<usize>,
    pub acceptable_values: Option<AcceptableValues>,
    /// Element shape for array fields
    pub entries: Option<Box<SchemaNode>>,
}

impl Default for FieldRule {
    fn default() -> Self {
        Self {
            field_type: None,
            allowed: true,
            required: false,
            default: None,
            locked: false,
            unchangeable: false,
            min: None,
            max: None,
            length: None,
            acceptable_values: None,
            entries: None,
        }
    }
}

impl FieldRule {
    /// Apply one wire-format attribute. Shared by schema parsing and
    /// personalization merging so both sides agree on attribute semantics.
    pub(crate) fn apply_attribute(&mut self, key: &str, value: &Value) -> Result<()> {
        match key {
            "type" => {
                let name = value.as_str().ok_or_else(|| {
                    StewardError::schema(format!("type must be a string, got: {value}"))
                })?;
                self.field_type = Some(FieldType::parse(name).ok_or_else(|| {
                    StewardError::schema(format!("unknown field type: {name}"))
                })?);
            }
            "allowed" => self.allowed = expect_bool(key, value)?,
            "required" => self.required = expect_bool(key, value)?,
            "default" => self.default = Some(value.clone()),
            "locked" => self.locked = expect_bool(key, value)?,
            "unchangeable" => self.unchangeable = expect_bool(key, value)?,
            "min" => self.min = Some(expect_number(key, value)?),
            "max" => self.max = Some(expect_number(key, value)?),
            "length" => {
                let n = expect_number(key, value)?;
                if n < 0.0 || n.fract() != 0.0 {
                    return Err(StewardError::schema(format!(
                        "length must be a non-negative integer, got: {value}"
                    )));
                }
                self.length = Some(n as usize);
            }
            "acceptableValues" => {
                self.acceptable_values = Some(AcceptableValues::from_value(value)?);
            }
            "entries" => self.entries = Some(Box::new(SchemaNode::from_value(value)?)),
            other => {
                return Err(StewardError::schema(format!(
                    "unknown field attribute: {other}"
                )))
            }
        }
        Ok(())
    }
}

/// A group node: a nested object of child fields, optionally forbidden wholesale
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldGroup {
    /// `Some(false)` forbids the entire subtree regardless of child configs
    pub allowed: Option<bool>,
    pub children: BTreeMap<String, SchemaNode>,
}

/// A validation schema node: exactly one of leaf or group
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Leaf(FieldRule),
    Group(FieldGroup),
}

impl SchemaNode {
    /// Parse a schema from the plain-map wire format
    pub fn from_value(value: &Value) -> Result<SchemaNode> {
        let map = value.as_object().ok_or_else(|| {
            StewardError::schema(format!("schema node must be a mapping, got: {value}"))
        })?;

        if is_leaf_shape(map) {
            let mut rule = FieldRule::default();
            for (key, attr) in map {
                rule.apply_attribute(key, attr)?;
            }
            Ok(SchemaNode::Leaf(rule))
        } else {
            let mut group = FieldGroup::default();
            for (key, child) in map {
                if key == "allowed" {
                    group.allowed = Some(expect_bool(key, child)?);
                } else {
                    group.children.insert(key.clone(), Self::from_value(child)?);
                }
            }
            Ok(SchemaNode::Group(group))
        }
    }

    /// Serialize back to the plain-map wire format.
    ///
    /// Attributes holding their defaults are omitted; reparsing the result
    /// yields an equal node.
    pub fn to_value(&self) -> Value {
        match self {
            SchemaNode::Leaf(rule) => {
                let mut map = Map::new();
                if let Some(ftype) = rule.field_type {
                    map.insert("type".into(), Value::String(ftype.wire_name().into()));
                }
                if !rule.allowed {
                    map.insert("allowed".into(), Value::Bool(false));
                }
                if rule.required {
                    map.insert("required".into(), Value::Bool(true));
                }
                if let Some(default) = &rule.default {
                    map.insert("default".into(), default.clone());
                }
                if rule.locked {
                    map.insert("locked".into(), Value::Bool(true));
                }
                if rule.unchangeable {
                    map.insert("unchangeable".into(), Value::Bool(true));
                }
                if let Some(min) = rule.min {
                    map.insert("min".into(), number_value(min));
                }
                if let Some(max) = rule.max {
                    map.insert("max".into(), number_value(max));
                }
                if let Some(length) = rule.length {
                    map.insert("length".into(), Value::from(length));
                }
                if let Some(acceptable) = &rule.acceptable_values {
                    map.insert("acceptableValues".into(), acceptable.to_value());
                }
                if let Some(entries) = &rule.entries {
                    map.insert("entries".into(), entries.to_value());
                }
                Value::Object(map)
            }
            SchemaNode::Group(group) => {
                let mut map = Map::new();
                if let Some(allowed) = group.allowed {
                    map.insert("allowed".into(), Value::Bool(allowed));
                }
                for (name, child) in &group.children {
                    map.insert(name.clone(), child.to_value());
                }
                Value::Object(map)
            }
        }
    }
}

/// A mapping is a leaf when it carries a `type` key or when every key is a
/// leaf attribute name. An empty mapping is a group with no children.
fn is_leaf_shape(map: &Map<String, Value>) -> bool {
    map.contains_key("type")
        || (!map.is_empty() && map.keys().all(|k| LEAF_ATTRIBUTES.contains(&k.as_str())))
}

/// Membership equality: integer and float representations of the same number
/// are the same value (`[5]` accepts `5.0`); everything else compares strictly.
fn loose_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn expect_bool(key: &str, value: &Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| StewardError::schema(format!("{key} must be a boolean, got: {value}")))
}

fn expect_number(key: &str, value: &Value) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| StewardError::schema(format!("{key} must be a number, got: {value}")))
}

/// Emit integral bounds without a trailing `.0`
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}
