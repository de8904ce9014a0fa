//! # Schema Personalization
//!
//! Derives a per-requester schema by merging the requester's overrides into a
//! structural copy of the base schema. The base schema is never mutated and
//! the returned schema never shares identity with it, so concurrent requests
//! can personalize from the same base without coordination.
//!
//! Merge rules over the tagged node union:
//! - a base node marked `locked` ignores all overrides for that path;
//! - a node's `type` attribute is never changed by an override, even when the
//!   override supplies one;
//! - everything else merges attribute-wise;
//! - paths absent from the base schema are created from the override
//!   (extension is allowed).

use crate::error::{Result, StewardError};
use crate::schema::node::{FieldGroup, SchemaNode};
use crate::types::Requester;
use serde_json::Value;
use tracing::{debug, warn};

/// Produce the effective schema for a requester acting on an object kind.
///
/// With no overrides for the kind this returns an equivalent but
/// referentially-distinct copy of the base schema.
pub fn personalize(
    base: &SchemaNode,
    requester: &Requester,
    object_kind: &str,
) -> Result<SchemaNode> {
    let mut schema = base.clone();

    if let Some(overrides) = requester.overrides_for(object_kind) {
        debug!(
            requester = %requester.id,
            object_kind,
            override_count = overrides.len(),
            "personalizing schema"
        );
        for (field_path, attributes) in overrides {
            apply_override(&mut schema, field_path, attributes)?;
        }
    }

    Ok(schema)
}

/// Merge one override (a partial node in wire format) at a dotted field path.
fn apply_override(schema: &mut SchemaNode, field_path: &str, attributes: &Value) -> Result<()> {
    let mut current = schema;
    let mut segments = field_path.split('.').peekable();

    while let Some(segment) = segments.next() {
        let group = match current {
            SchemaNode::Group(group) => group,
            SchemaNode::Leaf(_) => {
                // The path descends through a leaf; nothing sane to merge into.
                warn!(field_path, "override path crosses a leaf node, ignoring");
                return Ok(());
            }
        };

        if segments.peek().is_none() {
            match group.children.get_mut(segment) {
                Some(child) => merge_attributes(child, field_path, attributes)?,
                None => {
                    // Extension: the override introduces a field the base lacks
                    group
                        .children
                        .insert(segment.to_string(), SchemaNode::from_value(attributes)?);
                }
            }
            return Ok(());
        }

        current = group
            .children
            .entry(segment.to_string())
            .or_insert_with(|| SchemaNode::Group(FieldGroup::default()));
    }

    Ok(())
}

fn merge_attributes(node: &mut SchemaNode, field_path: &str, attributes: &Value) -> Result<()> {
    let map = attributes.as_object().ok_or_else(|| {
        StewardError::schema(format!(
            "override for '{field_path}' must be a mapping, got: {attributes}"
        ))
    })?;

    match node {
        SchemaNode::Leaf(rule) => {
            if rule.locked {
                debug!(field_path, "field is locked, ignoring override");
                return Ok(());
            }
            for (key, value) in map {
                if key == "type" {
                    // type is immutable once published in a base schema
                    continue;
                }
                rule.apply_attribute(key, value)?;
            }
        }
        SchemaNode::Group(group) => {
            // Only the subtree permission flag is meaningful on a group
            if let Some(allowed) = map.get("allowed").and_then(Value::as_bool) {
                group.allowed = Some(allowed);
            }
        }
    }

    Ok(())
}
