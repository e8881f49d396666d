//! Robust extraction of the literal `type` discriminator from either shape
//! a descriptor-like JSON value may take.

use serde_json::Value;

/// Two shapes are supported:
///
/// - a wrapped descriptor carrying a public `type` property whose value is
///   the literal discriminator (e.g. `{"type": "PING", ...}`);
/// - a raw schema object whose own `type` keyword names the JSON Schema
///   kind (almost always the literal string `"object"`), with the real
///   discriminator nested at `properties.type.const`.
///
/// A value that would only ever resolve to the schema-kind string
/// `"object"` -- no nested `const` found -- is rejected: returning it would
/// silently use the schema's own shape as a fake message type.
pub fn extract_type(value: &Value) -> Option<String> {
    if let Some(ty) = value.get("type").and_then(Value::as_str) {
        if ty != "object" {
            return Some(ty.to_string());
        }
    }

    value
        .get("properties")
        .and_then(|properties| properties.get("type"))
        .and_then(|type_schema| type_schema.get("const"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
