//! The abstract validator contract, plus a reference JSON-structural
//! implementation.
//!
//! The server and client never depend on a concrete schema language: they
//! depend on [`Validator`]. [`JsonSchemaValidator`] exists so the crate's
//! own end-to-end scenarios (see `wskit-server`'s integration tests) are
//! runnable without wiring in an external schema library; production
//! deployments are expected to supply their own [`Validator`] adapter over
//! whatever schema language they prefer.

use serde_json::Value;

use crate::descriptor::{FieldKind, MessageDescriptor, MessageKind};
use crate::envelope::Envelope;

/// One structural complaint about a rejected payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dotted path to the offending field, `""` for envelope-level issues.
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// The result of validating one envelope against one descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Ok(Value),
    Err(Vec<ValidationIssue>),
}

impl ValidationOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ValidationOutcome::Ok(_))
    }
}

/// Abstract capability: parse a raw envelope against a descriptor's schema.
///
/// Implementations must, at minimum:
/// - reject envelopes whose `type` does not match `descriptor.ty()`;
/// - reject unknown payload properties even when the underlying schema
///   representation would otherwise default to open objects (strict mode);
/// - treat a descriptor with an empty payload schema as rejecting any
///   non-empty payload (the `PING`-style no-payload case).
pub trait Validator: Send + Sync {
    fn parse(&self, descriptor: &MessageDescriptor, envelope: &Envelope) -> ValidationOutcome;
}

/// Reference [`Validator`] built on structural checks over
/// [`crate::descriptor::PayloadSchema`] and `serde_json::Value`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSchemaValidator;

impl Validator for JsonSchemaValidator {
    fn parse(&self, descriptor: &MessageDescriptor, envelope: &Envelope) -> ValidationOutcome {
        if envelope.ty != descriptor.ty() {
            return ValidationOutcome::Err(vec![ValidationIssue::new(
                "type",
                format!(
                    "envelope type `{}` does not match descriptor type `{}`",
                    envelope.ty,
                    descriptor.ty()
                ),
            )]);
        }

        let schema = descriptor.payload_schema();
        let payload = envelope.payload.as_ref();

        if schema.is_empty_schema() {
            return match payload {
                None => ValidationOutcome::Ok(Value::Null),
                Some(Value::Null) => ValidationOutcome::Ok(Value::Null),
                Some(Value::Object(map)) if map.is_empty() => ValidationOutcome::Ok(Value::Null),
                Some(_) => ValidationOutcome::Err(vec![ValidationIssue::new(
                    "payload",
                    "descriptor declares no payload fields but a non-empty payload was sent",
                )]),
            };
        }

        let object = match payload {
            Some(Value::Object(map)) => map,
            _ => {
                return ValidationOutcome::Err(vec![ValidationIssue::new(
                    "payload",
                    "payload must be an object",
                )]);
            }
        };

        let mut issues = Vec::new();
        let mut known_keys = std::collections::HashSet::new();

        for field in schema.required() {
            known_keys.insert(field.name.as_str());
            match object.get(&field.name) {
                None => issues.push(ValidationIssue::new(
                    &field.name,
                    "required field is missing",
                )),
                Some(value) => {
                    if let Err(message) = check_field_kind(&field.kind, value) {
                        issues.push(ValidationIssue::new(&field.name, message));
                    }
                }
            }
        }

        for field in schema.optional() {
            known_keys.insert(field.name.as_str());
            if let Some(value) = object.get(&field.name) {
                if let Err(message) = check_field_kind(&field.kind, value) {
                    issues.push(ValidationIssue::new(&field.name, message));
                }
            }
        }

        for key in object.keys() {
            if !known_keys.contains(key.as_str()) {
                issues.push(ValidationIssue::new(key, "unknown payload property"));
            }
        }

        if issues.is_empty() {
            ValidationOutcome::Ok(Value::Object(object.clone()))
        } else {
            ValidationOutcome::Err(issues)
        }
    }
}

fn check_field_kind(kind: &FieldKind, value: &Value) -> Result<(), &'static str> {
    match kind {
        FieldKind::String => {
            if value.is_string() {
                Ok(())
            } else {
                Err("expected a string")
            }
        }
        FieldKind::JwtLike => match value.as_str() {
            Some(text) if is_jwt_like(text) => Ok(()),
            _ => Err("expected a JWT-shaped string (three dot-separated segments)"),
        },
        FieldKind::Number => {
            if value.is_number() {
                Ok(())
            } else {
                Err("expected a number")
            }
        }
        FieldKind::Bool => {
            if value.is_boolean() {
                Ok(())
            } else {
                Err("expected a boolean")
            }
        }
        FieldKind::Any => Ok(()),
    }
}

fn is_jwt_like(text: &str) -> bool {
    let segments: Vec<&str> = text.split('.').collect();
    segments.len() == 3 && segments.iter().all(|segment| !segment.is_empty())
}

/// Convenience helper used by descriptor registration: confirms a
/// descriptor's `kind` agrees with whether it carries a response
/// descriptor, matching the `kind == "rpc"` correlation in the data model.
pub fn kind_matches_response_presence(descriptor: &MessageDescriptor) -> bool {
    match descriptor.kind() {
        MessageKind::Rpc => descriptor.response_descriptor().is_some(),
        MessageKind::Event => descriptor.response_descriptor().is_none(),
    }
}
