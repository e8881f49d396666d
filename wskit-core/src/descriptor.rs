//! Message descriptors: the `(type, schema, kind)` identity every route,
//! validator lookup, and client RPC correlation keys off of.

use std::sync::Arc;

use crate::envelope::is_reserved_meta_key;

/// Whether a descriptor models a fire-and-forget event or a request that
/// expects a correlated response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Event,
    Rpc,
}

/// The scalar shape a payload field must take. Kept intentionally small:
/// the validator contract in [`crate::validator`] is abstract, and this is
/// just enough structure for the reference [`crate::validator::JsonSchemaValidator`]
/// to exercise the end-to-end scenarios without pulling in an external
/// schema-language dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    String,
    /// Three dot-separated non-empty segments, e.g. a JWT-shaped token.
    /// Named after the `token: jwt-like` field used in the validation
    /// end-to-end scenario.
    JwtLike,
    Number,
    Bool,
    Any,
}

/// A single named field in a payload or meta schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Declares which payload fields a descriptor accepts. `required` and
/// `optional` are disjoint by construction (enforced in
/// [`PayloadSchema::new`]); any property outside of both is rejected in
/// strict mode by [`crate::validator::JsonSchemaValidator`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadSchema {
    required: Vec<FieldSchema>,
    optional: Vec<FieldSchema>,
}

impl PayloadSchema {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(required: Vec<FieldSchema>, optional: Vec<FieldSchema>) -> Self {
        Self { required, optional }
    }

    pub fn required(&self) -> &[FieldSchema] {
        &self.required
    }

    pub fn optional(&self) -> &[FieldSchema] {
        &self.optional
    }

    /// A schema with no fields declared at all -- the `PING`-style,
    /// no-payload descriptor that must reject any non-empty payload.
    pub fn is_empty_schema(&self) -> bool {
        self.required.is_empty() && self.optional.is_empty()
    }
}

/// An identifier + schema pair. Identity is the `type` string: two
/// descriptors with the same type are the same route key, regardless of
/// any other field. Immutable after construction -- every `with_*` builder
/// method consumes and returns `Self` rather than mutating in place.
#[derive(Debug, Clone)]
pub struct MessageDescriptor {
    ty: String,
    kind: MessageKind,
    payload_schema: PayloadSchema,
    meta_schema: Vec<FieldSchema>,
    response: Option<Arc<MessageDescriptor>>,
}

impl MessageDescriptor {
    pub fn event(ty: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            kind: MessageKind::Event,
            payload_schema: PayloadSchema::empty(),
            meta_schema: Vec::new(),
            response: None,
        }
    }

    pub fn rpc(ty: impl Into<String>, response: MessageDescriptor) -> Self {
        Self {
            ty: ty.into(),
            kind: MessageKind::Rpc,
            payload_schema: PayloadSchema::empty(),
            meta_schema: Vec::new(),
            response: Some(Arc::new(response)),
        }
    }

    pub fn with_payload_schema(mut self, schema: PayloadSchema) -> Self {
        self.payload_schema = schema;
        self
    }

    pub fn with_meta_schema(mut self, fields: Vec<FieldSchema>) -> Self {
        self.meta_schema = fields;
        self
    }

    pub fn ty(&self) -> &str {
        &self.ty
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn payload_schema(&self) -> &PayloadSchema {
        &self.payload_schema
    }

    pub fn meta_schema(&self) -> &[FieldSchema] {
        &self.meta_schema
    }

    pub fn response_descriptor(&self) -> Option<&MessageDescriptor> {
        self.response.as_deref()
    }

    /// Clones this descriptor with its `type` replaced. Used by route
    /// mounting, which rewrites every inbound type to `prefix + type`
    /// without mutating the original descriptor.
    pub fn renamed(&self, ty: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            ..self.clone()
        }
    }

    /// Registration-time guard: a schema must never attempt to declare one
    /// of the server-reserved meta keys. Fails fast with every offending
    /// key name rather than just the first, so a single registration pass
    /// reports the whole problem.
    pub fn validate_meta_schema(&self) -> Result<(), ReservedMetaKeyDeclared> {
        let offending: Vec<String> = self
            .meta_schema
            .iter()
            .filter(|field| is_reserved_meta_key(&field.name))
            .map(|field| field.name.clone())
            .collect();

        if offending.is_empty() {
            Ok(())
        } else {
            Err(ReservedMetaKeyDeclared { keys: offending })
        }
    }
}

/// A descriptor's meta schema declared one or more server-reserved keys.
/// Raised at registration time; must never reach the wire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("meta schema for descriptor declares reserved key(s): {}", keys.join(", "))]
pub struct ReservedMetaKeyDeclared {
    pub keys: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_meta_schema_lists_all_offenders() {
        let descriptor = MessageDescriptor::event("PING").with_meta_schema(vec![
            FieldSchema::new("timestamp", FieldKind::Number),
            FieldSchema::new("correlationId", FieldKind::String),
            FieldSchema::new("trace", FieldKind::String),
        ]);
        let err = descriptor.validate_meta_schema().unwrap_err();
        assert_eq!(err.keys, vec!["timestamp", "correlationId"]);
    }

    #[test]
    fn validate_meta_schema_passes_with_no_reserved_keys() {
        let descriptor = MessageDescriptor::event("PING")
            .with_meta_schema(vec![FieldSchema::new("trace", FieldKind::String)]);
        assert!(descriptor.validate_meta_schema().is_ok());
    }

    #[test]
    fn rpc_descriptor_carries_response() {
        let pong = MessageDescriptor::event("PONG");
        let ping = MessageDescriptor::rpc("PING", pong);
        assert_eq!(ping.kind(), MessageKind::Rpc);
        assert_eq!(ping.response_descriptor().unwrap().ty(), "PONG");
    }
}
