//! The on-wire message shape and the ingress normalization step.
//!
//! `Envelope` is the canonical `{type, meta?, payload?}` object every frame
//! is decoded into before it reaches a [`crate::validator::Validator`]. The
//! reserved-key stripping performed by [`Envelope::normalize`] is the trust
//! boundary described in the design notes: it must run after decode and
//! before validation, and it is not configurable away.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Meta keys the server owns. Clients may send them, but [`Envelope::normalize`]
/// strips them unconditionally before the message reaches a validator or handler.
pub const RESERVED_META_KEYS: &[&str] = &["timestamp", "correlationId"];

/// Returns `true` if `key` is one of [`RESERVED_META_KEYS`].
pub fn is_reserved_meta_key(key: &str) -> bool {
    RESERVED_META_KEYS.contains(&key)
}

/// The canonical wire envelope: a discriminator, optional metadata, and an
/// optional payload whose shape depends on `type`.
///
/// `meta` is a `BTreeMap` rather than `serde_json::Map` so that iteration
/// order is deterministic across the crate (tests and logs both rely on
/// this), mirroring the teacher's preference for ordered maps in
/// user-observable structures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Envelope {
    /// Builds an envelope with no metadata and no payload.
    pub fn new(ty: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            meta: BTreeMap::new(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    /// Strips every reserved meta key in place. O(|reserved|), not O(|meta|):
    /// reserved keys are removed by direct key lookup rather than by
    /// iterating and filtering the whole map.
    ///
    /// Decoding into [`Envelope`] already guarantees `meta` is a map (never
    /// an array or scalar) because of the `BTreeMap` field type, so the
    /// "missing / not an object / an array" cases from the abstract data
    /// model collapse to "absent" here; callers decoding from a raw
    /// [`serde_json::Value`] should use [`Envelope::from_raw_value`], which
    /// performs that coercion before this step runs.
    pub fn normalize(&mut self) {
        for key in RESERVED_META_KEYS {
            self.meta.remove(*key);
        }
    }

    /// Decodes a raw JSON value into an [`Envelope`], coercing a missing,
    /// non-object, or array `meta` field to an empty map rather than
    /// failing outright -- this keeps decode failures reserved for frames
    /// that are not even shaped like an envelope (see [`BadEnvelope`
    /// handling](crate::error::WireError::BadEnvelope)).
    pub fn from_raw_value(mut raw: Value) -> Result<Self, BadEnvelopeShape> {
        let obj = raw.as_object_mut().ok_or(BadEnvelopeShape::NotAnObject)?;

        match obj.get("meta") {
            Some(Value::Object(_)) => {}
            _ => {
                obj.insert("meta".to_string(), Value::Object(Default::default()));
            }
        }

        let ty = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or(BadEnvelopeShape::MissingOrNonStringType)?;
        if ty.is_empty() {
            return Err(BadEnvelopeShape::MissingOrNonStringType);
        }

        serde_json::from_value(raw).map_err(|_| BadEnvelopeShape::NotAnObject)
    }
}

/// Why a raw frame could not even be coerced into an [`Envelope`] shape.
/// Distinct from downstream validator issues: this is a decode-time
/// rejection, reported to the client as `BAD_ENVELOPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BadEnvelopeShape {
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("`type` is missing or not a non-empty string")]
    MissingOrNonStringType,
}
