//! Shared vocabulary for the wskit message router: the wire envelope, the
//! message descriptor model, the validator contract, an injectable clock,
//! structured close reasons, a logging facade, and the error taxonomy.
//!
//! Every other `wskit-*` crate depends on this one and none of it depends
//! back, so the types here are the seam the rest of the workspace is built
//! against: `wskit-router` registers [`descriptor::MessageDescriptor`]s,
//! `wskit-ratelimit` and `wskit-client` both consume [`clock::Clock`], and
//! `wskit-server`'s dispatch pipeline produces [`error::WireError`]s at
//! every stage that can fail.

pub mod close;
pub mod clock;
pub mod descriptor;
pub mod envelope;
pub mod error;
pub mod logger;
pub mod validator;

pub use close::{CloseError, codes as close_codes};
pub use clock::{Clock, MockClock, Sleep, SystemClock};
pub use descriptor::{FieldKind, FieldSchema, MessageDescriptor, MessageKind, PayloadSchema};
pub use envelope::{BadEnvelopeShape, Envelope, RESERVED_META_KEYS, is_reserved_meta_key};
pub use error::{ClientError, ConfigError, WireError, WsKitError};
pub use logger::{CapturingLogger, LogRecord, LogSeverity, Logger, NullLogger, TracingLogger};
pub use validator::{JsonSchemaValidator, ValidationIssue, ValidationOutcome, Validator};
