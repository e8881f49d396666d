//! The inbound dispatch pipeline: decode, normalize, route, rate-limit,
//! validate, run middleware, invoke handler -- one stage per numbered step
//! in the design notes, each logging at the seam where it classifies an
//! error rather than letting a bare exception bubble to a generic catch.

use std::sync::Arc;

use serde_json::Value;
use wskit_core::{Envelope, LogRecord, LogSeverity, Logger, Validator, ValidationOutcome, WireError};
use wskit_ratelimit::RateLimiter;
use wskit_router::Router;

use crate::config::UnknownRouteBehavior;
use crate::context::ConnectionContext;

/// The assembled, read-only pipeline a connection task dispatches every
/// inbound frame through. Cheap to clone (every field is an `Arc`), so one
/// instance is shared across every connection.
#[derive(Clone)]
pub struct Engine {
    router: Arc<Router<ConnectionContext>>,
    rate_limiter: Option<Arc<RateLimiter>>,
    validator: Arc<dyn Validator>,
    logger: Arc<dyn Logger>,
    unknown_route_behavior: UnknownRouteBehavior,
}

impl Engine {
    pub fn router(&self) -> &Arc<Router<ConnectionContext>> {
        &self.router
    }

    pub fn new(
        router: Arc<Router<ConnectionContext>>,
        rate_limiter: Option<Arc<RateLimiter>>,
        validator: Arc<dyn Validator>,
        logger: Arc<dyn Logger>,
        unknown_route_behavior: UnknownRouteBehavior,
    ) -> Self {
        Self {
            router,
            rate_limiter,
            validator,
            logger,
            unknown_route_behavior,
        }
    }

    fn log(&self, severity: LogSeverity, message: &str, client_id: &str, ty: Option<&str>) {
        let mut record = LogRecord::new(severity, message).with_field("client_id", client_id);
        if let Some(ty) = ty {
            record = record.with_field("type", ty);
        }
        self.logger.log(record);
    }

    fn emit(&self, ctx: &ConnectionContext, error: WireError) {
        ctx.send(error.wire_type(), error.wire_payload());
    }

    /// Runs one raw frame through the full pipeline. `raw` is already
    /// decoded from the wire codec (JSON by default) into a
    /// [`serde_json::Value`]; transport-level framing is out of scope here.
    pub async fn dispatch(&self, ctx: &mut ConnectionContext, raw: Value) {
        let client_id = ctx.client_id().to_string();
        ctx.reset_response_sent();

        // 1-3: decode + normalize + type presence, folded into `Envelope::from_raw_value`.
        let mut envelope = match Envelope::from_raw_value(raw) {
            Ok(envelope) => envelope,
            Err(shape) => {
                let error = WireError::BadEnvelope {
                    reason: shape.to_string(),
                };
                self.log(LogSeverity::Warn, "rejected malformed frame", &client_id, None);
                self.emit(ctx, error);
                return;
            }
        };
        // Capture the inbound correlation id before normalize strips it
        // (it's server-reserved) so `ctx.send` can still copy it into the
        // response.
        let correlation_id = envelope
            .meta
            .get("correlationId")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        ctx.set_inbound_correlation_id(correlation_id);
        envelope.normalize();

        // 4: route lookup.
        let Some(entry) = self.router.get(&envelope.ty) else {
            if self.unknown_route_behavior == UnknownRouteBehavior::Emit {
                self.log(LogSeverity::Debug, "no route for type", &client_id, Some(&envelope.ty));
                self.emit(
                    ctx,
                    WireError::UnknownType {
                        ty: envelope.ty.clone(),
                    },
                );
            }
            return;
        };

        // 5: rate limit gate.
        if let Some(limiter) = &self.rate_limiter {
            let result = limiter.consume(&client_id, 1);
            if !result.allowed {
                let retry_after_ms = result.retry_after_ms.unwrap_or(0);
                self.log(LogSeverity::Info, "rate limit denial", &client_id, Some(&envelope.ty));
                self.emit(
                    ctx,
                    WireError::RateExhausted {
                        key: client_id.clone(),
                        retry_after_ms,
                    },
                );
                return;
            }
        }

        // 6: validate.
        let payload = match self.validator.parse(&entry.descriptor, &envelope) {
            ValidationOutcome::Ok(value) => value,
            ValidationOutcome::Err(issues) => {
                self.log(LogSeverity::Info, "validation failed", &client_id, Some(&envelope.ty));
                self.emit(
                    ctx,
                    WireError::ValidationFailed {
                        ty: envelope.ty.clone(),
                        issues,
                    },
                );
                return;
            }
        };

        // 7: middleware chain.
        match wskit_router::run_middleware_chain(&entry.middleware, ctx, &payload).await {
            Ok(true) => {}
            Ok(false) => return,
            Err(detail) => {
                self.log(LogSeverity::Error, "middleware error", &client_id, Some(&envelope.ty));
                self.emit(
                    ctx,
                    WireError::HandlerError {
                        ty: envelope.ty.clone(),
                        detail,
                    },
                );
                return;
            }
        }

        // 8-9: handler invocation, errors caught and reported as INTERNAL_ERROR
        // unless the handler already sent a response of its own.
        if let Err(detail) = entry.handler.call(ctx, payload).await {
            self.log(LogSeverity::Error, "handler error", &client_id, Some(&envelope.ty));
            if !ctx.response_sent() {
                self.emit(
                    ctx,
                    WireError::HandlerError {
                        ty: envelope.ty.clone(),
                        detail,
                    },
                );
            }
        }
    }
}
