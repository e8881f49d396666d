//! The handler and middleware seam a route table stores entries against.
//!
//! Both traits are generic over a connection context type `Ctx` rather than
//! any concrete connection struct, so this crate never depends on
//! `wskit-server`: the server crate supplies its own `HandlerContext` and
//! instantiates `RouteTable<ServerContext>`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

/// A registered message handler. Invoked once per inbound frame that
/// matches this route's descriptor, after validation has already produced
/// the parsed payload.
#[async_trait]
pub trait Handler<Ctx>: Send + Sync {
    async fn call(&self, ctx: &mut Ctx, payload: Value) -> Result<(), String>;
}

#[async_trait]
impl<Ctx, F, Fut> Handler<Ctx> for F
where
    Ctx: Send + 'static,
    F: Fn(&mut Ctx, Value) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<(), String>> + Send,
{
    async fn call(&self, ctx: &mut Ctx, payload: Value) -> Result<(), String> {
        (self)(ctx, payload).await
    }
}

/// What a middleware stage decided about an in-flight dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiddlewareOutcome {
    /// Proceed to the next middleware stage, or the handler if this was the
    /// last one.
    Continue,
    /// Stop the chain without invoking the handler. Not an error: the
    /// middleware has already produced whatever response it needed to.
    ShortCircuit,
    /// Stop the chain and treat this the same as a handler error.
    Error(String),
}

/// A middleware stage, run in registration order before the handler.
#[async_trait]
pub trait Middleware<Ctx>: Send + Sync {
    async fn call(&self, ctx: &mut Ctx, payload: &Value) -> MiddlewareOutcome;
}

/// Runs a middleware chain in order, short-circuiting on the first
/// non-`Continue` outcome. Returns `Ok(true)` if the handler should still
/// run, `Ok(false)` if a middleware short-circuited cleanly, or `Err` if a
/// middleware failed (to be treated as a handler error upstream).
pub async fn run_middleware_chain<Ctx: Send>(
    chain: &[Arc<dyn Middleware<Ctx>>],
    ctx: &mut Ctx,
    payload: &Value,
) -> Result<bool, String> {
    for middleware in chain {
        match middleware.call(ctx, payload).await {
            MiddlewareOutcome::Continue => continue,
            MiddlewareOutcome::ShortCircuit => return Ok(false),
            MiddlewareOutcome::Error(message) => return Err(message),
        }
    }
    Ok(true)
}
