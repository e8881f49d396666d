//! The hot-swappable router facade applications actually hold.
//!
//! Grounded in the teacher's `DefaultRouter` (`spark-router`): a route
//! table behind an [`ArcSwap`] so lookups never take a lock and updates are
//! a single atomic pointer swap, with old snapshots dropped once their last
//! reader is done. Where the teacher stores a flat `Vec<RouteEntry>` behind
//! one shared table, this router additionally concatenates lifecycle hooks
//! across merges, since `onOpen`/`onClose` fire for every merged router in
//! registration order.

use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;

use crate::handler::{Handler, Middleware};
use crate::table::{DuplicateRoute, OnConflict, RouteEntry, RouteTable};
use wskit_core::MessageDescriptor;

/// A connection lifecycle callback (`onOpen` / `onClose`).
#[async_trait]
pub trait LifecycleHook<Ctx>: Send + Sync {
    async fn call(&self, ctx: &mut Ctx);
}

#[async_trait]
impl<Ctx, F, Fut> LifecycleHook<Ctx> for F
where
    Ctx: Send + 'static,
    F: Fn(&mut Ctx) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = ()> + Send,
{
    async fn call(&self, ctx: &mut Ctx) {
        (self)(ctx).await
    }
}

/// A route table behind a lock-free hot-swap cell, plus the lifecycle
/// hooks that ride along with it across merges and mounts.
pub struct Router<Ctx> {
    table: ArcSwap<RouteTable<Ctx>>,
    on_open: Vec<Arc<dyn LifecycleHook<Ctx>>>,
    on_close: Vec<Arc<dyn LifecycleHook<Ctx>>>,
}

impl<Ctx> Default for Router<Ctx> {
    fn default() -> Self {
        Self {
            table: ArcSwap::from_pointee(RouteTable::new()),
            on_open: Vec::new(),
            on_close: Vec::new(),
        }
    }
}

impl<Ctx> Router<Ctx> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_open(&mut self, hook: Arc<dyn LifecycleHook<Ctx>>) {
        self.on_open.push(hook);
    }

    pub fn on_close(&mut self, hook: Arc<dyn LifecycleHook<Ctx>>) {
        self.on_close.push(hook);
    }

    pub fn open_hooks(&self) -> &[Arc<dyn LifecycleHook<Ctx>>] {
        &self.on_open
    }

    pub fn close_hooks(&self) -> &[Arc<dyn LifecycleHook<Ctx>>] {
        &self.on_close
    }

    /// Registers a single route. Builds a new table from the current
    /// snapshot plus the new entry and atomically swaps it in.
    pub fn register(
        &self,
        descriptor: MessageDescriptor,
        handler: Arc<dyn Handler<Ctx>>,
        middleware: Vec<Arc<dyn Middleware<Ctx>>>,
    ) -> Result<(), DuplicateRoute> {
        let mut next = (*self.table.load_full()).clone();
        next.register(RouteEntry::new(descriptor, handler).with_middleware(middleware))?;
        self.table.store(Arc::new(next));
        Ok(())
    }

    pub fn get(&self, ty: &str) -> Option<RouteEntry<Ctx>> {
        self.table.load_full().get(ty).cloned()
    }

    pub fn route_count(&self) -> usize {
        self.table.load_full().list().count()
    }

    /// Merges `other`'s routes into this router's table (delegating to
    /// [`RouteTable::merge`]) and concatenates `other`'s lifecycle hooks
    /// after this router's own, in order.
    pub fn add_routes(&mut self, other: &Router<Ctx>, on_conflict: OnConflict) -> Result<(), DuplicateRoute> {
        let mut next = (*self.table.load_full()).clone();
        next.merge(&other.table.load_full(), on_conflict)?;
        self.table.store(Arc::new(next));
        self.on_open.extend(other.on_open.iter().cloned());
        self.on_close.extend(other.on_close.iter().cloned());
        Ok(())
    }

    /// Mounts `other` under `prefix` (delegating to [`RouteTable::mount`])
    /// and concatenates lifecycle hooks the same way [`Router::add_routes`]
    /// does.
    pub fn mount(
        &mut self,
        prefix: &str,
        other: &Router<Ctx>,
        on_conflict: OnConflict,
    ) -> Result<(), DuplicateRoute> {
        let mut next = (*self.table.load_full()).clone();
        next.mount(prefix, &other.table.load_full(), on_conflict)?;
        self.table.store(Arc::new(next));
        self.on_open.extend(other.on_open.iter().cloned());
        self.on_close.extend(other.on_close.iter().cloned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Ctx;

    struct NoopHandler;

    #[async_trait]
    impl Handler<Ctx> for NoopHandler {
        async fn call(&self, _ctx: &mut Ctx, _payload: Value) -> Result<(), String> {
            Ok(())
        }
    }

    #[test]
    fn register_then_get_round_trips() {
        let router: Router<Ctx> = Router::new();
        router
            .register(MessageDescriptor::event("PING"), Arc::new(NoopHandler), vec![])
            .unwrap();
        assert!(router.get("PING").is_some());
        assert!(router.get("PONG").is_none());
    }

    #[test]
    fn add_routes_concatenates_open_hooks() {
        struct CountingHook(Arc<AtomicUsize>);
        #[async_trait]
        impl LifecycleHook<Ctx> for CountingHook {
            async fn call(&self, _ctx: &mut Ctx) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut base: Router<Ctx> = Router::new();
        let mut extra: Router<Ctx> = Router::new();
        let counter = Arc::new(AtomicUsize::new(0));
        base.on_open(Arc::new(CountingHook(counter.clone())));
        extra.on_open(Arc::new(CountingHook(counter.clone())));
        extra
            .register(MessageDescriptor::event("ECHO"), Arc::new(NoopHandler), vec![])
            .unwrap();

        base.add_routes(&extra, OnConflict::Error).unwrap();
        assert_eq!(base.open_hooks().len(), 2);
        assert!(base.get("ECHO").is_some());
    }

    #[test]
    fn route_table_snapshot_before_swap_is_unaffected_by_later_registration() {
        let router: Router<Ctx> = Router::new();
        router
            .register(MessageDescriptor::event("PING"), Arc::new(NoopHandler), vec![])
            .unwrap();
        let snapshot_count_before = router.route_count();
        router
            .register(MessageDescriptor::event("PONG"), Arc::new(NoopHandler), vec![])
            .unwrap();
        assert_eq!(snapshot_count_before, 1);
        assert_eq!(router.route_count(), 2);
    }
}
