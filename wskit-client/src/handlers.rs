//! Multi-handler dispatch for inbound messages that are not RPC responses.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

type HandlerFn = Arc<dyn Fn(&Value) + Send + Sync>;

struct Registration {
    id: u64,
    handler: HandlerFn,
}

/// Holds every registered handler for every message type. `dispatch` takes
/// a snapshot of the handler array for a type before iterating it, so an
/// `unsubscribe` thunk fired from inside a handler cannot truncate the
/// in-progress iteration out from under it.
#[derive(Default)]
pub struct HandlerRegistry {
    by_type: Mutex<std::collections::HashMap<String, Vec<Registration>>>,
    next_id: AtomicU64,
}

/// Removes exactly the registration it was returned from. Calling it more
/// than once is a no-op after the first call.
pub struct Unsubscribe {
    registry: Arc<HandlerRegistry>,
    ty: String,
    id: u64,
}

impl Unsubscribe {
    pub fn call(self) {
        let mut by_type = self.registry.by_type.lock();
        if let Some(handlers) = by_type.get_mut(&self.ty) {
            handlers.retain(|registration| registration.id != self.id);
        }
    }
}

impl HandlerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers `handler` for `ty`. Returns a thunk that removes only this
    /// registration.
    pub fn on(
        self: &Arc<Self>,
        ty: impl Into<String>,
        handler: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Unsubscribe {
        let ty = ty.into();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.by_type
            .lock()
            .entry(ty.clone())
            .or_default()
            .push(Registration {
                id,
                handler: Arc::new(handler),
            });
        Unsubscribe {
            registry: self.clone(),
            ty,
            id,
        }
    }

    /// Invokes every handler registered for `ty` against `payload`, in
    /// registration order, against a snapshot taken before iteration
    /// begins. Each handler runs inside `catch_unwind`: a panic in one
    /// handler is logged and does not prevent the remaining handlers (or
    /// future dispatches) from running.
    pub fn dispatch(&self, ty: &str, payload: &Value) {
        let snapshot: Vec<HandlerFn> = {
            let by_type = self.by_type.lock();
            match by_type.get(ty) {
                Some(handlers) => handlers.iter().map(|r| r.handler.clone()).collect(),
                None => return,
            }
        };

        for handler in snapshot {
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| handler(payload)));
            if outcome.is_err() {
                tracing::warn!(r#type = ty, "inbound handler panicked, isolated from siblings");
            }
        }
    }

    pub fn handler_count(&self, ty: &str) -> usize {
        self.by_type.lock().get(ty).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn dispatch_invokes_every_registered_handler_in_order() {
        let registry = HandlerRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let o1 = order.clone();
        let o2 = order.clone();
        registry.on("PONG", move |_| o1.lock().push(1));
        registry.on("PONG", move |_| o2.lock().push(2));

        registry.dispatch("PONG", &json!({}));
        assert_eq!(*order.lock(), vec![1, 2]);
    }

    #[test]
    fn unsubscribe_removes_only_that_registration() {
        let registry = HandlerRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_a = count.clone();
        let count_b = count.clone();
        let unsub_a = registry.on("PONG", move |_| {
            count_a.fetch_add(1, Ordering::SeqCst);
        });
        registry.on("PONG", move |_| {
            count_b.fetch_add(1, Ordering::SeqCst);
        });

        unsub_a.call();
        registry.dispatch("PONG", &json!({}));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(registry.handler_count("PONG"), 1);
    }

    #[test]
    fn unsubscribe_called_during_dispatch_does_not_corrupt_iteration() {
        let registry = HandlerRegistry::new();
        let second_ran = Arc::new(AtomicUsize::new(0));
        let second_ran_clone = second_ran.clone();
        let registry_clone = registry.clone();

        // Registered first: unsubscribes the second handler while the
        // snapshot for this dispatch is already taken, so the second
        // handler still runs this round.
        let second_unsub_cell: Arc<Mutex<Option<Unsubscribe>>> = Arc::new(Mutex::new(None));
        let second_unsub_cell_clone = second_unsub_cell.clone();
        registry.on("PONG", move |_| {
            if let Some(unsub) = second_unsub_cell_clone.lock().take() {
                unsub.call();
            }
            let _ = &registry_clone;
        });
        let second_unsub = registry.on("PONG", move |_| {
            second_ran_clone.fetch_add(1, Ordering::SeqCst);
        });
        *second_unsub_cell.lock() = Some(second_unsub);

        registry.dispatch("PONG", &json!({}));
        assert_eq!(second_ran.load(Ordering::SeqCst), 1);
        assert_eq!(registry.handler_count("PONG"), 1);

        registry.dispatch("PONG", &json!({}));
        assert_eq!(second_ran.load(Ordering::SeqCst), 1, "removed before this round");
    }

    #[test]
    fn panicking_handler_does_not_block_siblings() {
        let registry = HandlerRegistry::new();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = ran.clone();
        registry.on("PONG", |_| panic!("boom"));
        registry.on("PONG", move |_| {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        });

        registry.dispatch("PONG", &json!({}));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
