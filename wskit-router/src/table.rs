//! The type-keyed route table: registration, lookup, and merge/mount
//! conflict resolution.

use std::collections::HashMap;
use std::sync::Arc;

use wskit_core::MessageDescriptor;

use crate::handler::{Handler, Middleware};

/// How to resolve a type collision during [`RouteTable::merge`] or
/// [`RouteTable::mount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnConflict {
    /// Fail the whole operation; the target table is left unchanged.
    Error,
    /// Keep the existing entry, drop the incoming one.
    Skip,
    /// Overwrite the existing entry with the incoming one.
    Replace,
}

/// A type was already registered and the conflict policy forbade the
/// second registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("route `{ty}` is already registered")]
pub struct DuplicateRoute {
    pub ty: String,
}

/// One registered route: a descriptor, its handler, and the middleware
/// chain run before the handler. Immutable after insertion -- [`RouteTable::mount`]
/// produces a new entry with a rewritten descriptor rather than mutating
/// the source table's entry in place.
pub struct RouteEntry<Ctx> {
    pub descriptor: Arc<MessageDescriptor>,
    pub handler: Arc<dyn Handler<Ctx>>,
    pub middleware: Vec<Arc<dyn Middleware<Ctx>>>,
}

impl<Ctx> Clone for RouteEntry<Ctx> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            handler: self.handler.clone(),
            middleware: self.middleware.clone(),
        }
    }
}

impl<Ctx> RouteEntry<Ctx> {
    pub fn new(descriptor: MessageDescriptor, handler: Arc<dyn Handler<Ctx>>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            handler,
            middleware: Vec::new(),
        }
    }

    pub fn with_middleware(mut self, middleware: Vec<Arc<dyn Middleware<Ctx>>>) -> Self {
        self.middleware = middleware;
        self
    }

    fn rewritten(&self, ty: &str) -> Self {
        Self {
            descriptor: Arc::new(self.descriptor.renamed(ty)),
            handler: self.handler.clone(),
            middleware: self.middleware.clone(),
        }
    }
}

/// Type -> [`RouteEntry`] map, built at setup time and treated as read-only
/// once serving starts (merge/mount are only meant to run before `serve`).
pub struct RouteTable<Ctx> {
    entries: HashMap<String, RouteEntry<Ctx>>,
}

impl<Ctx> Default for RouteTable<Ctx> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<Ctx> Clone for RouteTable<Ctx> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<Ctx> RouteTable<Ctx> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: RouteEntry<Ctx>) -> Result<(), DuplicateRoute> {
        let ty = entry.descriptor.ty().to_string();
        if self.entries.contains_key(&ty) {
            return Err(DuplicateRoute { ty });
        }
        self.entries.insert(ty, entry);
        Ok(())
    }

    pub fn get(&self, ty: &str) -> Option<&RouteEntry<Ctx>> {
        self.entries.get(ty)
    }

    pub fn list(&self) -> impl Iterator<Item = &RouteEntry<Ctx>> {
        self.entries.values()
    }

    fn insert_with_policy(
        &mut self,
        ty: String,
        entry: RouteEntry<Ctx>,
        on_conflict: OnConflict,
    ) -> Result<(), DuplicateRoute> {
        if self.entries.contains_key(&ty) {
            match on_conflict {
                OnConflict::Error => return Err(DuplicateRoute { ty }),
                OnConflict::Skip => return Ok(()),
                OnConflict::Replace => {}
            }
        }
        self.entries.insert(ty, entry);
        Ok(())
    }

    /// Merges `other`'s entries into `self` under `on_conflict`. On
    /// `OnConflict::Error`, the first colliding type aborts the merge and
    /// `self` is left exactly as it was before the call.
    pub fn merge(&mut self, other: &RouteTable<Ctx>, on_conflict: OnConflict) -> Result<(), DuplicateRoute> {
        if on_conflict == OnConflict::Error {
            for ty in other.entries.keys() {
                if self.entries.contains_key(ty) {
                    return Err(DuplicateRoute { ty: ty.clone() });
                }
            }
        }
        for (ty, entry) in &other.entries {
            self.insert_with_policy(ty.clone(), entry.clone(), on_conflict)?;
        }
        Ok(())
    }

    /// Merges `other`'s entries into `self` with every type rewritten to
    /// `prefix + type`. Conflict resolution runs against the prefixed
    /// names, after rewriting, per the mounting contract.
    pub fn mount(
        &mut self,
        prefix: &str,
        other: &RouteTable<Ctx>,
        on_conflict: OnConflict,
    ) -> Result<(), DuplicateRoute> {
        let rewritten: Vec<(String, RouteEntry<Ctx>)> = other
            .entries
            .values()
            .map(|entry| {
                let prefixed_ty = format!("{prefix}{}", entry.descriptor.ty());
                (prefixed_ty.clone(), entry.rewritten(&prefixed_ty))
            })
            .collect();

        if on_conflict == OnConflict::Error {
            for (ty, _) in &rewritten {
                if self.entries.contains_key(ty) {
                    return Err(DuplicateRoute { ty: ty.clone() });
                }
            }
        }
        for (ty, entry) in rewritten {
            self.insert_with_policy(ty, entry, on_conflict)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use wskit_core::MessageDescriptor;

    struct Ctx;

    struct NoopHandler;

    #[async_trait]
    impl Handler<Ctx> for NoopHandler {
        async fn call(&self, _ctx: &mut Ctx, _payload: Value) -> Result<(), String> {
            Ok(())
        }
    }

    fn entry(ty: &str) -> RouteEntry<Ctx> {
        RouteEntry::new(MessageDescriptor::event(ty), Arc::new(NoopHandler))
    }

    #[test]
    fn register_rejects_duplicate_type() {
        let mut table = RouteTable::new();
        table.register(entry("PING")).unwrap();
        let err = table.register(entry("PING")).unwrap_err();
        assert_eq!(err.ty, "PING");
    }

    #[test]
    fn merge_with_error_policy_leaves_target_unchanged_on_conflict() {
        let mut target = RouteTable::new();
        target.register(entry("PING")).unwrap();
        target.register(entry("PONG")).unwrap();

        let mut incoming = RouteTable::new();
        incoming.register(entry("PING")).unwrap();
        incoming.register(entry("ECHO")).unwrap();

        let err = target.merge(&incoming, OnConflict::Error).unwrap_err();
        assert_eq!(err.ty, "PING");
        assert!(target.get("ECHO").is_none());
        assert_eq!(target.list().count(), 2);
    }

    #[test]
    fn merge_with_replace_overwrites() {
        let mut target = RouteTable::new();
        target.register(entry("PING")).unwrap();

        let mut incoming = RouteTable::new();
        incoming.register(entry("PING")).unwrap();

        target.merge(&incoming, OnConflict::Replace).unwrap();
        assert_eq!(target.list().count(), 1);
    }

    #[test]
    fn merge_with_skip_keeps_existing() {
        let mut target = RouteTable::new();
        target.register(entry("PING")).unwrap();

        let mut incoming = RouteTable::new();
        incoming.register(entry("PING")).unwrap();
        incoming.register(entry("ECHO")).unwrap();

        target.merge(&incoming, OnConflict::Skip).unwrap();
        assert_eq!(target.list().count(), 2);
    }

    #[test]
    fn mount_prefixes_type_and_rewrites_descriptor() {
        let mut target = RouteTable::new();
        let mut other = RouteTable::new();
        other.register(entry("PING")).unwrap();

        target.mount("chat:", &other, OnConflict::Error).unwrap();
        let mounted = target.get("chat:PING").expect("mounted route present");
        assert_eq!(mounted.descriptor.ty(), "chat:PING");
        assert!(other.get("PING").is_some(), "source table untouched");
    }
}
