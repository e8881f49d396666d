//! Type -> handler route table, generic over a connection context, plus a
//! hot-swappable [`Router`] facade applications hold onto directly.

pub mod handler;
pub mod router;
pub mod table;

pub use handler::{Handler, Middleware, MiddlewareOutcome, run_middleware_chain};
pub use router::{LifecycleHook, Router};
pub use table::{DuplicateRoute, OnConflict, RouteEntry, RouteTable};
