//! Re-exports the client-side failure taxonomy. Kept as its own module
//! (rather than inline `pub use` in `lib.rs`) so call sites can write
//! `wskit_client::error::ClientError` alongside the crate's other
//! per-concern modules.

pub use wskit_core::ClientError;
