//! The abstract transport seam. This crate models the client state
//! machine, queue, RPC correlation, and handler dispatch -- actual
//! WebSocket framing and socket I/O are out of scope and live behind this
//! trait, mirroring how `wskit-pubsub`'s drivers abstract over a broker
//! transport they don't implement themselves.

use async_trait::async_trait;
use wskit_core::Envelope;

/// One underlying connection attempt and its frame I/O.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establishes the connection. Returning `Err` is a failed attempt; the
    /// client engine treats it as `connecting -> closed`.
    async fn connect(&self) -> Result<(), String>;

    /// Writes one already-encoded frame. `Err` aborts an in-progress
    /// `flush` without re-queuing the frame.
    async fn send_frame(&self, frame: Envelope) -> Result<(), String>;

    /// Tears down the underlying connection, if any.
    async fn close(&self);
}
