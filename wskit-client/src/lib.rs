//! The client-side reliability engine: connection state machine, outbound
//! queue with overflow policy, RPC correlation, and a multi-handler
//! dispatch registry. Actual WebSocket framing and socket I/O are out of
//! scope -- see [`transport::Transport`], the seam production code plugs a
//! real connection into.

pub mod client;
pub mod config;
pub mod descriptor_type;
pub mod error;
pub mod handlers;
pub mod pending_rpc;
pub mod queue;
pub mod reconnect;
pub mod state;
pub mod transport;

pub use client::Client;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use descriptor_type::extract_type;
pub use error::ClientError;
pub use handlers::{HandlerRegistry, Unsubscribe};
pub use pending_rpc::{PendingRpcRegistry, DEFAULT_RPC_TIMEOUT};
pub use queue::{OutboundQueue, OverflowEvent, OverflowPolicy};
pub use reconnect::{backoff_delay, Jitter, NullJitter, RandJitter, ReconnectPolicy};
pub use state::ClientState;
pub use transport::Transport;
