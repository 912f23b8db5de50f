//! WebSocket transport for the signaling router.
//!
//! One connection per client; text frames carry the JSON envelopes defined in
//! [`crate::signaling::protocol`].

pub mod connection;
pub mod handler;

pub use connection::{ConnectionManager, SendError, DEFAULT_OUTBOUND_BUFFER};
pub use handler::ws_handler;
