//! Peer Signaling Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod server;
pub mod signaling;

// Re-export commonly used types for convenience
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
pub use signaling::{ClientEvent, ConnectionId, ServerEvent, SignalingRouter};
