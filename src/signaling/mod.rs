//! Signaling core.
//!
//! Maps application-chosen identities to live connections and routes call-setup
//! messages (offers, answers, ICE candidates, hangups) between them. The payloads
//! themselves are opaque to this module.

pub mod protocol;
pub mod registry;
pub mod router;

pub use protocol::{ClientEvent, FailureReason, Payload, ProtocolError, ServerEvent};
pub use registry::{ConnectionId, RegisterOutcome, Registry, UserId};
pub use router::{Delivery, SignalingRouter};
