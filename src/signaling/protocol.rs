//! Signaling wire protocol.
//!
//! Every WebSocket text frame carries a JSON envelope of the form
//! `{"type": "<kind>", "payload": {...}}`. Inbound frames decode into
//! [`ClientEvent`], outbound frames are produced from [`ServerEvent`].
//! Offer, answer and candidate payloads are kept as the exact JSON text the
//! sender wrote and are copied into the forwarded frame untouched.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use thiserror::Error;

/// Opaque JSON fragment relayed verbatim between peers.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Box<RawValue>);

impl Payload {
    /// The literal `null`, used when a sender omits the field.
    pub fn null() -> Self {
        Self(RawValue::NULL.to_owned())
    }

    /// Wrap a JSON text, failing if it is not a single valid JSON value.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        RawValue::from_string(json.to_string()).map(Self)
    }

    /// The JSON text exactly as received.
    pub fn get(&self) -> &str {
        self.0.get()
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::null()
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get())
    }
}

/// Client -> Server events.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Claim an identity for this connection.
    Register { user_id: String },

    /// Start a call with `to`.
    CallOffer { to: String, offer: Payload },

    /// Accept a call previously offered by `to`.
    AcceptCall { to: String, answer: Payload },

    /// Network path candidate for `to`.
    IceCandidate { to: String, candidate: Payload },

    /// End the call with `to`.
    Hangup { to: String },

    /// Application level heartbeat, answered with [`ServerEvent::Pong`].
    Ping,
}

impl ClientEvent {
    /// Wire name of the event, used for logging and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientEvent::Register { .. } => msg_types::REGISTER,
            ClientEvent::CallOffer { .. } => msg_types::CALL_OFFER,
            ClientEvent::AcceptCall { .. } => msg_types::ACCEPT_CALL,
            ClientEvent::IceCandidate { .. } => msg_types::ICE_CANDIDATE,
            ClientEvent::Hangup { .. } => msg_types::HANGUP,
            ClientEvent::Ping => msg_types::PING,
        }
    }
}

/// Client -> Server envelope. The payload stays unparsed until the type is known.
#[derive(Deserialize)]
struct ClientMessage<'a> {
    #[serde(rename = "type")]
    msg_type: String,
    #[serde(default, borrow)]
    payload: Option<&'a RawValue>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterPayload {
    user_id: String,
}

#[derive(Deserialize)]
struct CallOfferPayload {
    to: String,
    #[serde(default)]
    offer: Payload,
}

#[derive(Deserialize)]
struct AcceptCallPayload {
    to: String,
    #[serde(default)]
    answer: Payload,
}

#[derive(Deserialize)]
struct IceCandidatePayload {
    to: String,
    #[serde(default)]
    candidate: Payload,
}

#[derive(Deserialize)]
struct HangupPayload {
    to: String,
}

/// Reason carried by a `call-failed` notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    UserNotFound,
}

/// Server -> Client events.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Sent once, right after the WebSocket is established.
    #[serde(rename_all = "camelCase")]
    Connected {
        connection_id: String,
        server_version: String,
    },

    /// Acknowledges a `register` with the accepted identity.
    #[serde(rename_all = "camelCase")]
    Registered { user_id: String },

    /// A call offer forwarded to its target. `from` is absent when the
    /// caller never registered.
    IncomingCall {
        #[serde(skip_serializing_if = "Option::is_none")]
        from: Option<String>,
        offer: Payload,
    },

    /// The offered target is not registered.
    CallFailed { reason: FailureReason, target: String },

    CallAccepted { answer: Payload },

    IceCandidate { candidate: Payload },

    CallEnded,

    Pong,

    /// The previous frame could not be processed.
    Error { code: String, message: String },
}

impl ServerEvent {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerEvent::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Wire name of the event.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => msg_types::CONNECTED,
            ServerEvent::Registered { .. } => msg_types::REGISTERED,
            ServerEvent::IncomingCall { .. } => msg_types::INCOMING_CALL,
            ServerEvent::CallFailed { .. } => msg_types::CALL_FAILED,
            ServerEvent::CallAccepted { .. } => msg_types::CALL_ACCEPTED,
            ServerEvent::IceCandidate { .. } => msg_types::ICE_CANDIDATE,
            ServerEvent::CallEnded => msg_types::CALL_ENDED,
            ServerEvent::Pong => msg_types::PONG,
            ServerEvent::Error { .. } => msg_types::ERROR,
        }
    }
}

/// Message type identifiers as they appear in the `type` field.
pub mod msg_types {
    pub const REGISTER: &str = "register";
    pub const CALL_OFFER: &str = "call-offer";
    /// Older clients name the offer `call`.
    pub const CALL: &str = "call";
    pub const ACCEPT_CALL: &str = "accept-call";
    pub const ICE_CANDIDATE: &str = "ice-candidate";
    pub const HANGUP: &str = "hangup";
    pub const PING: &str = "ping";

    pub const CONNECTED: &str = "connected";
    pub const REGISTERED: &str = "registered";
    pub const INCOMING_CALL: &str = "incoming-call";
    pub const CALL_FAILED: &str = "call-failed";
    pub const CALL_ACCEPTED: &str = "call-accepted";
    pub const CALL_ENDED: &str = "call-ended";
    pub const PONG: &str = "pong";
    pub const ERROR: &str = "error";
}

/// Error codes sent in [`ServerEvent::Error`].
pub mod error_codes {
    pub const PARSE_ERROR: &str = "parse_error";
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The frame or its payload is not valid JSON of the expected shape.
    #[error("Invalid message format: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unknown message type: {0}")]
    UnknownType(String),
}

/// Decode a text frame into a client event.
pub fn decode(text: &str) -> Result<ClientEvent, ProtocolError> {
    let message: ClientMessage = serde_json::from_str(text)?;
    let payload = message.payload.map(RawValue::get).unwrap_or("null");

    let event = match message.msg_type.as_str() {
        msg_types::REGISTER => {
            let RegisterPayload { user_id } = serde_json::from_str(payload)?;
            ClientEvent::Register { user_id }
        }
        msg_types::CALL_OFFER | msg_types::CALL => {
            let CallOfferPayload { to, offer } = serde_json::from_str(payload)?;
            ClientEvent::CallOffer { to, offer }
        }
        msg_types::ACCEPT_CALL => {
            let AcceptCallPayload { to, answer } = serde_json::from_str(payload)?;
            ClientEvent::AcceptCall { to, answer }
        }
        msg_types::ICE_CANDIDATE => {
            let IceCandidatePayload { to, candidate } = serde_json::from_str(payload)?;
            ClientEvent::IceCandidate { to, candidate }
        }
        msg_types::HANGUP => {
            let HangupPayload { to } = serde_json::from_str(payload)?;
            ClientEvent::Hangup { to }
        }
        msg_types::PING => ClientEvent::Ping,
        other => return Err(ProtocolError::UnknownType(other.to_string())),
    };

    Ok(event)
}

/// Encode a server event into a text frame.
pub fn encode(event: &ServerEvent) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(event)?)
}
