//! Signaling router.
//!
//! Turns inbound client events into deliveries addressed to specific
//! connections. The router never touches the transport: callers hand the
//! returned [`Delivery`] to whatever owns the connections.

use tracing::{debug, info};

use super::protocol::{ClientEvent, FailureReason, ServerEvent};
use super::registry::{ConnectionId, Registry, UserId};
use crate::server::metrics;

/// An outbound event addressed to one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub to: ConnectionId,
    pub event: ServerEvent,
}

impl Delivery {
    pub fn new(to: ConnectionId, event: ServerEvent) -> Self {
        Self { to, event }
    }
}

/// Routes signaling events between registered identities.
#[derive(Default)]
pub struct SignalingRouter {
    registry: Registry,
}

impl SignalingRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// A transport connection was established.
    pub fn connect(&self, connection_id: ConnectionId) {
        self.registry.connect(connection_id);
        debug!("Connection {} opened", connection_id);
    }

    /// A transport connection went away. Peers are not notified.
    ///
    /// Returns the identity that stopped resolving, if any.
    pub fn disconnect(&self, connection_id: ConnectionId) -> Option<UserId> {
        let removed = self.registry.deregister(connection_id);
        match &removed {
            Some(user_id) => {
                info!("Connection {} closed, removed user {}", connection_id, user_id);
                metrics::registered_user_removed();
            }
            None => debug!("Connection {} closed", connection_id),
        }
        removed
    }

    /// Process one event received from `from`.
    ///
    /// Returns at most one delivery; `None` means the event was consumed
    /// without producing any message.
    pub fn handle(&self, from: ConnectionId, event: ClientEvent) -> Option<Delivery> {
        let kind = event.kind();

        let (delivery, outcome) = match event {
            ClientEvent::Register { user_id } => {
                (Some(self.register(from, user_id)), metrics::OUTCOME_DELIVERED)
            }

            ClientEvent::CallOffer { to, offer } => {
                let (caller, target) = self.registry.lookup_route(from, &to);
                debug!("Call from {:?} to {}", caller, to);
                match target {
                    Some(target) => (
                        Some(Delivery::new(
                            target,
                            ServerEvent::IncomingCall {
                                from: caller,
                                offer,
                            },
                        )),
                        metrics::OUTCOME_DELIVERED,
                    ),
                    None => {
                        debug!("User not found: {}", to);
                        (
                            Some(Delivery::new(
                                from,
                                ServerEvent::CallFailed {
                                    reason: FailureReason::UserNotFound,
                                    target: to,
                                },
                            )),
                            metrics::OUTCOME_NOT_FOUND,
                        )
                    }
                }
            }

            ClientEvent::AcceptCall { to, answer } => {
                self.forward(&to, ServerEvent::CallAccepted { answer })
            }

            ClientEvent::IceCandidate { to, candidate } => {
                self.forward(&to, ServerEvent::IceCandidate { candidate })
            }

            ClientEvent::Hangup { to } => self.forward(&to, ServerEvent::CallEnded),

            ClientEvent::Ping => (
                Some(Delivery::new(from, ServerEvent::Pong)),
                metrics::OUTCOME_DELIVERED,
            ),
        };

        metrics::record_signaling_message(kind, outcome);
        delivery
    }

    fn register(&self, connection_id: ConnectionId, user_id: UserId) -> Delivery {
        let outcome = self.registry.register(connection_id, user_id.clone());
        info!("User {} registered on connection {}", user_id, connection_id);

        if let Some(evicted) = outcome.evicted {
            info!(
                "User {} moved from connection {} to {}",
                user_id, evicted, connection_id
            );
        }
        if let Some(released) = outcome.released {
            debug!(
                "Connection {} released previous identity {}",
                connection_id, released
            );
            metrics::registered_user_removed();
        }
        if outcome.inserted {
            metrics::registered_user_added();
        }

        Delivery::new(connection_id, ServerEvent::Registered { user_id })
    }

    /// Forward to the target's connection; a miss is dropped silently.
    fn forward(&self, to: &str, event: ServerEvent) -> (Option<Delivery>, &'static str) {
        match self.registry.resolve(to) {
            Some(target) => (Some(Delivery::new(target, event)), metrics::OUTCOME_DELIVERED),
            None => {
                debug!("Dropping {} for unknown user {}", event.kind(), to);
                (None, metrics::OUTCOME_DROPPED)
            }
        }
    }
}
