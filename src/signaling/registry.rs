//! Identity registry.
//!
//! Holds the identity -> connection mapping together with the identity each
//! connection last registered as. Both live behind one mutex so that register,
//! lookup and conditional removal are atomic with respect to each other.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

/// Application-chosen identity used to address a party.
pub type UserId = String;

/// Opaque handle of a live transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Allocate a fresh, random connection handle.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What a registration changed besides the new mapping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegisterOutcome {
    /// Another connection that held the identity and lost it.
    pub evicted: Option<ConnectionId>,
    /// Identity this connection held before and no longer maps to it.
    pub released: Option<UserId>,
    /// The identity was not mapped to any connection before.
    pub inserted: bool,
}

#[derive(Default)]
struct RegistryState {
    /// user id -> connection
    identities: HashMap<UserId, ConnectionId>,
    /// connection -> identity it last registered as
    sessions: HashMap<ConnectionId, Option<UserId>>,
}

impl RegistryState {
    /// Remove `user_id` only if it still maps to `connection_id`.
    fn remove_if_owned(&mut self, user_id: &str, connection_id: ConnectionId) -> bool {
        if self.identities.get(user_id) == Some(&connection_id) {
            self.identities.remove(user_id);
            true
        } else {
            false
        }
    }
}

/// Process-wide identity registry.
#[derive(Default)]
pub struct Registry {
    state: Mutex<RegistryState>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate the bookkeeping slot of a freshly connected handle.
    pub fn connect(&self, connection_id: ConnectionId) {
        self.lock().sessions.entry(connection_id).or_insert(None);
    }

    /// Map `user_id` to `connection_id`, last registration wins.
    ///
    /// If the connection was registered under a different identity, that
    /// identity is released as long as it still points at this connection.
    pub fn register(&self, connection_id: ConnectionId, user_id: UserId) -> RegisterOutcome {
        let mut state = self.lock();

        let previous_identity = state
            .sessions
            .insert(connection_id, Some(user_id.clone()))
            .flatten();

        let released = match previous_identity {
            Some(previous) if previous != user_id => state
                .remove_if_owned(&previous, connection_id)
                .then_some(previous),
            _ => None,
        };

        let previous_holder = state.identities.insert(user_id, connection_id);
        let inserted = previous_holder.is_none();
        let evicted = previous_holder.filter(|holder| *holder != connection_id);

        RegisterOutcome {
            evicted,
            released,
            inserted,
        }
    }

    /// Resolve an identity to its current connection.
    pub fn resolve(&self, user_id: &str) -> Option<ConnectionId> {
        self.lock().identities.get(user_id).copied()
    }

    /// The identity `connection_id` last registered as, if any.
    pub fn identity_of(&self, connection_id: ConnectionId) -> Option<UserId> {
        self.lock().sessions.get(&connection_id).cloned().flatten()
    }

    /// Sender identity and target connection, read under a single lock.
    pub fn lookup_route(
        &self,
        from: ConnectionId,
        to: &str,
    ) -> (Option<UserId>, Option<ConnectionId>) {
        let state = self.lock();
        let sender = state.sessions.get(&from).cloned().flatten();
        let target = state.identities.get(to).copied();
        (sender, target)
    }

    /// Drop the connection's slot and its identity, unless a newer
    /// connection has taken that identity over since.
    ///
    /// Returns the identity that was removed. Calling it again for the same
    /// connection is a no-op.
    pub fn deregister(&self, connection_id: ConnectionId) -> Option<UserId> {
        let mut state = self.lock();
        let user_id = state.sessions.remove(&connection_id).flatten()?;
        state
            .remove_if_owned(&user_id, connection_id)
            .then_some(user_id)
    }

    /// Number of identities currently mapped.
    pub fn registered_count(&self) -> usize {
        self.lock().identities.len()
    }

    /// Number of connections with a bookkeeping slot.
    pub fn connection_count(&self) -> usize {
        self.lock().sessions.len()
    }
}
