use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Instant;

use crate::signaling::SignalingRouter;

use super::websocket::ConnectionManager;
use super::ServerConfig;

pub type GuardedSignalingRouter = Arc<SignalingRouter>;
pub type GuardedConnectionManager = Arc<ConnectionManager>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub router: GuardedSignalingRouter,
    pub ws_connection_manager: GuardedConnectionManager,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        router: GuardedSignalingRouter,
        ws_connection_manager: GuardedConnectionManager,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            router,
            ws_connection_manager,
        }
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedSignalingRouter {
    fn from_ref(input: &ServerState) -> Self {
        input.router.clone()
    }
}

impl FromRef<ServerState> for GuardedConnectionManager {
    fn from_ref(input: &ServerState) -> Self {
        input.ws_connection_manager.clone()
    }
}
