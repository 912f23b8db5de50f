//! WebSocket route handler.
//!
//! Handles WebSocket upgrade, the per-connection read loop, heartbeats and
//! cleanup. Each connection gets one reader (this task) and one writer task,
//! so events from a single connection are processed strictly in order.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::server::metrics;
use crate::server::state::{GuardedConnectionManager, GuardedSignalingRouter};
use crate::server::{HeartbeatConfig, ServerConfig};
use crate::signaling::protocol::{self, error_codes};
use crate::signaling::{ConnectionId, Delivery, ServerEvent, SignalingRouter};

use super::connection::ConnectionManager;

/// State needed for WebSocket handling (internal).
struct WsState {
    connection_manager: Arc<ConnectionManager>,
    router: Arc<SignalingRouter>,
    heartbeat: HeartbeatConfig,
}

/// WebSocket upgrade handler for `GET /v1/ws`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(connection_manager): State<GuardedConnectionManager>,
    State(router): State<GuardedSignalingRouter>,
    State(config): State<ServerConfig>,
) -> Response {
    let state = Arc::new(WsState {
        connection_manager,
        router,
        heartbeat: config.heartbeat,
    });

    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn server_version() -> String {
    env!("SERVER_VERSION").to_string()
}

/// Handle an established WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<WsState>) {
    let connection_id = ConnectionId::new();
    debug!("WebSocket connected: {}", connection_id);

    let outgoing_rx = state.connection_manager.register(connection_id).await;
    state.router.connect(connection_id);
    metrics::ws_connection_opened();

    let (ws_sink, ws_stream) = socket.split();

    let connected = ServerEvent::Connected {
        connection_id: connection_id.to_string(),
        server_version: server_version(),
    };

    let outgoing_handle = tokio::spawn(forward_outgoing(
        ws_sink,
        outgoing_rx,
        connected,
        state.heartbeat.ping_interval,
    ));

    process_incoming(ws_stream, connection_id, &state).await;

    debug!("WebSocket disconnected: {}", connection_id);
    outgoing_handle.abort();

    state.router.disconnect(connection_id);
    state.connection_manager.unregister(connection_id).await;
    metrics::ws_connection_closed();
}

async fn send_event(
    ws_sink: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    match protocol::encode(event) {
        Ok(json) => ws_sink.send(Message::Text(json.into())).await,
        Err(e) => {
            error!("Failed to serialize WebSocket message: {}", e);
            Ok(())
        }
    }
}

/// Forward events from the outgoing channel to the WebSocket, pinging the
/// peer every `ping_interval`.
async fn forward_outgoing(
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outgoing_rx: mpsc::Receiver<ServerEvent>,
    initial_event: ServerEvent,
    ping_interval: Duration,
) {
    if send_event(&mut ws_sink, &initial_event).await.is_err() {
        return;
    }

    let mut ticker = tokio::time::interval(ping_interval);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            event = outgoing_rx.recv() => match event {
                Some(event) => {
                    if send_event(&mut ws_sink, &event).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            _ = ticker.tick() => {
                if ws_sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Process incoming frames until the peer closes, errors or goes quiet for
/// longer than the ping timeout.
async fn process_incoming(
    mut ws_stream: SplitStream<WebSocket>,
    connection_id: ConnectionId,
    state: &WsState,
) {
    loop {
        let result = match tokio::time::timeout(state.heartbeat.ping_timeout, ws_stream.next()).await
        {
            Ok(Some(result)) => result,
            Ok(None) => break,
            Err(_) => {
                debug!(
                    "Connection {} silent for {:?}, closing",
                    connection_id, state.heartbeat.ping_timeout
                );
                break;
            }
        };

        match result {
            Ok(Message::Text(text)) => {
                handle_text(connection_id, text.as_str(), state).await;
            }
            Ok(Message::Binary(_)) => {
                debug!("Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                // Axum answers pings; either way the peer is alive.
            }
            Ok(Message::Close(_)) => {
                debug!("Received close frame");
                break;
            }
            Err(e) => {
                debug!("WebSocket error: {}", e);
                break;
            }
        }
    }
}

/// Decode and route a single text frame.
///
/// Malformed frames are answered with an error event and otherwise ignored;
/// they never close the connection.
async fn handle_text(connection_id: ConnectionId, text: &str, state: &WsState) {
    match protocol::decode(text) {
        Ok(event) => {
            debug!("Connection {} sent {}", connection_id, event.kind());
            if let Some(delivery) = state.router.handle(connection_id, event) {
                state.connection_manager.dispatch(delivery).await;
            }
        }
        Err(e) => {
            debug!("Failed to parse client message: {}", e);
            metrics::record_signaling_message("unknown", metrics::OUTCOME_MALFORMED);
            let error_event = ServerEvent::error(error_codes::PARSE_ERROR, e.to_string());
            state
                .connection_manager
                .dispatch(Delivery::new(connection_id, error_event))
                .await;
        }
    }
}
