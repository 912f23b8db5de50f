use anyhow::{Context, Result};
use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info};

use axum::http::Method;

use super::metrics::metrics_handler;
use super::state::ServerState;
use super::websocket::{ws_handler, ConnectionManager};
use super::{log_requests, ServerConfig};
use crate::signaling::SignalingRouter;

#[derive(Serialize)]
struct ServerStats {
    pub version: String,
    pub uptime: String,
    pub connections: usize,
    pub registered_users: usize,
}

fn format_uptime(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;
    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        version: env!("SERVER_VERSION").to_string(),
        uptime: format_uptime(state.start_time.elapsed()),
        connections: state.ws_connection_manager.total_connections().await,
        registered_users: state.router.registry().registered_count(),
    };
    Json(stats)
}

/// Build the signaling application around an already constructed router.
pub fn make_app(config: ServerConfig, router: Arc<SignalingRouter>) -> Router {
    let connection_manager = Arc::new(ConnectionManager::new(config.outbound_buffer));
    let state = ServerState::new(config.clone(), router, connection_manager);

    let ws_routes: Router = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST]);

    home_router.nest("/v1", ws_routes).layer(
        ServiceBuilder::new()
            .layer(cors)
            .layer(middleware::from_fn_with_state(state, log_requests)),
    )
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    let router = Arc::new(SignalingRouter::new());

    if let Some(metrics_port) = config.metrics_port {
        let metrics_addr = format!("{}:{}", config.bind_address, metrics_port);
        let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
            .await
            .with_context(|| format!("Failed to bind metrics listener on {}", metrics_addr))?;
        info!("Metrics available at {}", metrics_addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(metrics_listener, make_metrics_app()).await {
                error!("Metrics server failed: {}", e);
            }
        });
    }

    let addr = format!("{}:{}", config.bind_address, config.port);
    let app = make_app(config, router.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Ready to serve at {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!(
        "Server stopped with {} registered users",
        router.registry().registered_count()
    );
    Ok(())
}
