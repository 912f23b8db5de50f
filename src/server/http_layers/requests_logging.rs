//! Request logging middleware
//!
//! The HTTP surface is small: the status page or static frontend, and the
//! WebSocket upgrade. Each request is logged as one line once the response
//! is known, and counted against its route template.

use super::super::state::ServerState;
use crate::server::metrics::record_http_request;
use axum::extract::{MatchedPath, State};
use axum::{
    body::Body,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::info;

#[derive(PartialEq, PartialOrd, Clone, Debug, Default, clap::ValueEnum)]
pub enum RequestsLoggingLevel {
    None,
    #[default]
    Path,
}

impl std::fmt::Display for RequestsLoggingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

const UNMATCHED_ROUTE: &str = "unmatched";

/// Route template for metric labels, so static files don't explode cardinality.
fn route_label(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}

fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

pub async fn log_requests(
    State(state): State<ServerState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let uri = request.uri().clone();
    let route = route_label(&request);
    let upgrade = is_websocket_upgrade(request.headers());

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration = start.elapsed();

    if state.config.requests_logging_level > RequestsLoggingLevel::None {
        if upgrade {
            info!("{} {} -> {} (websocket upgrade)", method, uri, status);
        } else {
            info!("{} {} -> {} ({}ms)", method, uri, status, duration.as_millis());
        }
    }

    record_http_request(method.as_str(), &route, status, duration);

    response
}
