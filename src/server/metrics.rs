use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all signaling server metrics
const PREFIX: &str = "signaling";

/// Outcome label: the event produced a message for some connection.
pub const OUTCOME_DELIVERED: &str = "delivered";
/// Outcome label: a call offer targeted an unknown identity.
pub const OUTCOME_NOT_FOUND: &str = "not_found";
/// Outcome label: the event targeted an unknown identity and was dropped.
pub const OUTCOME_DROPPED: &str = "dropped";
/// Outcome label: the frame could not be decoded.
pub const OUTCOME_MALFORMED: &str = "malformed";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // WebSocket Metrics
    pub static ref WS_CONNECTIONS: IntGauge = IntGauge::new(
        format!("{PREFIX}_ws_connections"),
        "Number of open WebSocket connections"
    ).expect("Failed to create ws_connections metric");

    pub static ref REGISTERED_USERS: IntGauge = IntGauge::new(
        format!("{PREFIX}_registered_users"),
        "Number of identities currently resolvable"
    ).expect("Failed to create registered_users metric");

    pub static ref MESSAGES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_messages_total"), "Signaling messages received, by kind and outcome"),
        &["kind", "outcome"]
    ).expect("Failed to create messages_total metric");

    pub static ref DELIVERY_FAILURES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_delivery_failures_total"), "Outbound frames that could not be queued"),
        &["reason"]
    ).expect("Failed to create delivery_failures_total metric");

    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(WS_CONNECTIONS.clone()));
    let _ = REGISTRY.register(Box::new(REGISTERED_USERS.clone()));
    let _ = REGISTRY.register(Box::new(MESSAGES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(DELIVERY_FAILURES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record one processed signaling message
pub fn record_signaling_message(kind: &str, outcome: &str) {
    MESSAGES_TOTAL.with_label_values(&[kind, outcome]).inc();
}

/// Record an outbound frame that never reached its connection's queue
pub fn record_delivery_failure(reason: &str) {
    DELIVERY_FAILURES_TOTAL.with_label_values(&[reason]).inc();
}

pub fn ws_connection_opened() {
    WS_CONNECTIONS.inc();
}

pub fn ws_connection_closed() {
    WS_CONNECTIONS.dec();
}

/// An identity became resolvable.
pub fn registered_user_added() {
    REGISTERED_USERS.inc();
}

/// An identity stopped resolving.
pub fn registered_user_removed() {
    REGISTERED_USERS.dec();
}

/// Update process memory usage
pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            for line in status.lines() {
                if line.starts_with("VmRSS:") {
                    // Parse the RSS (Resident Set Size) in kB
                    if let Some(kb_str) = line.split_whitespace().nth(1) {
                        if let Ok(kb) = kb_str.parse::<f64>() {
                            PROCESS_MEMORY_BYTES.set(kb * 1024.0);
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
