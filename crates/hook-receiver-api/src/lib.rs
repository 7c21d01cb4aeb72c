//! # Hook Receiver HTTP Service
//!
//! HTTP server exposing WebHook receivers.
//!
//! This service provides:
//! - WebHook endpoints at `{base_path}/{receiver}[/{id}]`, accepting any
//!   method so the receiver can answer unsupported ones itself
//! - A health check endpoint
//! - A Prometheus metrics endpoint
//!
//! The query string of a WebHook URL carries the shared secret, so request
//! logging and tracing spans only ever record the path.

pub mod config;
pub mod errors;
pub mod metrics;
pub mod receiver_registry;

pub use config::{LoggingConfig, ReceiverConfig, ServerConfig, ServiceConfig, WebhookConfig};
pub use errors::{ConfigError, ServiceError, WebhookHandlerError};
pub use metrics::ServiceMetrics;
pub use receiver_registry::{build_receiver_registry, ReceiverRegistry};

use axum::{
    body::Body,
    extract::{ConnectInfo, Path, Request, State},
    http::{header::CONTENT_LENGTH, header::CONTENT_TYPE, request::Parts, StatusCode},
    middleware,
    response::{Json, Response},
    routing::{any, get},
    Router,
};
use chrono::{DateTime, Utc};
use hook_receiver_core::{
    webhook::{HttpMethod, Scheme},
    DispatchResponse, RouteId, WebhookRequest,
};
use http_body_util::LengthLimitError;
use serde::Serialize;
use std::{
    future::IntoFuture,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Notify;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, instrument, warn};

/// Header a TLS-terminating proxy uses to report the original scheme.
pub const FORWARDED_PROTO_HEADER: &str = "x-forwarded-proto";

/// Header carrying the request correlation id.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: ServiceConfig,

    /// Receivers reachable under the WebHook base path
    pub receivers: Arc<ReceiverRegistry>,

    /// Metrics collector for observability
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    pub fn new(
        config: ServiceConfig,
        receivers: ReceiverRegistry,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            config,
            receivers: Arc::new(receivers),
            metrics,
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let base = state.config.webhooks.base_path.trim_end_matches('/');

    let webhook_routes = Router::new()
        .route(&format!("{base}/{{receiver}}"), any(handle_default_route))
        .route(&format!("{base}/{{receiver}}/{{id}}"), any(handle_route));

    let observability_routes = Router::new()
        .route("/health", get(handle_health_check))
        .route("/metrics", get(metrics_endpoint));

    Router::new()
        .merge(webhook_routes)
        .merge(observability_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                    info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                }))
                .layer(middleware::from_fn(request_logging_middleware))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server
///
/// Runs until SIGINT or SIGTERM. In-flight requests then get
/// `server.shutdown_timeout_seconds` to finish.
pub async fn start_server(
    config: ServiceConfig,
    receivers: ReceiverRegistry,
) -> Result<(), ServiceError> {
    let metrics = ServiceMetrics::new().map_err(|e| {
        ServiceError::Configuration(ConfigError::Invalid {
            message: format!("Failed to initialize metrics: {}", e),
        })
    })?;

    info!(receivers = ?receivers.names(), "Registered WebHook receivers");

    let state = AppState::new(config.clone(), receivers, metrics);
    let app = create_router(state);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener =
        tokio::net::TcpListener::bind(&address)
            .await
            .map_err(|e| ServiceError::BindFailed {
                address: address.clone(),
                message: e.to_string(),
            })?;

    info!("Starting HTTP server on {}", address);

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    let shutdown_started = Arc::new(Notify::new());

    let shutdown_signal = {
        let shutdown_started = Arc::clone(&shutdown_started);
        async move {
            wait_for_shutdown_signal().await;
            info!(
                "Initiating graceful shutdown with {}s timeout",
                shutdown_timeout.as_secs()
            );
            shutdown_started.notify_one();
        }
    };

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .into_future();

    tokio::select! {
        result = server => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = async {
            shutdown_started.notified().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            warn!(
                timeout_seconds = shutdown_timeout.as_secs(),
                "Graceful shutdown timed out; dropping in-flight requests"
            );
        }
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

// ============================================================================
// WebHook Handlers
// ============================================================================

/// Handle a WebHook for the receiver's default route
#[instrument(skip_all, fields(receiver = %receiver))]
pub async fn handle_default_route(
    State(state): State<AppState>,
    Path(receiver): Path<String>,
    request: Request,
) -> Result<Response, WebhookHandlerError> {
    process_webhook(state, receiver, RouteId::default_route(), request).await
}

/// Handle a WebHook for a named route
#[instrument(skip_all, fields(receiver = %receiver, route_id = %id))]
pub async fn handle_route(
    State(state): State<AppState>,
    Path((receiver, id)): Path<(String, String)>,
    request: Request,
) -> Result<Response, WebhookHandlerError> {
    process_webhook(state, receiver, RouteId::new(id), request).await
}

/// Read the request, run the receiver pipeline under the request timeout and
/// record the outcome.
///
/// Dropping the pipeline future on timeout cancels any handler still running.
async fn process_webhook(
    state: AppState,
    receiver_name: String,
    route_id: RouteId,
    request: Request,
) -> Result<Response, WebhookHandlerError> {
    let started = Instant::now();

    let receiver = state
        .receivers
        .get(&receiver_name)
        .ok_or(WebhookHandlerError::ReceiverNotFound {
            receiver: receiver_name,
        })?;

    let timeout_seconds = state.config.server.timeout_seconds;
    let pipeline = async {
        let webhook_request = read_webhook_request(&state.config.server, request).await?;
        receiver
            .receive(&route_id, webhook_request)
            .await
            .map_err(WebhookHandlerError::from)
    };

    let result = match tokio::time::timeout(Duration::from_secs(timeout_seconds), pipeline).await
    {
        Ok(result) => result,
        Err(_) => Err(WebhookHandlerError::Timeout {
            seconds: timeout_seconds,
        }),
    };

    let outcome = match &result {
        Ok(_) => "accepted",
        Err(e) => e.outcome(),
    };
    state
        .metrics
        .record_request(receiver.name().as_str(), outcome, started.elapsed());

    result.and_then(into_http_response)
}

/// Build a [`WebhookRequest`] from the HTTP request, enforcing the body limit.
async fn read_webhook_request(
    server: &ServerConfig,
    request: Request,
) -> Result<WebhookRequest, WebhookHandlerError> {
    let (parts, body) = request.into_parts();

    if let Some(size) = declared_content_length(&parts) {
        if size > server.max_body_size {
            return Err(WebhookHandlerError::PayloadTooLarge {
                size: Some(size),
                max_size: server.max_body_size,
            });
        }
    }

    let method = HttpMethod::parse(parts.method.as_str());
    let scheme = detect_scheme(server, &parts);
    let is_local = is_loopback_peer(&parts);
    let query = parts.uri.query().map(str::to_string);
    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = axum::body::to_bytes(body, server.max_body_size)
        .await
        .map_err(|e| {
            if exceeded_length_limit(&e) {
                WebhookHandlerError::PayloadTooLarge {
                    size: None,
                    max_size: server.max_body_size,
                }
            } else {
                WebhookHandlerError::BodyUnreadable {
                    message: e.to_string(),
                }
            }
        })?;

    Ok(WebhookRequest::new(method, scheme, query)
        .with_body(content_type, body)
        .with_local_peer(is_local))
}

/// Scheme from an absolute request URI, then from `X-Forwarded-Proto` when
/// trusted, otherwise plain HTTP.
pub fn detect_scheme(server: &ServerConfig, parts: &Parts) -> Scheme {
    if let Some(scheme) = parts.uri.scheme_str() {
        return Scheme::from_protocol(scheme);
    }

    if server.trust_forwarded_proto {
        if let Some(proto) = parts
            .headers
            .get(FORWARDED_PROTO_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            // Proxy chains append; the first entry is the client-facing hop
            let first = proto.split(',').next().unwrap_or_default();
            return Scheme::from_protocol(first);
        }
    }

    Scheme::Http
}

fn is_loopback_peer(parts: &Parts) -> bool {
    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().is_loopback())
        .unwrap_or(false)
}

/// Whether a body read failed because the stream outgrew the size cap.
/// Bodies without a `Content-Length` only hit the cap while streaming.
fn exceeded_length_limit(error: &axum::Error) -> bool {
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        if cause.is::<LengthLimitError>() {
            return true;
        }
        source = cause.source();
    }
    false
}

fn declared_content_length(parts: &Parts) -> Option<usize> {
    parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

fn into_http_response(dispatch: DispatchResponse) -> Result<Response, WebhookHandlerError> {
    let status =
        StatusCode::from_u16(dispatch.status).map_err(|_| WebhookHandlerError::InternalError {
            message: format!("Handler returned invalid status code {}", dispatch.status),
        })?;

    let mut builder = Response::builder().status(status);
    if let Some(content_type) = &dispatch.content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }

    builder
        .body(Body::from(dispatch.body.unwrap_or_default()))
        .map_err(|e| WebhookHandlerError::InternalError {
            message: e.to_string(),
        })
}

// ============================================================================
// Observability Handlers
// ============================================================================

/// Basic health check endpoint
#[instrument(skip(state))]
async fn handle_health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        receivers: state
            .receivers
            .names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, StatusCode> {
    state.metrics.encode().map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware
///
/// - Logs request start and completion with structured fields
/// - Propagates correlation ID through response headers
/// - Records the path only; WebHook query strings carry secrets
#[instrument(skip(request, next), fields(
    method = %request.method(),
    path = %request.uri().path(),
    correlation_id
))]
async fn request_logging_middleware(
    mut request: Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::Span::current().record("correlation_id", correlation_id.as_str());

    request.extensions_mut().insert(correlation_id.clone());

    info!(
        correlation_id = %correlation_id,
        method = %method,
        path = %path,
        "Request started"
    );

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert(CORRELATION_ID_HEADER, header_value);
    }

    let status = response.status();

    if status.is_server_error() {
        error!(
            correlation_id = %correlation_id,
            method = %method,
            path = %path,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            correlation_id = %correlation_id,
            method = %method,
            path = %path,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            correlation_id = %correlation_id,
            method = %method,
            path = %path,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed successfully"
        );
    }

    response
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub receivers: Vec<String>,
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
