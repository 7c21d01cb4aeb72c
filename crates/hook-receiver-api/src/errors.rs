//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use hook_receiver_core::{ReceiverError, SecretConfigError};
use tracing::{error, warn};

/// WebHook handler errors with HTTP status code mapping
///
/// Receiver rejections carry their own status code. The remaining variants
/// come from the HTTP layer itself:
///
/// - `404 Not Found`: no receiver is registered under the URL's name
/// - `408 Request Timeout`: processing exceeded `server.timeout_seconds`
/// - `413 Payload Too Large`: the declared body exceeds `server.max_body_size`
/// - `400 Bad Request`: the body could not be read
/// - `500 Internal Server Error`: unexpected server failures
///
/// # Security Considerations
///
/// The response body only ever contains
/// [`ReceiverError::client_message`], which never echoes the submitted code
/// or configuration details.
#[derive(Debug, thiserror::Error)]
pub enum WebhookHandlerError {
    /// Rejection from the receiver pipeline
    #[error(transparent)]
    Rejected(#[from] ReceiverError),

    /// No receiver registered for the URL segment
    #[error("WebHook receiver not found: {receiver}")]
    ReceiverNotFound { receiver: String },

    /// Request timeout
    #[error("Request timeout after {seconds}s")]
    Timeout { seconds: u64 },

    /// Payload too large. `size` is only known when the client declared it.
    #[error("Payload exceeds the maximum of {max_size} bytes")]
    PayloadTooLarge {
        size: Option<usize>,
        max_size: usize,
    },

    /// Body stream failed while being read
    #[error("The request body could not be read")]
    BodyUnreadable { message: String },

    /// Unexpected internal server error
    #[error("Internal server error: {message}")]
    InternalError { message: String },
}

impl WebhookHandlerError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Rejected(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::ReceiverNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BodyUnreadable { .. } => StatusCode::BAD_REQUEST,
            Self::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label used for the `outcome` metric dimension
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Rejected(e) => e.kind(),
            Self::ReceiverNotFound { .. } => "receiver_not_found",
            Self::Timeout { .. } => "timeout",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::BodyUnreadable { .. } => "body_unreadable",
            Self::InternalError { .. } => "internal_error",
        }
    }
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match self {
            // Already logged by the receiver with full detail
            Self::Rejected(ref e) => e.client_message(),
            Self::ReceiverNotFound { ref receiver } => {
                warn!(receiver = %receiver, "WebHook receiver not found");
                self.to_string()
            }
            Self::Timeout { seconds } => {
                warn!(timeout_seconds = seconds, "Request timeout");
                self.to_string()
            }
            Self::PayloadTooLarge { size, max_size } => {
                warn!(
                    payload_size = ?size,
                    max_size = max_size,
                    "Payload too large"
                );
                self.to_string()
            }
            Self::BodyUnreadable { ref message } => {
                warn!(error = %message, "Failed to read request body");
                self.to_string()
            }
            Self::InternalError { ref message } => {
                // Log detailed error server-side but return generic message to client
                error!(error = %message, "Internal server error occurred");
                "Internal server error occurred. Please try again later.".to_string()
            }
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        (status, Json(body)).into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Unknown receiver '{receiver}' in configuration")]
    UnknownReceiver { receiver: String },

    #[error("Invalid secret configuration for receiver '{receiver}': {source}")]
    Secret {
        receiver: String,
        #[source]
        source: SecretConfigError,
    },

    #[error("Configuration loading failed: {0}")]
    Loading(#[from] config::ConfigError),
}
