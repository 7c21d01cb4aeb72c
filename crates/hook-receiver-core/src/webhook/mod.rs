//! # WebHook Processing Module
//!
//! Receives vendor WebHook deliveries and turns them into handler
//! invocations.
//!
//! # Processing Pipeline
//!
//! 1. The request method selects a path: `GET` is a handshake probe, `POST`
//!    is a delivery, anything else is rejected before touching secrets.
//! 2. [`TransportGuard`] requires an encrypted channel.
//! 3. [`CodeValidator`] compares the `code` query parameter with the
//!    configured secret in constant time.
//! 4. `GET` stops here with an empty `200`.
//! 5. The [`ReceiverProfile`] decodes the body into a [`NormalizedEvent`] and
//!    derives the [`Discriminators`].
//! 6. The [`HandlerDispatcher`] runs every matching handler exactly once.
//!
//! Every failure maps to a [`ReceiverError`] whose
//! [`status_code`](ReceiverError::status_code) is the HTTP status returned to
//! the vendor.

use bytes::Bytes;
use std::fmt;

use crate::secret_store::SecretStoreError;

mod code_validator;
mod dispatcher;
mod mailchimp;
mod payload;
mod profile;
mod receiver;
mod router;
mod transport;

pub use code_validator::{constant_time_eq, CodeValidator, CODE_QUERY_PARAMETER};
pub use dispatcher::{
    DispatchError, DispatchResponse, HandlerContext, HandlerDispatcher, HandlerError,
    HandlerRegistry, LoggingHandler, WebhookHandler, DEFAULT_HANDLER_ORDER,
};
pub use mailchimp::{MailChimpProfile, MAILCHIMP_EVENT_FIELD, MAILCHIMP_RECEIVER_NAME};
pub use payload::{FormPayloadReader, NormalizedEvent, FORM_URLENCODED};
pub use profile::ReceiverProfile;
pub use receiver::{Stage, WebhookReceiver};
pub use router::{Discriminators, FieldEventRouter};
pub use transport::{TransportGuard, TransportPolicy};

// ============================================================================
// Request Types
// ============================================================================

/// HTTP method of an inbound request, reduced to what the receiver cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMethod {
    /// Handshake probe sent when the WebHook is registered.
    Get,
    /// Event delivery.
    Post,
    /// Any other method; always rejected.
    Other(String),
}

impl HttpMethod {
    /// Classify a method name. Matching is case-sensitive per RFC 9110.
    pub fn parse(method: &str) -> Self {
        match method {
            "GET" => Self::Get,
            "POST" => Self::Post,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Other(method) => method,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport scheme the request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// Map a protocol name (`https`, `wss`, `http`, ...) to a scheme.
    ///
    /// Anything not recognised as encrypted is treated as plain HTTP.
    pub fn from_protocol(protocol: &str) -> Self {
        let protocol = protocol.trim();
        if protocol.eq_ignore_ascii_case("https") || protocol.eq_ignore_ascii_case("wss") {
            Self::Https
        } else {
            Self::Http
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::Https)
    }
}

/// Inbound WebHook request as seen by a receiver.
///
/// The HTTP layer builds this after reading the body. The query string may
/// contain the shared secret, so `Debug` output redacts it.
#[derive(Clone)]
pub struct WebhookRequest {
    pub method: HttpMethod,
    pub scheme: Scheme,
    /// Whether the peer is on the loopback interface.
    pub is_local: bool,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl WebhookRequest {
    /// Create a request with no body.
    pub fn new(method: HttpMethod, scheme: Scheme, query: Option<String>) -> Self {
        Self {
            method,
            scheme,
            is_local: false,
            query,
            content_type: None,
            body: Bytes::new(),
        }
    }

    /// Attach an entity body and its content type.
    pub fn with_body(mut self, content_type: Option<String>, body: Bytes) -> Self {
        self.content_type = content_type;
        self.body = body;
        self
    }

    /// Mark whether the request came from a loopback peer.
    pub fn with_local_peer(mut self, is_local: bool) -> Self {
        self.is_local = is_local;
        self
    }

    /// Look up a decoded query parameter. When repeated, the last value wins.
    pub fn query_parameter(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        url::form_urlencoded::parse(query.as_bytes())
            .filter(|(key, _)| key == name)
            .last()
            .map(|(_, value)| value.into_owned())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

impl fmt::Debug for WebhookRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookRequest")
            .field("method", &self.method)
            .field("scheme", &self.scheme)
            .field("is_local", &self.is_local)
            .field("query", &self.query.as_ref().map(|_| "[REDACTED]"))
            .field("content_type", &self.content_type)
            .field("body_len", &self.body.len())
            .finish()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Message returned for both a missing and a wrong `code` so the two cannot
/// be told apart.
pub const AUTHENTICATION_FAILED_MESSAGE: &str = "The WebHook request could not be authenticated.";

/// Message returned for server-side faults. Configuration details stay in
/// the logs.
pub const INTERNAL_ERROR_MESSAGE: &str = "The WebHook receiver could not process the request.";

/// Reasons a receiver rejects a request.
///
/// `Display` is intended for logs. Use
/// [`client_message`](ReceiverError::client_message) for the response body.
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    #[error("The WebHook receiver '{receiver}' requires HTTPS in order to be secure")]
    InsecureTransport { receiver: String },

    #[error("No secret is configured for receiver '{receiver}' and route '{route_id}'")]
    MissingConfig { receiver: String, route_id: String },

    #[error("The WebHook request must contain a '{parameter}' query parameter")]
    MissingCode { parameter: &'static str },

    #[error("The '{parameter}' query parameter does not match the configured secret")]
    InvalidCode { parameter: &'static str },

    #[error("The WebHook request must contain an entity body formatted as HTML form data")]
    UnsupportedContentType { content_type: Option<String> },

    #[error("The WebHook request body is malformed: {message}")]
    MalformedBody { message: String },

    #[error("The WebHook request body must contain a '{field}' field")]
    MissingDiscriminator { field: String },

    #[error("The HTTP '{method}' method is not supported by the '{receiver}' WebHook receiver")]
    MethodNotAllowed { method: String, receiver: String },

    #[error("Secret lookup failed: {0}")]
    SecretStore(#[from] SecretStoreError),

    #[error("Handler dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
}

impl ReceiverError {
    /// HTTP status code returned to the vendor.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InsecureTransport { .. } => 400,
            Self::MissingCode { .. } | Self::InvalidCode { .. } => 401,
            Self::UnsupportedContentType { .. } => 400,
            Self::MalformedBody { .. } => 400,
            Self::MissingDiscriminator { .. } => 400,
            Self::MethodNotAllowed { .. } => 405,
            Self::MissingConfig { .. } | Self::SecretStore(_) | Self::Dispatch(_) => 500,
        }
    }

    /// Stable snake_case identifier, used for metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsecureTransport { .. } => "insecure_transport",
            Self::MissingConfig { .. } => "missing_config",
            Self::MissingCode { .. } => "missing_code",
            Self::InvalidCode { .. } => "invalid_code",
            Self::UnsupportedContentType { .. } => "unsupported_content_type",
            Self::MalformedBody { .. } => "malformed_body",
            Self::MissingDiscriminator { .. } => "missing_discriminator",
            Self::MethodNotAllowed { .. } => "method_not_allowed",
            Self::SecretStore(_) => "secret_store",
            Self::Dispatch(_) => "dispatch",
        }
    }

    /// Message safe to return to the caller.
    ///
    /// Never contains the submitted code or any secret material.
    pub fn client_message(&self) -> String {
        match self {
            Self::MissingCode { .. } | Self::InvalidCode { .. } => {
                AUTHENTICATION_FAILED_MESSAGE.to_string()
            }
            Self::MissingConfig { .. } | Self::SecretStore(_) | Self::Dispatch(_) => {
                INTERNAL_ERROR_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }

    /// Whether the fault lies with the receiving service rather than the caller.
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
