//! # Hook Receiver Core
//!
//! Verification and dispatch pipeline for inbound vendor WebHooks.
//!
//! A receiver accepts deliveries from one vendor (for example MailChimp),
//! verifies that they arrived over an encrypted transport and carry the
//! shared secret configured for the route, decodes the vendor payload into a
//! [`webhook::NormalizedEvent`], derives the event discriminators and fans the
//! event out to every registered handler.
//!
//! ## Architecture
//!
//! - [`webhook::WebhookReceiver`] is a fixed orchestrator shared by every vendor
//! - Vendor differences live behind [`webhook::ReceiverProfile`]
//! - Secrets come from an injected [`secret_store::SecretStore`]
//! - Handlers are invoked through [`webhook::HandlerDispatcher`]
//!
//! ## Usage
//!
//! ```rust
//! use hook_receiver_core::{ReceiverName, RouteId};
//!
//! let name = ReceiverName::new("mailchimp").unwrap();
//! let route = RouteId::new("newsletter");
//! assert_eq!(name.as_str(), "mailchimp");
//! assert!(!route.is_default());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Receiver Identity
// ============================================================================

/// URL-safe name identifying a receiver kind, e.g. `mailchimp`.
///
/// A receiver name must consist entirely of lowercase ASCII letters, digits,
/// hyphens (`-`), or underscores (`_`). It must not be empty.
///
/// # Examples
///
/// ```rust
/// use hook_receiver_core::ReceiverName;
///
/// assert!(ReceiverName::new("mailchimp").is_ok());
/// assert!(ReceiverName::new("MailChimp").is_err());
/// assert!(ReceiverName::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct ReceiverName(String);

impl ReceiverName {
    /// Create a new receiver name, validating it contains only URL-safe characters.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidReceiverNameError::Empty`] if the value is empty.
    /// Returns [`InvalidReceiverNameError::InvalidChars`] if the value contains
    /// characters outside `[a-z0-9\-_]`.
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidReceiverNameError> {
        let s = value.into();
        if s.is_empty() {
            return Err(InvalidReceiverNameError::Empty);
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        {
            return Err(InvalidReceiverNameError::InvalidChars { value: s });
        }
        Ok(Self(s))
    }

    /// Return the receiver name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ReceiverName {
    type Error = InvalidReceiverNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for ReceiverName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error returned when a [`ReceiverName`] cannot be created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidReceiverNameError {
    /// Receiver name must not be empty.
    #[error("Receiver name must not be empty")]
    Empty,

    /// Receiver name contains characters outside `[a-z0-9\\-_]`.
    #[error(
        "Receiver name '{value}' contains invalid characters; \
         use lowercase alphanumeric, hyphens, or underscores"
    )]
    InvalidChars { value: String },
}

/// Caller-supplied route selector taken from the WebHook URL.
///
/// The route id chooses which configured secret applies to a delivery. An
/// empty route id is the default route, used when the URL carries no id
/// segment. Route ids compare case-insensitively, so they are stored
/// lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteId(String);

impl RouteId {
    /// Create a route id from a path segment.
    ///
    /// The segment is lowercased but otherwise kept as sent, so a segment of
    /// only whitespace never selects the default route.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().to_lowercase())
    }

    /// The default route, used when no id segment is present.
    pub fn default_route() -> Self {
        Self(String::new())
    }

    /// Return the route id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the default (empty) route.
    pub fn is_default(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<default>")
        } else {
            f.write_str(&self.0)
        }
    }
}

// ============================================================================
// Module declarations
// ============================================================================

/// Secret configuration snapshot and lookup trait
pub mod secret_store;

/// Request verification, payload decoding and handler dispatch
pub mod webhook;

// Re-export key types for convenience
pub use secret_store::{
    ReceiverSecret, SecretConfigError, SecretSnapshot, SecretStore, SecretStoreError,
};
pub use webhook::{
    DispatchResponse, HandlerContext, HandlerDispatcher, HandlerRegistry, ReceiverError,
    ReceiverProfile, WebhookHandler, WebhookReceiver, WebhookRequest,
};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
