//! # Secret Store Module
//!
//! Shared secrets used to authenticate WebHook deliveries.
//!
//! Each receiver kind may have one secret per route id. Secrets are loaded
//! once at start-up into an immutable [`SecretSnapshot`] and looked up through
//! the [`SecretStore`] trait so tests can substitute their own source.
//!
//! The compact setting format accepted by [`SecretSnapshot::add_setting`] is
//! either a single secret (`"<secret>"`, bound to the default route) or a
//! comma separated list of `id=secret` entries.

use crate::{ReceiverName, RouteId};
use async_trait::async_trait;
use std::{collections::HashMap, fmt};
use zeroize::Zeroizing;

/// Minimum number of characters a receiver secret must contain.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Maximum number of characters a receiver secret may contain.
pub const MAX_SECRET_LENGTH: usize = 128;

// ============================================================================
// Secret Value
// ============================================================================

/// Secure container for a receiver's shared secret.
///
/// The value is zeroized when dropped and is never included in `Debug`
/// output.
#[derive(Clone)]
pub struct ReceiverSecret {
    inner: Zeroizing<String>,
}

impl ReceiverSecret {
    /// Create a secret, enforcing the 32 to 128 character length range.
    ///
    /// # Errors
    ///
    /// Returns [`SecretConfigError::InvalidLength`] when the value is too
    /// short or too long.
    pub fn new(value: impl Into<String>) -> Result<Self, SecretConfigError> {
        let inner = Zeroizing::new(value.into());
        let actual = inner.chars().count();
        if !(MIN_SECRET_LENGTH..=MAX_SECRET_LENGTH).contains(&actual) {
            return Err(SecretConfigError::InvalidLength { actual });
        }
        Ok(Self { inner })
    }

    /// Get secret as bytes
    pub fn expose_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    /// Get secret length in characters without exposing content
    pub fn len(&self) -> usize {
        self.inner.chars().count()
    }

    /// Always false; an empty secret cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for ReceiverSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiverSecret")
            .field("length", &self.len())
            .field("value", &"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while building the secret configuration.
///
/// These are start-up errors. None of the variants carry a secret value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretConfigError {
    #[error(
        "Secret must be between {} and {} characters long, got {actual}",
        MIN_SECRET_LENGTH,
        MAX_SECRET_LENGTH
    )]
    InvalidLength { actual: usize },

    #[error("Secret setting for receiver '{receiver}' is empty")]
    EmptySetting { receiver: String },

    #[error("Invalid secret for receiver '{receiver}' and route '{route_id}': {reason}")]
    InvalidEntry {
        receiver: String,
        route_id: String,
        reason: String,
    },

    #[error("Route '{route_id}' is configured more than once for receiver '{receiver}'")]
    DuplicateRoute { receiver: String, route_id: String },
}

/// Errors raised by a [`SecretStore`] at lookup time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretStoreError {
    #[error("Secret store is unavailable: {message}")]
    Unavailable { message: String },
}

// ============================================================================
// Store Trait
// ============================================================================

/// Source of receiver secrets keyed by receiver name and route id.
///
/// Returning `Ok(None)` means no secret is configured for the pair, which the
/// receiver treats as a server-side configuration fault.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Look up the secret configured for `(receiver, route_id)`.
    async fn get_secret(
        &self,
        receiver: &ReceiverName,
        route_id: &RouteId,
    ) -> Result<Option<ReceiverSecret>, SecretStoreError>;
}

// ============================================================================
// Snapshot Store
// ============================================================================

/// Immutable, process-wide secret table built once at start-up.
#[derive(Clone, Default)]
pub struct SecretSnapshot {
    secrets: HashMap<(ReceiverName, RouteId), ReceiverSecret>,
}

impl SecretSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single secret for `(receiver, route_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`SecretConfigError::DuplicateRoute`] when the pair already
    /// has a secret.
    pub fn insert(
        &mut self,
        receiver: ReceiverName,
        route_id: RouteId,
        secret: ReceiverSecret,
    ) -> Result<(), SecretConfigError> {
        let key = (receiver, route_id);
        if self.secrets.contains_key(&key) {
            return Err(SecretConfigError::DuplicateRoute {
                receiver: key.0.to_string(),
                route_id: key.1.to_string(),
            });
        }
        self.secrets.insert(key, secret);
        Ok(())
    }

    /// Parse a compact secret setting and add every entry for `receiver`.
    ///
    /// Accepts `"<secret>"` for the default route or
    /// `"id1=secret1, id2=secret2"` for named routes. Empty entries between
    /// commas are ignored. Secrets may not contain `,`, and an entry's first
    /// `=` separates the id from the secret.
    ///
    /// Returns the number of routes added.
    pub fn add_setting(
        &mut self,
        receiver: &ReceiverName,
        setting: &str,
    ) -> Result<usize, SecretConfigError> {
        let mut added = 0;
        for entry in setting.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (route_id, value) = match entry.split_once('=') {
                Some((id, value)) => {
                    let id = id.trim();
                    if id.is_empty() {
                        return Err(SecretConfigError::InvalidEntry {
                            receiver: receiver.to_string(),
                            route_id: String::new(),
                            reason: "route id before '=' is empty".to_string(),
                        });
                    }
                    (RouteId::new(id), value.trim())
                }
                None => (RouteId::default_route(), entry),
            };

            let secret = ReceiverSecret::new(value).map_err(|e| SecretConfigError::InvalidEntry {
                receiver: receiver.to_string(),
                route_id: route_id.to_string(),
                reason: e.to_string(),
            })?;

            self.insert(receiver.clone(), route_id, secret)?;
            added += 1;
        }

        if added == 0 {
            return Err(SecretConfigError::EmptySetting {
                receiver: receiver.to_string(),
            });
        }
        Ok(added)
    }

    /// Route ids configured for `receiver`, sorted.
    pub fn route_ids(&self, receiver: &ReceiverName) -> Vec<RouteId> {
        let mut ids: Vec<RouteId> = self
            .secrets
            .keys()
            .filter(|(name, _)| name == receiver)
            .map(|(_, id)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

impl fmt::Debug for SecretSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut routes: Vec<String> = self
            .secrets
            .keys()
            .map(|(name, id)| format!("{name}/{id}"))
            .collect();
        routes.sort();
        f.debug_struct("SecretSnapshot")
            .field("routes", &routes)
            .finish()
    }
}

#[async_trait]
impl SecretStore for SecretSnapshot {
    async fn get_secret(
        &self,
        receiver: &ReceiverName,
        route_id: &RouteId,
    ) -> Result<Option<ReceiverSecret>, SecretStoreError> {
        Ok(self
            .secrets
            .get(&(receiver.clone(), route_id.clone()))
            .cloned())
    }
}

#[cfg(test)]
#[path = "secret_store_tests.rs"]
mod tests;
