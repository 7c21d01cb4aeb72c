//! Shared-secret verification for WebHook requests.
//!
//! Vendors that cannot sign payloads append a `code` query parameter to the
//! registered WebHook URL. The receiver compares it against the secret
//! configured for the receiver and route id.

use std::sync::Arc;
use tracing::debug;
use zeroize::Zeroizing;

use super::{ReceiverError, WebhookRequest};
use crate::{secret_store::SecretStore, ReceiverName, RouteId};

/// Query parameter carrying the shared secret.
pub const CODE_QUERY_PARAMETER: &str = "code";

/// Verifies the `code` query parameter against the configured secret.
#[derive(Clone)]
pub struct CodeValidator {
    secrets: Arc<dyn SecretStore>,
}

impl CodeValidator {
    pub fn new(secrets: Arc<dyn SecretStore>) -> Self {
        Self { secrets }
    }

    /// Verify the request's code for `(receiver, route_id)`.
    ///
    /// The secret is looked up first so an unconfigured route is always a
    /// server error, whatever the caller sent.
    ///
    /// # Errors
    ///
    /// - [`ReceiverError::MissingConfig`] when no secret is configured
    /// - [`ReceiverError::MissingCode`] when `code` is absent or empty
    /// - [`ReceiverError::InvalidCode`] when `code` does not match
    /// - [`ReceiverError::SecretStore`] when the lookup itself fails
    pub async fn verify(
        &self,
        request: &WebhookRequest,
        receiver: &ReceiverName,
        route_id: &RouteId,
    ) -> Result<(), ReceiverError> {
        let secret = self
            .secrets
            .get_secret(receiver, route_id)
            .await?
            .ok_or_else(|| ReceiverError::MissingConfig {
                receiver: receiver.to_string(),
                route_id: route_id.to_string(),
            })?;

        let code = request
            .query_parameter(CODE_QUERY_PARAMETER)
            .filter(|code| !code.is_empty())
            .map(Zeroizing::new)
            .ok_or(ReceiverError::MissingCode {
                parameter: CODE_QUERY_PARAMETER,
            })?;

        if !constant_time_eq(code.as_bytes(), secret.expose_bytes()) {
            return Err(ReceiverError::InvalidCode {
                parameter: CODE_QUERY_PARAMETER,
            });
        }

        debug!(receiver = %receiver, route_id = %route_id, "WebHook code verified");
        Ok(())
    }
}

impl std::fmt::Debug for CodeValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeValidator")
            .field("secrets", &"<secret store>")
            .finish()
    }
}

/// Compare two byte strings without data-dependent early exit.
///
/// Only the lengths are compared in variable time.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;

    if a.len() != b.len() {
        return false;
    }

    a.ct_eq(b).into()
}

#[cfg(test)]
#[path = "code_validator_tests.rs"]
mod tests;
