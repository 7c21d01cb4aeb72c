//! Transport security check run before any secret comparison.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ReceiverError, WebhookRequest};
use crate::ReceiverName;

/// Operator controls for the transport check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportPolicy {
    /// Accept plain HTTP from any peer. Intended for local development only.
    pub disable_https_check: bool,

    /// Accept plain HTTP from loopback peers.
    pub allow_loopback: bool,
}

/// Rejects requests that did not arrive over an encrypted channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportGuard {
    policy: TransportPolicy,
}

impl TransportGuard {
    pub fn new(policy: TransportPolicy) -> Self {
        if policy.disable_https_check {
            warn!("HTTPS check is disabled; WebHook secrets may travel in clear text");
        }
        Self { policy }
    }

    /// Succeeds for `https`, for a loopback peer when allowed, or when the
    /// check is disabled.
    pub fn verify(
        &self,
        receiver: &ReceiverName,
        request: &WebhookRequest,
    ) -> Result<(), ReceiverError> {
        if request.scheme.is_encrypted()
            || self.policy.disable_https_check
            || (self.policy.allow_loopback && request.is_local)
        {
            return Ok(());
        }

        Err(ReceiverError::InsecureTransport {
            receiver: receiver.to_string(),
        })
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
