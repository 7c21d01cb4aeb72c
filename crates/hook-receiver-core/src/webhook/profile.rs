//! Vendor-specific behaviour plugged into [`WebhookReceiver`](super::WebhookReceiver).

use super::{Discriminators, NormalizedEvent, ReceiverError};
use crate::ReceiverName;

/// The parts of WebHook handling that differ between vendors.
///
/// Transport checks, code verification and dispatch are shared. A profile
/// only names the receiver and says how to read its payloads.
pub trait ReceiverProfile: Send + Sync {
    /// Receiver name used in URLs, secret configuration and handler filters.
    fn name(&self) -> &ReceiverName;

    /// Decode a delivery body.
    fn decode_payload(
        &self,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<NormalizedEvent, ReceiverError>;

    /// Derive the event names used to select handlers.
    fn extract_discriminators(&self, event: &NormalizedEvent)
        -> Result<Discriminators, ReceiverError>;
}
