//! MailChimp WebHook profile.
//!
//! MailChimp cannot sign its deliveries, so the WebHook URL registered with it
//! carries the shared secret as `?code=...`. When the hook is created MailChimp
//! sends a `GET` to check that the URL exists; events arrive as form-encoded
//! `POST`s whose `type` field names the event (`subscribe`, `unsubscribe`,
//! `profile`, `upemail`, `cleaned`, `campaign`).

use super::{
    Discriminators, FieldEventRouter, FormPayloadReader, NormalizedEvent, ReceiverError,
    ReceiverProfile,
};
use crate::ReceiverName;

/// Name of the MailChimp receiver.
pub const MAILCHIMP_RECEIVER_NAME: &str = "mailchimp";

/// Body field holding the MailChimp event type.
pub const MAILCHIMP_EVENT_FIELD: &str = "type";

#[derive(Debug, Clone)]
pub struct MailChimpProfile {
    name: ReceiverName,
    reader: FormPayloadReader,
    router: FieldEventRouter,
}

impl MailChimpProfile {
    pub fn new() -> Self {
        Self {
            name: ReceiverName(MAILCHIMP_RECEIVER_NAME.to_string()),
            reader: FormPayloadReader::new(),
            router: FieldEventRouter::new(MAILCHIMP_EVENT_FIELD),
        }
    }
}

impl Default for MailChimpProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiverProfile for MailChimpProfile {
    fn name(&self) -> &ReceiverName {
        &self.name
    }

    fn decode_payload(
        &self,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<NormalizedEvent, ReceiverError> {
        self.reader.decode(content_type, body)
    }

    fn extract_discriminators(
        &self,
        event: &NormalizedEvent,
    ) -> Result<Discriminators, ReceiverError> {
        self.router.route(event)
    }
}

#[cfg(test)]
#[path = "mailchimp_tests.rs"]
mod tests;
