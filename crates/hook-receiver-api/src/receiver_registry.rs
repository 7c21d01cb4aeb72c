//! Receiver registry for routing WebHook URLs to receivers.
//!
//! The registry is built once at startup and used read-only during request
//! handling. Each registered receiver is reachable at:
//!
//! ```text
//! ANY {base_path}/{receiver}
//! ANY {base_path}/{receiver}/{id}
//! ```
//!
//! For example the MailChimp receiver with the default base path serves
//! `/api/webhooks/incoming/mailchimp/{id}`.

use crate::{config::ServiceConfig, errors::ConfigError};
use hook_receiver_core::{
    webhook::{HandlerDispatcher, MailChimpProfile, ReceiverProfile, TransportGuard},
    SecretStore, WebhookReceiver,
};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, warn};

// ============================================================================
// ReceiverRegistry
// ============================================================================

/// Maps receiver names to their [`WebhookReceiver`].
///
/// Lookups are case-insensitive because receiver names are always lowercase.
#[derive(Clone, Default)]
pub struct ReceiverRegistry {
    receivers: HashMap<String, Arc<WebhookReceiver>>,
}

impl ReceiverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a receiver under its own name, replacing any previous one.
    pub fn register(&mut self, receiver: Arc<WebhookReceiver>) -> &mut Self {
        self.receivers
            .insert(receiver.name().as_str().to_string(), receiver);
        self
    }

    /// Look up a receiver by the URL segment.
    pub fn get(&self, receiver: &str) -> Option<Arc<WebhookReceiver>> {
        self.receivers.get(&receiver.to_ascii_lowercase()).cloned()
    }

    pub fn contains(&self, receiver: &str) -> bool {
        self.receivers.contains_key(&receiver.to_ascii_lowercase())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.receivers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }
}

impl std::fmt::Debug for ReceiverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiverRegistry")
            .field("receivers", &self.names())
            .finish()
    }
}

/// Build a registry holding every built-in receiver, backed by the secrets
/// in `config`.
///
/// All receivers are registered even when they have no secret configured;
/// requests for such routes fail as a server-side configuration fault.
pub fn build_receiver_registry(
    config: &ServiceConfig,
    dispatcher: Arc<dyn HandlerDispatcher>,
) -> Result<ReceiverRegistry, ConfigError> {
    let snapshot = config.secret_snapshot()?;
    info!(routes = snapshot.len(), "Loaded WebHook receiver secrets");

    let mailchimp = MailChimpProfile::new();
    let routes = snapshot.route_ids(mailchimp.name());
    if routes.is_empty() {
        warn!(
            receiver = %mailchimp.name(),
            "No secrets configured; every request will fail"
        );
    } else {
        info!(
            receiver = %mailchimp.name(),
            routes = ?routes.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "WebHook receiver routes configured"
        );
    }

    let secrets: Arc<dyn SecretStore> = Arc::new(snapshot);
    let transport = TransportGuard::new(config.transport_policy());

    let mut registry = ReceiverRegistry::new();
    registry.register(Arc::new(WebhookReceiver::new(
        Arc::new(mailchimp),
        transport,
        secrets,
        dispatcher,
    )));

    Ok(registry)
}

#[cfg(test)]
#[path = "receiver_registry_tests.rs"]
mod tests;
