//! Tests for [`ReceiverRegistry`] and [`build_receiver_registry`].

use super::*;
use crate::config::ReceiverConfig;
use hook_receiver_core::HandlerRegistry;

fn dispatcher() -> Arc<dyn HandlerDispatcher> {
    Arc::new(HandlerRegistry::new())
}

#[test]
fn test_new_registry_is_empty() {
    let registry = ReceiverRegistry::new();
    assert!(registry.is_empty());
    assert!(registry.get("mailchimp").is_none());
}

#[test]
fn test_build_registers_mailchimp_without_secrets() {
    let registry = build_receiver_registry(&ServiceConfig::default(), dispatcher()).unwrap();

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.names(), vec!["mailchimp"]);
    assert!(registry.contains("mailchimp"));
}

#[test]
fn test_lookup_is_case_insensitive() {
    let registry = build_receiver_registry(&ServiceConfig::default(), dispatcher()).unwrap();

    let receiver = registry.get("MailChimp").expect("receiver should be found");
    assert_eq!(receiver.name().as_str(), "mailchimp");
    assert!(registry.get("stripe").is_none());
}

#[test]
fn test_build_fails_on_invalid_secret() {
    let mut config = ServiceConfig::default();
    config.receivers.insert(
        "mailchimp".to_string(),
        ReceiverConfig {
            secret: "too-short".to_string(),
        },
    );

    let result = build_receiver_registry(&config, dispatcher());
    assert!(matches!(result, Err(ConfigError::Secret { .. })));
}

#[test]
fn test_debug_lists_names() {
    let registry = build_receiver_registry(&ServiceConfig::default(), dispatcher()).unwrap();
    assert!(format!("{:?}", registry).contains("mailchimp"));
}
