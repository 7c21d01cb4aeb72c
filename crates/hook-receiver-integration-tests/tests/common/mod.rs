//! Common test utilities for hook-receiver integration tests
//!
//! This module provides:
//! - A recording WebHook handler
//! - Helpers to build a router from a configuration
//! - Request builders for MailChimp-style deliveries

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request},
    response::Response,
    Router,
};
use hook_receiver_api::{
    build_receiver_registry, create_router, AppState, ReceiverConfig, ServiceConfig,
    ServiceMetrics,
};
use hook_receiver_core::{
    webhook::{HandlerContext, HandlerError, WebhookHandler},
    DispatchResponse, HandlerRegistry,
};
use std::sync::{Arc, Mutex};

#[allow(dead_code)]
pub const SECRET: &str = "integration-test-secret-0123456789abcdef";

#[allow(dead_code)]
pub const OTHER_SECRET: &str = "another-route-secret-0123456789abcdefgh";

pub const FORM: &str = "application/x-www-form-urlencoded";

// ============================================================================
// Recording handler
// ============================================================================

/// Handler that records every context it is invoked with.
#[derive(Clone, Default)]
pub struct RecordingHandler {
    calls: Arc<Mutex<Vec<HandlerContext>>>,
    response: Option<DispatchResponse>,
    fail: bool,
}

#[allow(dead_code)]
impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn responding(response: DispatchResponse) -> Self {
        Self {
            response: Some(response),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<HandlerContext> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebhookHandler for RecordingHandler {
    fn receiver(&self) -> Option<&str> {
        Some("mailchimp")
    }

    async fn handle(
        &self,
        context: &HandlerContext,
    ) -> Result<Option<DispatchResponse>, HandlerError> {
        self.calls.lock().unwrap().push(context.clone());
        if self.fail {
            return Err("downstream store rejected the event".into());
        }
        Ok(self.response.clone())
    }
}

// ============================================================================
// App builders
// ============================================================================

/// Configuration with `abc` and `news` routes for MailChimp.
pub fn mailchimp_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.receivers.insert(
        "mailchimp".to_string(),
        ReceiverConfig {
            secret: format!("abc={SECRET},news={OTHER_SECRET}"),
        },
    );
    config
}

/// Router wired to `handler` exactly as the service wires it.
pub fn create_test_app(config: ServiceConfig, handler: RecordingHandler) -> Router {
    let mut handlers = HandlerRegistry::new();
    handlers.register(Arc::new(handler));

    let receivers = build_receiver_registry(&config, Arc::new(handlers))
        .expect("test configuration must be valid");
    let metrics = ServiceMetrics::new().expect("metrics must initialize");

    create_router(AppState::new(config, receivers, metrics))
}

// ============================================================================
// Request builders
// ============================================================================

#[allow(dead_code)]
pub fn webhook_url(route: &str, code: Option<&str>) -> String {
    let mut url = format!("https://hooks.example.com/api/webhooks/incoming/mailchimp/{route}");
    if let Some(code) = code {
        url.push_str("?code=");
        url.push_str(code);
    }
    url
}

#[allow(dead_code)]
pub fn get(url: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(url)
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub fn post_form(url: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(url)
        .header(CONTENT_TYPE, FORM)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
