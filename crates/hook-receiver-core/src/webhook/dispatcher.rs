//! Application handler trait and the default dispatcher.
//!
//! Applications implement [`WebhookHandler`] and register instances with a
//! [`HandlerRegistry`]. For every verified delivery the registry runs each
//! matching handler once, in ascending [`order`](WebhookHandler::order), and
//! awaits them inline so a handler failure can still change the HTTP
//! response.
//!
//! # Examples
//!
//! ```rust
//! use hook_receiver_core::webhook::{
//!     DispatchResponse, HandlerContext, HandlerError, HandlerRegistry, WebhookHandler,
//! };
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct UnsubscribeHandler;
//!
//! #[async_trait]
//! impl WebhookHandler for UnsubscribeHandler {
//!     fn receiver(&self) -> Option<&str> {
//!         Some("mailchimp")
//!     }
//!
//!     async fn handle(
//!         &self,
//!         context: &HandlerContext,
//!     ) -> Result<Option<DispatchResponse>, HandlerError> {
//!         if context.discriminators.contains("unsubscribe") {
//!             println!("{:?} left the list", context.event.get("data[email]"));
//!         }
//!         Ok(None)
//!     }
//! }
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register(Arc::new(UnsubscribeHandler));
//! assert_eq!(registry.len(), 1);
//! ```

use async_trait::async_trait;
use std::{error::Error, sync::Arc};
use tracing::{debug, error, info};

use super::{Discriminators, NormalizedEvent};
use crate::{ReceiverName, RouteId};

/// Order used when a handler does not override [`WebhookHandler::order`].
pub const DEFAULT_HANDLER_ORDER: i32 = 50;

/// Error type handlers return.
pub type HandlerError = Box<dyn Error + Send + Sync>;

/// Response a handler or dispatcher asks the receiver to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Option<String>,
}

impl DispatchResponse {
    /// Empty `200 OK`.
    pub fn ok() -> Self {
        Self::with_status(200)
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: None,
        }
    }

    pub fn with_body(mut self, content_type: impl Into<String>, body: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self.body = Some(body.into());
        self
    }
}

/// Everything a handler learns about one delivery.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub receiver: ReceiverName,
    pub route_id: RouteId,
    pub discriminators: Discriminators,
    pub event: NormalizedEvent,
}

impl HandlerContext {
    pub fn new(
        receiver: ReceiverName,
        route_id: RouteId,
        discriminators: Discriminators,
        event: NormalizedEvent,
    ) -> Self {
        Self {
            receiver,
            route_id,
            discriminators,
            event,
        }
    }
}

/// Application-provided WebHook handler.
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    /// Receiver this handler is limited to, or `None` for every receiver.
    ///
    /// Compared case-insensitively with the receiver name.
    fn receiver(&self) -> Option<&str> {
        None
    }

    /// Position in the invocation sequence; lower runs first.
    fn order(&self) -> i32 {
        DEFAULT_HANDLER_ORDER
    }

    /// Name used in logs and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Handle one delivery.
    ///
    /// Returning `Some` proposes the HTTP response. The first handler to do so
    /// wins; later handlers still run. Returning an error stops dispatch and
    /// turns into a `500` for the vendor.
    async fn handle(&self, context: &HandlerContext)
        -> Result<Option<DispatchResponse>, HandlerError>;
}

/// Errors raised while dispatching to handlers.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Handler '{handler}' failed: {source}")]
    HandlerFailed {
        handler: String,
        #[source]
        source: HandlerError,
    },
}

/// Invokes application handlers for a verified, decoded delivery.
#[async_trait]
pub trait HandlerDispatcher: Send + Sync {
    /// Run handlers for the delivery and produce the response.
    ///
    /// Called exactly once per successfully decoded `POST`.
    async fn dispatch(&self, context: HandlerContext) -> Result<DispatchResponse, DispatchError>;
}

/// Ordered collection of handlers; the default [`HandlerDispatcher`].
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn WebhookHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler. Handlers with equal order keep registration order.
    pub fn register(&mut self, handler: Arc<dyn WebhookHandler>) -> &mut Self {
        debug!(handler = handler.name(), order = handler.order(), "Registering WebHook handler");
        self.handlers.push(handler);
        self.handlers.sort_by_key(|h| h.order());
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    fn matching<'a>(
        &'a self,
        receiver: &'a ReceiverName,
    ) -> impl Iterator<Item = &'a Arc<dyn WebhookHandler>> + 'a {
        self.handlers.iter().filter(move |handler| {
            handler
                .receiver()
                .map_or(true, |name| name.eq_ignore_ascii_case(receiver.as_str()))
        })
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.handlers.iter().map(|h| h.name()).collect();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &names)
            .finish()
    }
}

#[async_trait]
impl HandlerDispatcher for HandlerRegistry {
    async fn dispatch(&self, context: HandlerContext) -> Result<DispatchResponse, DispatchError> {
        let mut response: Option<DispatchResponse> = None;
        let mut invoked = 0usize;

        for handler in self.matching(&context.receiver) {
            invoked += 1;
            match handler.handle(&context).await {
                Ok(Some(proposed)) => {
                    if response.is_none() {
                        response = Some(proposed);
                    }
                }
                Ok(None) => {}
                Err(source) => {
                    error!(
                        receiver = %context.receiver,
                        route_id = %context.route_id,
                        handler = handler.name(),
                        error = %source,
                        "WebHook handler failed"
                    );
                    return Err(DispatchError::HandlerFailed {
                        handler: handler.name().to_string(),
                        source,
                    });
                }
            }
        }

        debug!(
            receiver = %context.receiver,
            event = %context.discriminators,
            handlers = invoked,
            "WebHook dispatched"
        );

        Ok(response.unwrap_or_else(DispatchResponse::ok))
    }
}

/// Handler that records every delivery in the service log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

#[async_trait]
impl WebhookHandler for LoggingHandler {
    fn order(&self) -> i32 {
        0
    }

    fn name(&self) -> &str {
        "logging"
    }

    async fn handle(
        &self,
        context: &HandlerContext,
    ) -> Result<Option<DispatchResponse>, HandlerError> {
        info!(
            receiver = %context.receiver,
            route_id = %context.route_id,
            event = %context.discriminators,
            fields = context.event.len(),
            "WebHook event received"
        );
        Ok(None)
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
