//! The WebHook request pipeline.

use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::{
    CodeValidator, HandlerContext, HandlerDispatcher, HttpMethod, ReceiverError, ReceiverProfile,
    TransportGuard, WebhookRequest,
};
use crate::{secret_store::SecretStore, DispatchResponse, ReceiverName, RouteId};

/// Pipeline stage a request reached.
///
/// Stages only move forward. A rejection is reported with the last stage
/// that completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Start,
    TransportChecked,
    CodeChecked,
    Acknowledged,
    BodyDecoded,
    Routed,
    Dispatched,
}

/// Verifies and dispatches deliveries for one vendor.
///
/// The pipeline is the same for every vendor:
///
/// ```text
/// Start -> TransportChecked -> CodeChecked -+-> Acknowledged            (GET)
///                                           +-> BodyDecoded -> Routed -> Dispatched (POST)
/// ```
///
/// Any other method is rejected at `Start` without looking up a secret.
pub struct WebhookReceiver {
    profile: Arc<dyn ReceiverProfile>,
    transport: TransportGuard,
    validator: CodeValidator,
    dispatcher: Arc<dyn HandlerDispatcher>,
}

impl WebhookReceiver {
    pub fn new(
        profile: Arc<dyn ReceiverProfile>,
        transport: TransportGuard,
        secrets: Arc<dyn SecretStore>,
        dispatcher: Arc<dyn HandlerDispatcher>,
    ) -> Self {
        Self {
            profile,
            transport,
            validator: CodeValidator::new(secrets),
            dispatcher,
        }
    }

    pub fn name(&self) -> &ReceiverName {
        self.profile.name()
    }

    /// Process one request for `route_id`.
    ///
    /// Returns the response to send on success, or the rejection whose
    /// status code should be sent instead.
    #[instrument(
        skip(self, request),
        fields(receiver = %self.name(), route_id = %route_id, method = %request.method)
    )]
    pub async fn receive(
        &self,
        route_id: &RouteId,
        request: WebhookRequest,
    ) -> Result<DispatchResponse, ReceiverError> {
        match request.method {
            HttpMethod::Get => self.receive_handshake(route_id, &request).await,
            HttpMethod::Post => self.receive_delivery(route_id, &request).await,
            HttpMethod::Other(ref method) => Err(self.reject(
                Stage::Start,
                ReceiverError::MethodNotAllowed {
                    method: method.clone(),
                    receiver: self.name().to_string(),
                },
            )),
        }
    }

    async fn receive_handshake(
        &self,
        route_id: &RouteId,
        request: &WebhookRequest,
    ) -> Result<DispatchResponse, ReceiverError> {
        self.verify(route_id, request).await?;

        info!(stage = ?Stage::Acknowledged, "WebHook handshake acknowledged");
        Ok(DispatchResponse::ok())
    }

    async fn receive_delivery(
        &self,
        route_id: &RouteId,
        request: &WebhookRequest,
    ) -> Result<DispatchResponse, ReceiverError> {
        self.verify(route_id, request).await?;

        let event = self
            .profile
            .decode_payload(request.content_type(), &request.body)
            .map_err(|e| self.reject(Stage::CodeChecked, e))?;
        debug!(stage = ?Stage::BodyDecoded, fields = event.len(), "WebHook body decoded");

        let discriminators = self
            .profile
            .extract_discriminators(&event)
            .map_err(|e| self.reject(Stage::BodyDecoded, e))?;
        debug!(stage = ?Stage::Routed, event = %discriminators, "WebHook event routed");

        let context = HandlerContext::new(
            self.name().clone(),
            route_id.clone(),
            discriminators,
            event,
        );
        let response = self
            .dispatcher
            .dispatch(context)
            .await
            .map_err(|e| self.reject(Stage::Routed, e.into()))?;

        debug!(stage = ?Stage::Dispatched, status = response.status, "WebHook dispatched");
        Ok(response)
    }

    /// Transport check followed by code verification. Shared by both methods.
    async fn verify(&self, route_id: &RouteId, request: &WebhookRequest) -> Result<(), ReceiverError> {
        self.transport
            .verify(self.name(), request)
            .map_err(|e| self.reject(Stage::Start, e))?;

        self.validator
            .verify(request, self.name(), route_id)
            .await
            .map_err(|e| self.reject(Stage::TransportChecked, e))
    }

    /// Log a rejection at a severity matching who is at fault.
    fn reject(&self, stage: Stage, error: ReceiverError) -> ReceiverError {
        if error.is_server_error() || matches!(error, ReceiverError::MissingDiscriminator { .. }) {
            error!(stage = ?stage, kind = error.kind(), error = %error, "WebHook request failed");
        } else {
            warn!(stage = ?stage, kind = error.kind(), error = %error, "WebHook request rejected");
        }
        error
    }
}

impl std::fmt::Debug for WebhookReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookReceiver")
            .field("name", self.name())
            .field("transport", &self.transport)
            .finish()
    }
}

#[cfg(test)]
#[path = "receiver_tests.rs"]
mod tests;
