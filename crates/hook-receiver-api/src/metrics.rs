//! Metrics collection for the WebHook service.

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::{sync::Arc, time::Duration};

/// Service metrics for observability
///
/// Metrics live in a registry owned by the service instance so several
/// instances (for example in tests) never collide.
#[derive(Debug)]
pub struct ServiceMetrics {
    registry: Registry,

    /// Requests per receiver and outcome (`accepted` or a rejection kind)
    pub webhook_requests_total: IntCounterVec,

    /// End-to-end processing time per receiver
    pub webhook_duration_seconds: HistogramVec,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let webhook_requests_total = IntCounterVec::new(
            Opts::new(
                "hook_requests_total",
                "Total WebHook requests by receiver and outcome",
            ),
            &["receiver", "outcome"],
        )?;
        registry.register(Box::new(webhook_requests_total.clone()))?;

        let webhook_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "hook_request_duration_seconds",
                "WebHook processing time distribution",
            )
            .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0]),
            &["receiver"],
        )?;
        registry.register(Box::new(webhook_duration_seconds.clone()))?;

        Ok(Arc::new(Self {
            registry,
            webhook_requests_total,
            webhook_duration_seconds,
        }))
    }

    /// Record one finished WebHook request.
    pub fn record_request(&self, receiver: &str, outcome: &str, duration: Duration) {
        self.webhook_requests_total
            .with_label_values(&[receiver, outcome])
            .inc();
        self.webhook_duration_seconds
            .with_label_values(&[receiver])
            .observe(duration.as_secs_f64());
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}
