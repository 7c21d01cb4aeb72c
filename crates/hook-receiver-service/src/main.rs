//! # Hook Receiver Service
//!
//! Binary entry point for the WebHook receiver HTTP service.
//!
//! This executable:
//! - Loads configuration from files and environment
//! - Initializes logging
//! - Registers the WebHook handlers
//! - Starts the HTTP server from hook-receiver-api
//!
//! Exit codes: `1` bind failure, `2` server failure, `3` invalid configuration.

use anyhow::Context;
use hook_receiver_api::{
    build_receiver_registry, config::CONFIG_FILE_ENV, start_server, LoggingConfig, ServiceConfig,
    ServiceError,
};
use hook_receiver_core::{webhook::LoggingHandler, HandlerRegistry};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // -------------------------------------------------------------------------
    // Load configuration
    //
    // Sources (applied in order, later sources override earlier ones):
    //  1. /etc/hook-receiver/service.yaml
    //  2. ./config/service.yaml
    //  3. Path given by HOOKS_CONFIG_FILE
    //  4. Environment variables prefixed HOOKS__ (double-underscore separator)
    //     e.g. HOOKS__RECEIVERS__MAILCHIMP__SECRET=...
    //
    // Logging is configured from the loaded settings, so configuration errors
    // are reported on a fallback subscriber.
    // -------------------------------------------------------------------------
    let explicit_path = std::env::var(CONFIG_FILE_ENV).ok();
    let service_config = match ServiceConfig::load(explicit_path.as_deref())
        .context("could not load service configuration")
    {
        Ok(config) => config,
        Err(e) => {
            init_logging(&LoggingConfig::default());
            error!(error = ?e, "Failed to load configuration; aborting");
            std::process::exit(3);
        }
    };

    init_logging(&service_config.logging);
    info!("Starting Hook Receiver Service");

    if let Err(e) = service_config.validate() {
        error!(error = %e, "Service configuration is invalid; aborting");
        std::process::exit(3);
    }

    // Application handlers are registered here
    let mut handlers = HandlerRegistry::new();
    handlers.register(Arc::new(LoggingHandler));

    let receivers = match build_receiver_registry(&service_config, Arc::new(handlers)) {
        Ok(registry) => registry,
        Err(e) => {
            error!(error = %e, "Failed to build WebHook receivers; aborting");
            std::process::exit(3);
        }
    };

    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        base_path = %service_config.webhooks.base_path,
        "Starting HTTP server"
    );

    if let Err(e) = start_server(service_config, receivers).await {
        error!("Server terminated: {}", e);

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration(_) => 3,
        };

        std::process::exit(exit_code);
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "hook_receiver_service={level},hook_receiver_api={level},hook_receiver_core={level},tower_http=info",
            level = logging.level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if logging.json_format {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
