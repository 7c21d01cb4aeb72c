//! Configuration types for the HTTP service

use crate::errors::ConfigError;
use hook_receiver_core::{
    webhook::{TransportPolicy, MAILCHIMP_RECEIVER_NAME},
    ReceiverName, SecretSnapshot,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use tracing::info;

/// Environment variable prefix for configuration overrides, e.g.
/// `HOOKS__SERVER__PORT=9090`.
pub const ENV_PREFIX: &str = "HOOKS";

/// Environment variable naming an explicit configuration file.
pub const CONFIG_FILE_ENV: &str = "HOOKS_CONFIG_FILE";

/// Receiver kinds this service knows how to build.
pub const KNOWN_RECEIVERS: &[&str] = &[MAILCHIMP_RECEIVER_NAME];

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// WebHook endpoint settings
    pub webhooks: WebhookConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Shared secrets keyed by receiver name
    pub receivers: BTreeMap<String, ReceiverConfig>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,

    /// Use `X-Forwarded-Proto` to decide whether a request arrived over HTTPS.
    /// Only enable behind a proxy that sets the header.
    pub trust_forwarded_proto: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            timeout_seconds: 30,
            shutdown_timeout_seconds: 30,
            max_body_size: 10 * 1024 * 1024, // 10MB
            trust_forwarded_proto: false,
        }
    }
}

/// WebHook endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Path prefix; receivers are served at `{base_path}/{receiver}[/{id}]`
    pub base_path: String,

    /// Accept plain HTTP from any peer
    pub disable_https_check: bool,

    /// Accept plain HTTP from loopback peers
    pub allow_loopback: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            base_path: "/api/webhooks/incoming".to_string(),
            disable_https_check: false,
            allow_loopback: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Secret setting for one receiver kind.
///
/// `secret` is either a single secret for the default route or
/// `id1=secret1,id2=secret2`.
#[derive(Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    pub secret: String,
}

impl fmt::Debug for ReceiverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiverConfig")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl ServiceConfig {
    /// Load configuration from the layered sources, later ones overriding
    /// earlier ones:
    ///
    /// 1. `/etc/hook-receiver/service.yaml`
    /// 2. `./config/service.yaml`
    /// 3. `explicit_path`, required when given
    /// 4. `HOOKS__`-prefixed environment variables
    ///
    /// Missing optional files fall back to built-in defaults. A malformed file
    /// or an environment value of the wrong type is an error.
    pub fn load(explicit_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(
                config::File::with_name("/etc/hook-receiver/service")
                    .required(false)
                    .format(config::FileFormat::Yaml),
            )
            .add_source(
                config::File::with_name("config/service")
                    .required(false)
                    .format(config::FileFormat::Yaml),
            );

        if let Some(path) = explicit_path.filter(|p| !p.is_empty()) {
            builder = builder.add_source(
                config::File::with_name(path)
                    .required(true)
                    .format(config::FileFormat::Yaml),
            );
            info!(path = %path, "Loading configuration from explicit path");
        }

        let loaded = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(loaded.try_deserialize()?)
    }

    /// Validate the configuration, including every secret setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = &self.webhooks.base_path;
        if !base.starts_with('/') || (base.len() > 1 && base.ends_with('/')) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "webhooks.base_path '{base}' must start with '/' and must not end with '/'"
                ),
            });
        }

        if self.server.timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "server.timeout_seconds must be greater than zero".to_string(),
            });
        }

        if self.server.max_body_size == 0 {
            return Err(ConfigError::Invalid {
                message: "server.max_body_size must be greater than zero".to_string(),
            });
        }

        self.secret_snapshot().map(|_| ())
    }

    /// Transport policy for every receiver.
    pub fn transport_policy(&self) -> TransportPolicy {
        TransportPolicy {
            disable_https_check: self.webhooks.disable_https_check,
            allow_loopback: self.webhooks.allow_loopback,
        }
    }

    /// Build the immutable secret table from `receivers`.
    pub fn secret_snapshot(&self) -> Result<SecretSnapshot, ConfigError> {
        let mut snapshot = SecretSnapshot::new();

        for (name, receiver) in &self.receivers {
            let receiver_name =
                ReceiverName::new(name.as_str()).map_err(|e| ConfigError::Invalid {
                    message: format!("receivers.{name}: {e}"),
                })?;

            if !KNOWN_RECEIVERS.contains(&receiver_name.as_str()) {
                return Err(ConfigError::UnknownReceiver {
                    receiver: name.clone(),
                });
            }

            snapshot
                .add_setting(&receiver_name, &receiver.secret)
                .map_err(|source| ConfigError::Secret {
                    receiver: name.clone(),
                    source,
                })?;
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
