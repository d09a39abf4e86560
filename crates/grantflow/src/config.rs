//! Flow configuration.
//!
//! Plain-data settings for the device flow, token lifespans, rich
//! authorization requests and token exchange. Everything here can be loaded
//! from TOML; behaviour that cannot be expressed as data (type handlers,
//! matching strategies) lives in [`crate::rar::AuthorizationDetailsPolicy`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::token_types::ACCESS_TOKEN_TYPE;

/// Root configuration.
///
/// # Example (TOML)
///
/// ```toml
/// send_debug_messages_to_clients = false
///
/// [device]
/// code_lifespan = "10m"
/// polling_interval = "5s"
/// verification_uri = "https://auth.example.com/device"
///
/// [token]
/// access_token_lifespan = "1h"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Device authorization grant settings.
    pub device: DeviceConfig,

    /// Access and refresh token settings.
    pub token: TokenConfig,

    /// Rich authorization request settings.
    pub authorization_details: AuthorizationDetailsConfig,

    /// Token exchange settings.
    pub token_exchange: TokenExchangeConfig,

    /// Include server-side error detail in error bodies.
    /// Never enable this in production.
    pub send_debug_messages_to_clients: bool,
}

/// Device authorization grant (RFC 8628) settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Lifespan of both the device code and the user code.
    #[serde(with = "humantime_serde")]
    pub code_lifespan: Duration,

    /// Minimum time a device must wait between token requests.
    #[serde(with = "humantime_serde")]
    pub polling_interval: Duration,

    /// End-user verification URI shown on the device.
    pub verification_uri: String,

    /// Also return `verification_uri_complete` with the user code embedded.
    pub include_verification_uri_complete: bool,

    /// Authenticate the client at the device authorization endpoint.
    /// When disabled the client is looked up by `client_id` only.
    pub authenticate_client: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            code_lifespan: Duration::from_secs(600), // 10 minutes
            polling_interval: Duration::from_secs(5),
            verification_uri: "http://localhost:8080/device".to_string(),
            include_verification_uri_complete: true,
            authenticate_client: false,
        }
    }
}

/// Access and refresh token settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Access token lifespan.
    #[serde(with = "humantime_serde")]
    pub access_token_lifespan: Duration,

    /// Refresh token lifespan.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifespan: Duration,

    /// Scopes that make a request eligible for a refresh token.
    /// When empty, every request may receive one.
    pub refresh_token_scopes: Vec<String>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_token_lifespan: Duration::from_secs(3600), // 1 hour
            refresh_token_lifespan: Duration::from_secs(30 * 24 * 3600), // 30 days
            refresh_token_scopes: vec!["offline".to_string(), "offline_access".to_string()],
        }
    }
}

/// Rich authorization request (RFC 9396) settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthorizationDetailsConfig {
    /// Authorization detail types accepted by this server.
    pub supported_types: Vec<String>,

    /// Drop unsupported types instead of rejecting the request.
    pub ignore_unknown_types: bool,
}

/// Token exchange (RFC 8693) settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenExchangeConfig {
    /// Token type issued when the request names none.
    pub default_requested_token_type: String,
}

impl Default for TokenExchangeConfig {
    fn default() -> Self {
        Self {
            default_requested_token_type: ACCESS_TOKEN_TYPE.to_string(),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// The configuration text could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl FlowConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML and any error from
    /// [`FlowConfig::validate`].
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The device code lifespan is zero or shorter than the polling interval
    /// - An access or refresh token lifespan is zero
    /// - A supported authorization detail type is empty
    ///
    /// Returns `ConfigError::Missing` if the verification URI or the default
    /// requested token type is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.code_lifespan.is_zero() {
            return Err(ConfigError::InvalidValue(
                "device.code_lifespan must be > 0".to_string(),
            ));
        }

        if self.device.code_lifespan < self.device.polling_interval {
            return Err(ConfigError::InvalidValue(format!(
                "device.polling_interval ({}s) exceeds device.code_lifespan ({}s)",
                self.device.polling_interval.as_secs(),
                self.device.code_lifespan.as_secs()
            )));
        }

        if self.device.verification_uri.is_empty() {
            return Err(ConfigError::Missing("device.verification_uri".to_string()));
        }

        if url::Url::parse(&self.device.verification_uri).is_err() {
            return Err(ConfigError::InvalidValue(format!(
                "device.verification_uri is not an absolute URL: '{}'",
                self.device.verification_uri
            )));
        }

        if self.token.access_token_lifespan.is_zero() {
            return Err(ConfigError::InvalidValue(
                "token.access_token_lifespan must be > 0".to_string(),
            ));
        }

        if self.token.refresh_token_lifespan.is_zero() {
            return Err(ConfigError::InvalidValue(
                "token.refresh_token_lifespan must be > 0".to_string(),
            ));
        }

        if self
            .authorization_details
            .supported_types
            .iter()
            .any(|t| t.trim().is_empty())
        {
            return Err(ConfigError::InvalidValue(
                "authorization_details.supported_types cannot contain empty entries".to_string(),
            ));
        }

        if self.token_exchange.default_requested_token_type.is_empty() {
            return Err(ConfigError::Missing(
                "token_exchange.default_requested_token_type".to_string(),
            ));
        }

        Ok(())
    }
}
