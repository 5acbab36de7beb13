//! Storefront configuration

use std::time::Duration;

use crate::gateway::GatewayConfig;

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{0} must be set in {1} environment")]
    MissingSecret(&'static str, String),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Storefront configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// HS256 secret for customer/admin bearer tokens
    pub jwt_secret: String,
    pub gateway: GatewayConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let environment = var("ENVIRONMENT").unwrap_or_else(|| "development".into());

        let http_port = match var("HTTP_PORT") {
            Some(p) => p.parse().map_err(|_| ConfigError::Invalid {
                name: "HTTP_PORT",
                value: p,
            })?,
            None => 8080,
        };
        let timeout_secs: u64 = match var("GATEWAY_TIMEOUT_SECS") {
            Some(t) => t.parse().map_err(|_| ConfigError::Invalid {
                name: "GATEWAY_TIMEOUT_SECS",
                value: t,
            })?,
            None => 10,
        };

        // No development fallback for gateway credentials
        let require = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        Ok(Self {
            database_url: require("DATABASE_URL")?,
            http_port,
            jwt_secret: Self::require_secret(var("JWT_SECRET"), "JWT_SECRET", &environment)?,
            gateway: GatewayConfig {
                key_id: require("GATEWAY_KEY_ID")?,
                key_secret: require("GATEWAY_KEY_SECRET")?,
                webhook_secret: require("GATEWAY_WEBHOOK_SECRET")?,
                base_url: var("GATEWAY_BASE_URL")
                    .unwrap_or_else(|| "https://api.razorpay.com/v1".into())
                    .trim_end_matches('/')
                    .to_string(),
                currency: var("GATEWAY_CURRENCY")
                    .unwrap_or_else(|| "INR".into())
                    .to_ascii_uppercase(),
                timeout: Duration::from_secs(timeout_secs),
            },
            environment,
        })
    }

    /// Secret that may fall back to a dev value only in development
    fn require_secret(
        value: Option<String>,
        name: &'static str,
        environment: &str,
    ) -> Result<String, ConfigError> {
        match value {
            Some(v) => Ok(v),
            None if environment == "development" => Ok(format!("dev-{name}-not-for-production")),
            None => Err(ConfigError::MissingSecret(name, environment.to_string())),
        }
    }
}
