//! Configuration loading from the environment.

use std::env;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, RateLimitIdentity};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("UPSTREAM_URLS must contain at least one address")]
    NoUpstreams,
}

/// Load and validate configuration from process environment variables.
pub fn load_from_env() -> Result<GatewayConfig, ConfigError> {
    load_with(|var| env::var(var).ok())
}

/// Load configuration from an arbitrary variable lookup.
///
/// Split out from [`load_from_env`] so tests can inject variables without
/// touching process-global state.
pub fn load_with<F>(get: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = GatewayConfig::default();

    if let Some(v) = get("GATEWAY_BIND") {
        config.listener.bind_address = v;
    }
    if let Some(v) = get("UPSTREAM_URLS") {
        config.upstreams = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(v) = get("REDIS_URL") {
        config.store.redis_url = v;
    }

    parse_into(&get, "RATE_LIMIT", &mut config.rate_limit.limit)?;
    parse_into(&get, "RATE_LIMIT_WINDOW_SECS", &mut config.rate_limit.window_secs)?;
    parse_into(&get, "RATE_LIMIT_IDENTITY", &mut config.rate_limit.identity)?;

    parse_into(&get, "HEALTH_INTERVAL_SECS", &mut config.health.interval_secs)?;
    parse_into(&get, "HEALTH_TIMEOUT_SECS", &mut config.health.timeout_secs)?;
    if let Some(v) = get("HEALTH_PATH") {
        config.health.path = v;
    }
    parse_into(&get, "FAILURE_THRESHOLD", &mut config.health.failure_threshold)?;
    parse_into(&get, "CIRCUIT_PIN_SECS", &mut config.health.pin_secs)?;

    parse_into(&get, "PROXY_TIMEOUT_SECS", &mut config.proxy.timeout_secs)?;
    parse_into(&get, "REQUEST_TIMEOUT_SECS", &mut config.listener.request_timeout_secs)?;

    if let Some(v) = get("JWT_SECRET") {
        config.auth.secret = v;
    }
    parse_into(&get, "TOKEN_EXPIRY_MINS", &mut config.auth.token_expiry_mins)?;
    if let Some(v) = get("ADMIN_SUBJECT") {
        config.auth.admin_subject = v;
    }

    parse_into(&get, "METRICS_ENABLED", &mut config.observability.metrics_enabled)?;
    if let Some(v) = get("METRICS_ADDRESS") {
        config.observability.metrics_address = v;
    }

    validate(&config)?;
    Ok(config)
}

fn parse_into<F, T>(get: &F, var: &'static str, slot: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = get(var) {
        *slot = raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw,
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

fn validate(config: &GatewayConfig) -> Result<(), ConfigError> {
    if config.upstreams.is_empty() {
        return Err(ConfigError::NoUpstreams);
    }
    for upstream in &config.upstreams {
        Url::parse(upstream).map_err(|e| ConfigError::Invalid {
            var: "UPSTREAM_URLS",
            value: upstream.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}
