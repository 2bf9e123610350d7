//! Configuration schema definitions.
//!
//! All types derive Serde traits and carry defaults matching local operation
//! (two upstreams on 7001/7002, Redis on 6380).

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, request timeout).
    pub listener: ListenerConfig,

    /// Ordered list of upstream base addresses.
    pub upstreams: Vec<String>,

    /// Shared state store settings.
    pub store: StoreConfig,

    /// Health probe settings.
    pub health: HealthCheckConfig,

    /// Per-client admission control settings.
    pub rate_limit: RateLimitConfig,

    /// Forwarding settings.
    pub proxy: ProxyConfig,

    /// Credential issuance and verification settings.
    pub auth: AuthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            upstreams: vec![
                "http://localhost:7001".to_string(),
                "http://localhost:7002".to_string(),
            ],
            store: StoreConfig::default(),
            health: HealthCheckConfig::default(),
            rate_limit: RateLimitConfig::default(),
            proxy: ProxyConfig::default(),
            auth: AuthConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Whole-request timeout in seconds, enforced as an outer layer.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Shared state store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Redis connection URL.
    pub redis_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6380".to_string(),
        }
    }
}

/// Health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Probe interval in seconds.
    pub interval_secs: u64,

    /// Per-probe timeout in seconds.
    pub timeout_secs: u64,

    /// Path probed on each upstream.
    pub path: String,

    /// Consecutive failures before the circuit pins unhealthy.
    pub failure_threshold: i64,

    /// Duration of the unhealthy pin in seconds.
    pub pin_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            timeout_secs: 3,
            path: "/health".to_string(),
            failure_threshold: 3,
            pin_secs: 15,
        }
    }
}

/// Admission control (fixed-window rate limiting) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum requests per client per window.
    pub limit: i64,

    /// Window length in seconds.
    pub window_secs: u64,

    /// How a client is identified for quota accounting.
    pub identity: RateLimitIdentity,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 3,
            window_secs: 30,
            identity: RateLimitIdentity::PreferSubject,
        }
    }
}

/// Rate-limit identity policy. Resolved once per deployment so a client
/// cannot evade limiting by omitting a credential only some of the time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitIdentity {
    /// Use the authenticated subject, falling back to the client address.
    PreferSubject,
    /// Always use the client network address.
    AddressOnly,
}

impl std::str::FromStr for RateLimitIdentity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prefer_subject" => Ok(RateLimitIdentity::PreferSubject),
            "address_only" => Ok(RateLimitIdentity::AddressOnly),
            other => Err(format!(
                "unknown identity policy '{}', expected prefer_subject or address_only",
                other
            )),
        }
    }
}

/// Forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Timeout for a forwarded upstream request in seconds.
    pub timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self { timeout_secs: 15 }
    }
}

/// Credential configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret.
    pub secret: String,

    /// Token lifetime in minutes.
    pub token_expiry_mins: u64,

    /// Subject allowed to read `/admin/status`.
    pub admin_subject: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // WARNING: development default, override JWT_SECRET in production.
            secret: "dev-gateway-secret".to_string(),
            token_expiry_mins: 30,
            admin_subject: "admin".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
