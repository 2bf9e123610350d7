//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! environment variables
//!     → loader.rs (read & parse, built-in defaults for local runs)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is env-driven so a deployment can attach to any backend set
//!   without shipping files; every field has a local-operation default
//! - Config is immutable once loaded; changes require a restart
//! - Malformed values are a fatal startup error, the only fatal error class

pub mod loader;
pub mod schema;

pub use loader::{load_from_env, ConfigError};
pub use schema::{
    AuthConfig, GatewayConfig, HealthCheckConfig, ListenerConfig, ObservabilityConfig,
    ProxyConfig, RateLimitConfig, RateLimitIdentity, StoreConfig,
};
