//! Shared state store subsystem.
//!
//! # Data Flow
//! ```text
//! health monitor ──writes──▶ up_health / up_fail / up_lat / up_pin
//! dispatcher     ──writes──▶ up_conn (incr/decr), up_fail (fast path)
//! selector       ──reads───▶ up_health / up_conn
//! rate limiter   ──r/w─────▶ rate_limit:{client}
//! ```
//!
//! # Design Decisions
//! - All shared mutable state lives here, process-external; no in-process
//!   locks, every mutation is a single atomic store operation
//! - Keys are ephemeral and reconstructible; losing the store degrades
//!   routing but never corrupts it
//! - The trait seam lets tests run against an in-memory implementation

pub mod memory;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Error raised by state store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value store with per-key expiry and atomic counters.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read a key; `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a key without expiry.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Write a key that expires after `ttl`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Atomically increment a counter, creating it at 1. Returns the new value.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Atomically decrement a counter. Returns the new value; callers floor
    /// negative results back to zero.
    async fn decr(&self, key: &str) -> Result<i64, StoreError>;

    /// Remaining time-to-live, `None` when the key has no expiry or is absent.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError>;

    /// Whether a key currently exists.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;
}

/// Key namespace shared with the diagnostic CLI.
pub mod keys {
    /// In-flight connection counter for an upstream.
    pub fn conn(upstream: &str) -> String {
        format!("up_conn:{}", upstream)
    }

    /// Health verdict for an upstream ("1" healthy, anything else not).
    pub fn health(upstream: &str) -> String {
        format!("up_health:{}", upstream)
    }

    /// Consecutive probe failure counter for an upstream.
    pub fn fail(upstream: &str) -> String {
        format!("up_fail:{}", upstream)
    }

    /// Last successful probe round-trip in milliseconds.
    pub fn latency(upstream: &str) -> String {
        format!("up_lat:{}", upstream)
    }

    /// Circuit pin marker; while present the upstream stays unhealthy.
    pub fn pin(upstream: &str) -> String {
        format!("up_pin:{}", upstream)
    }

    /// Fixed-window request counter for a client identity.
    pub fn rate_limit(identity: &str) -> String {
        format!("rate_limit:{}", identity)
    }
}
