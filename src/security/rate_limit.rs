//! Fixed-window admission control backed by the shared store.

use std::net::IpAddr;
use std::time::Duration;

use crate::auth::Claims;
use crate::config::{RateLimitConfig, RateLimitIdentity};
use crate::error::GatewayError;
use crate::observability::metrics;
use crate::store::{keys, StateStore};

/// Resolve the quota identity for a request.
pub fn resolve_identity(policy: RateLimitIdentity, claims: &Claims, addr: IpAddr) -> String {
    match policy {
        RateLimitIdentity::PreferSubject if !claims.sub.is_empty() => claims.sub.clone(),
        _ => addr.to_string(),
    }
}

/// Per-client fixed-window request counter.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limit: i64,
    window: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            limit: config.limit,
            window: Duration::from_secs(config.window_secs),
        }
    }

    /// Admit or reject one request for `identity`.
    ///
    /// First request in a window creates the counter with the window's
    /// expiry; at the limit the request is rejected carrying the remaining
    /// window time as the retry hint. Store failures admit the request
    /// (fail-open) with a warning.
    pub async fn check(
        &self,
        store: &dyn StateStore,
        identity: &str,
    ) -> Result<(), GatewayError> {
        let key = keys::rate_limit(identity);

        let current = match store.get(&key).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, client = %identity, "state store unreachable, admitting without quota check");
                return Ok(());
            }
        };

        match current {
            None => {
                if let Err(e) = store.set_ex(&key, "1", self.window).await {
                    tracing::warn!(error = %e, client = %identity, "failed to open quota window, admitting");
                }
                Ok(())
            }
            Some(raw) => {
                let count = raw.parse::<i64>().unwrap_or(0);
                if count >= self.limit {
                    let retry_after = match store.ttl(&key).await {
                        Ok(Some(ttl)) => ttl,
                        _ => self.window,
                    };
                    tracing::warn!(client = %identity, count, "rate limit exceeded");
                    metrics::record_rate_limited();
                    return Err(GatewayError::AdmissionRejected {
                        retry_after_secs: retry_after.as_secs(),
                    });
                }
                if let Err(e) = store.incr(&key).await {
                    tracing::warn!(error = %e, client = %identity, "failed to increment quota counter, admitting");
                }
                Ok(())
            }
        }
    }
}
