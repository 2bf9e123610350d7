//! Least-connections upstream selection over live store reads.

use crate::error::GatewayError;
use crate::store::{keys, StateStore, StoreError};

/// Outcome of a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Base address of the chosen upstream.
    pub upstream: String,
    /// True when no upstream was eligible and the first configured one was
    /// used as a best-effort fallback.
    pub degraded: bool,
}

/// Pick the best eligible upstream for one request.
///
/// Eligibility requires the health flag to be explicitly `"1"`; an absent or
/// unknown record means ineligible. Among eligible upstreams the one with the
/// fewest active connections wins, ties resolving to the earliest-listed
/// candidate. A store outage or a fully-unhealthy set falls back to the first
/// configured upstream, reported as degraded.
pub async fn select_upstream(
    store: &dyn StateStore,
    upstreams: &[String],
) -> Result<Selection, GatewayError> {
    let first = upstreams.first().ok_or(GatewayError::NoBackendAvailable)?;

    match least_loaded_healthy(store, upstreams).await {
        Ok(Some(upstream)) => Ok(Selection {
            upstream,
            degraded: false,
        }),
        Ok(None) => {
            tracing::warn!(fallback = %first, "no healthy upstream, using fallback");
            Ok(Selection {
                upstream: first.clone(),
                degraded: true,
            })
        }
        Err(e) => {
            tracing::warn!(error = %e, fallback = %first, "state store unreachable during selection, using fallback");
            Ok(Selection {
                upstream: first.clone(),
                degraded: true,
            })
        }
    }
}

async fn least_loaded_healthy(
    store: &dyn StateStore,
    upstreams: &[String],
) -> Result<Option<String>, StoreError> {
    let mut best: Option<(&String, i64)> = None;

    for upstream in upstreams {
        let healthy = store
            .get(&keys::health(upstream))
            .await?
            .is_some_and(|v| v == "1");
        if !healthy {
            continue;
        }

        let connections = store
            .get(&keys::conn(upstream))
            .await?
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);

        // Strict comparison keeps the earliest-listed upstream on ties.
        if best.map_or(true, |(_, min)| connections < min) {
            best = Some((upstream, connections));
        }
    }

    Ok(best.map(|(upstream, _)| upstream.clone()))
}
