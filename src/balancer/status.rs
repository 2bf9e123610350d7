//! Read-only per-upstream status aggregation.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::store::{keys, StateStore, StoreError};

/// Operational snapshot of one upstream. Absent records read as
/// unhealthy/zero; no record is ever "missing" from the caller's view.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UpstreamStatus {
    pub healthy: bool,
    pub failures: i64,
    pub latency_ms: i64,
    pub connections: i64,
}

/// Aggregate health, failures, latency, and connection counts for every
/// configured upstream. Pure reads; safe to poll frequently.
pub async fn upstream_status(
    store: &dyn StateStore,
    upstreams: &[String],
) -> Result<BTreeMap<String, UpstreamStatus>, StoreError> {
    let mut result = BTreeMap::new();

    for upstream in upstreams {
        let healthy = store
            .get(&keys::health(upstream))
            .await?
            .is_some_and(|v| v == "1");
        let failures = read_int(store, &keys::fail(upstream)).await?;
        let latency_ms = read_int(store, &keys::latency(upstream)).await?;
        let connections = read_int(store, &keys::conn(upstream)).await?;

        result.insert(
            upstream.clone(),
            UpstreamStatus {
                healthy,
                failures,
                latency_ms,
                connections,
            },
        );
    }

    Ok(result)
}

async fn read_int(store: &dyn StateStore, key: &str) -> Result<i64, StoreError> {
    Ok(store
        .get(key)
        .await?
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0))
}
