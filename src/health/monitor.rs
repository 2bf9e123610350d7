//! Background upstream probe loop.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use futures_util::future::join_all;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::config::HealthCheckConfig;
use crate::observability::metrics;
use crate::store::{keys, StateStore};

pub struct HealthMonitor {
    store: Arc<dyn StateStore>,
    upstreams: Vec<String>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(
        store: Arc<dyn StateStore>,
        upstreams: Vec<String>,
        config: HealthCheckConfig,
    ) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            store,
            upstreams,
            config,
            client,
        }
    }

    /// Probe loop; exits when the shutdown signal fires, letting the cycle
    /// currently in flight finish first.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval = self.config.interval_secs,
            path = %self.config.path,
            upstreams = self.upstreams.len(),
            "health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every upstream concurrently; one slow or dead upstream never
    /// delays the others.
    pub async fn check_all(&self) {
        join_all(self.upstreams.iter().map(|u| self.probe(u))).await;
    }

    async fn probe(&self, upstream: &str) {
        let uri = format!("{}{}", upstream.trim_end_matches('/'), self.config.path);
        let request = match Request::builder()
            .method("GET")
            .uri(&uri)
            .header("user-agent", "api-gateway-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(upstream = %upstream, error = %e, "failed to build health probe request");
                return;
            }
        };

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let started = Instant::now();

        match time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) if response.status().is_success() => {
                let latency_ms = started.elapsed().as_millis() as i64;
                self.record_success(upstream, latency_ms).await;
            }
            Ok(Ok(response)) => {
                tracing::warn!(upstream = %upstream, status = %response.status(), "health probe failed: non-success status");
                self.record_failure(upstream).await;
            }
            Ok(Err(e)) => {
                tracing::warn!(upstream = %upstream, error = %e, "health probe failed: connection error");
                self.record_failure(upstream).await;
            }
            Err(_) => {
                tracing::warn!(upstream = %upstream, "health probe failed: timeout");
                self.record_failure(upstream).await;
            }
        }
    }

    pub(crate) async fn record_success(&self, upstream: &str, latency_ms: i64) {
        // The pin wins over intermediate probe outcomes for its whole window.
        match self.store.exists(&keys::pin(upstream)).await {
            Ok(true) => {
                tracing::debug!(upstream = %upstream, "probe succeeded but circuit pin is active");
                metrics::record_upstream_health(upstream, false);
                return;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(upstream = %upstream, error = %e, "state store unreachable during probe cycle");
                return;
            }
        }

        let verdict = async {
            self.store.set(&keys::health(upstream), "1").await?;
            self.store.set(&keys::fail(upstream), "0").await?;
            self.store
                .set(&keys::latency(upstream), &latency_ms.to_string())
                .await
        };
        if let Err(e) = verdict.await {
            tracing::warn!(upstream = %upstream, error = %e, "failed to record healthy verdict");
            return;
        }
        metrics::record_upstream_health(upstream, true);
    }

    pub(crate) async fn record_failure(&self, upstream: &str) {
        let failures = match self.store.incr(&keys::fail(upstream)).await {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(upstream = %upstream, error = %e, "state store unreachable during probe cycle");
                return;
            }
        };
        if let Err(e) = self.store.set(&keys::health(upstream), "0").await {
            tracing::warn!(upstream = %upstream, error = %e, "failed to record unhealthy verdict");
        }

        if failures >= self.config.failure_threshold {
            let pin = Duration::from_secs(self.config.pin_secs);
            match self
                .store
                .set_ex(&keys::pin(upstream), "1", pin)
                .await
            {
                Ok(()) => {
                    tracing::warn!(
                        upstream = %upstream,
                        failures,
                        pin_secs = self.config.pin_secs,
                        "failure threshold reached, circuit pinned unhealthy"
                    );
                }
                Err(e) => {
                    tracing::warn!(upstream = %upstream, error = %e, "failed to set circuit pin");
                }
            }
        }

        metrics::record_upstream_health(upstream, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const UP: &str = "http://localhost:7001";

    fn monitor(store: Arc<dyn StateStore>) -> HealthMonitor {
        HealthMonitor::new(
            store,
            vec![UP.to_string()],
            HealthCheckConfig {
                interval_secs: 5,
                timeout_secs: 3,
                path: "/health".to_string(),
                failure_threshold: 3,
                pin_secs: 15,
            },
        )
    }

    async fn get(store: &Arc<dyn StateStore>, key: &str) -> Option<String> {
        store.get(key).await.unwrap()
    }

    #[tokio::test]
    async fn success_sets_verdict_and_resets_failures() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let monitor = monitor(store.clone());

        store.set(&keys::fail(UP), "2").await.unwrap();
        monitor.record_success(UP, 12).await;

        assert_eq!(get(&store, &keys::health(UP)).await.as_deref(), Some("1"));
        assert_eq!(get(&store, &keys::fail(UP)).await.as_deref(), Some("0"));
        assert_eq!(get(&store, &keys::latency(UP)).await.as_deref(), Some("12"));
    }

    #[tokio::test]
    async fn failures_accumulate_monotonically_until_a_success() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let monitor = monitor(store.clone());

        monitor.record_failure(UP).await;
        assert_eq!(get(&store, &keys::fail(UP)).await.as_deref(), Some("1"));
        monitor.record_failure(UP).await;
        assert_eq!(get(&store, &keys::fail(UP)).await.as_deref(), Some("2"));
        assert_eq!(get(&store, &keys::health(UP)).await.as_deref(), Some("0"));

        monitor.record_success(UP, 5).await;
        assert_eq!(get(&store, &keys::fail(UP)).await.as_deref(), Some("0"));
        assert_eq!(get(&store, &keys::health(UP)).await.as_deref(), Some("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn threshold_pins_unhealthy_for_the_full_window() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let monitor = monitor(store.clone());

        for _ in 0..3 {
            monitor.record_failure(UP).await;
        }
        assert!(store.exists(&keys::pin(UP)).await.unwrap());
        assert_eq!(get(&store, &keys::health(UP)).await.as_deref(), Some("0"));

        // An intervening success must not lift the verdict while pinned.
        monitor.record_success(UP, 4).await;
        assert_eq!(get(&store, &keys::health(UP)).await.as_deref(), Some("0"));

        // After the pin expires, normal verdicts resume.
        tokio::time::advance(Duration::from_secs(16)).await;
        monitor.record_success(UP, 4).await;
        assert_eq!(get(&store, &keys::health(UP)).await.as_deref(), Some("1"));
        assert_eq!(get(&store, &keys::fail(UP)).await.as_deref(), Some("0"));
    }
}
