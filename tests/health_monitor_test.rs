//! Probe-cycle tests: the monitor drives real probes against mock upstreams
//! and writes verdicts into the store the selector reads.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use api_gateway::config::HealthCheckConfig;
use api_gateway::health::HealthMonitor;
use api_gateway::store::{keys, MemoryStore, StateStore};

mod common;

fn probe_config() -> HealthCheckConfig {
    HealthCheckConfig {
        interval_secs: 1,
        timeout_secs: 2,
        path: "/health".to_string(),
        failure_threshold: 3,
        pin_secs: 15,
    }
}

#[tokio::test]
async fn live_upstream_gets_a_healthy_verdict_with_latency() {
    let upstream = common::start_mock_upstream("ok").await;
    let upstream_url = format!("http://{}", upstream);

    let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
    let monitor = HealthMonitor::new(store.clone(), vec![upstream_url.clone()], probe_config());

    monitor.check_all().await;

    assert_eq!(
        store.get(&keys::health(&upstream_url)).await.unwrap().as_deref(),
        Some("1")
    );
    assert_eq!(
        store.get(&keys::fail(&upstream_url)).await.unwrap().as_deref(),
        Some("0")
    );
    let latency: i64 = store
        .get(&keys::latency(&upstream_url))
        .await
        .unwrap()
        .unwrap()
        .parse()
        .unwrap();
    assert!(latency >= 0);
}

#[tokio::test]
async fn dead_upstream_accumulates_failures_and_pins() {
    let reserved = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = reserved.local_addr().unwrap();
    drop(reserved);
    let dead_url = format!("http://{}", dead_addr);

    let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
    let monitor = HealthMonitor::new(store.clone(), vec![dead_url.clone()], probe_config());

    for expected in 1..=3i64 {
        monitor.check_all().await;
        let failures: i64 = store
            .get(&keys::fail(&dead_url))
            .await
            .unwrap()
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(failures, expected);
    }

    assert_eq!(
        store.get(&keys::health(&dead_url)).await.unwrap().as_deref(),
        Some("0")
    );
    assert!(
        store.exists(&keys::pin(&dead_url)).await.unwrap(),
        "threshold must pin the circuit"
    );
}

#[tokio::test]
async fn non_success_health_endpoint_counts_as_a_failure() {
    let flaky = Arc::new(AtomicBool::new(false));
    let serving = flaky.clone();
    let upstream = common::start_programmable_upstream(move |_| {
        let serving = serving.clone();
        async move {
            if serving.load(Ordering::SeqCst) {
                (200, "recovered".into())
            } else {
                (503, "not yet".into())
            }
        }
    })
    .await;
    let upstream_url = format!("http://{}", upstream);

    let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
    let monitor = HealthMonitor::new(store.clone(), vec![upstream_url.clone()], probe_config());

    monitor.check_all().await;
    assert_eq!(
        store.get(&keys::health(&upstream_url)).await.unwrap().as_deref(),
        Some("0")
    );
    assert_eq!(
        store.get(&keys::fail(&upstream_url)).await.unwrap().as_deref(),
        Some("1")
    );

    // First success resets the failure counter.
    flaky.store(true, Ordering::SeqCst);
    monitor.check_all().await;
    assert_eq!(
        store.get(&keys::health(&upstream_url)).await.unwrap().as_deref(),
        Some("1")
    );
    assert_eq!(
        store.get(&keys::fail(&upstream_url)).await.unwrap().as_deref(),
        Some("0")
    );
}

#[tokio::test]
async fn monitor_loop_stops_on_shutdown_signal() {
    let upstream = common::start_mock_upstream("ok").await;
    let upstream_url = format!("http://{}", upstream);

    let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
    let monitor = HealthMonitor::new(store.clone(), vec![upstream_url], probe_config());

    let (tx, rx) = tokio::sync::broadcast::channel(1);
    let handle = tokio::spawn(async move { monitor.run(rx).await });

    tokio::time::sleep(Duration::from_millis(200)).await;
    tx.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("monitor must exit after the shutdown signal")
        .unwrap();
}
