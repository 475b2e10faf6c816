//! Live reads against the machine running the tests.
#![cfg(target_os = "linux")]

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use nodemetrics_agent::host::HostMetrics;
use nodemetrics_agent::latency::Pinger;
use nodemetrics_agent::provider::MetricsProvider;

fn host() -> HostMetrics {
    HostMetrics::new(Pinger {
        program: "nodemetrics-no-such-ping".into(),
        ..Pinger::default()
    })
}

#[tokio::test]
async fn memory_and_cpu_are_percentages() {
    let host = host();
    let mem = host.memory_percent().await.expect("memory");
    assert!(mem > 0.0 && mem <= 100.0, "{mem}");
    let cpu = host
        .cpu_percent(Duration::from_millis(250))
        .await
        .expect("cpu");
    assert!((0.0..=100.0).contains(&cpu), "{cpu}");
}

#[tokio::test]
async fn system_snapshot_sees_own_descriptors() {
    let snap = host().system_snapshot().await;
    // stdin/stdout/stderr at least
    assert!(snap.fd_count >= 3, "{snap:?}");
    assert!(snap.uptime_seconds > 0.0);
}

#[tokio::test]
async fn missing_ping_reports_zero_latency() {
    let snap = host().network_snapshot(&CancellationToken::new()).await;
    assert_eq!(snap.latency_ms, 0.0);
}
