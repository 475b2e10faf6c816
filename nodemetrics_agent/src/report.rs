//! One cycle's report: the sampled window plus one-shot snapshots.

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::bandwidth::{current_mbps, BandwidthProbe};
use crate::provider::{MetricsProvider, NetworkSnapshot, SystemSnapshot};
use crate::sampler::{collect_window, SampleError, WindowAverages, WindowPlan};
use crate::types::Report;

pub fn assemble(
    window: WindowAverages,
    system: SystemSnapshot,
    network: NetworkSnapshot,
    speedtest_mbps: f64,
) -> Report {
    Report {
        cpu_percent: window.cpu_percent,
        memory_percent: window.memory_percent,
        net_in_percent: window.net_in_percent,
        net_out_percent: window.net_out_percent,
        speedtest_mbps,
        uptime_seconds: system.uptime_seconds,
        load_average: system.load1,
        disk_usage_percent: system.disk_percent,
        file_descriptors: system.fd_count,
        active_connections: network.connections.active,
        tcp_connections: network.connections.tcp,
        udp_connections: network.connections.udp,
        network_latency: network.latency_ms,
        interface_stats: network.interfaces,
    }
}

/// Sample a window and fold in the snapshots.
///
/// Returns `None` only when `cancel` fired mid-cycle; the partial cycle is
/// dropped. If the window could not read its starting counters the cycle
/// still produces a report, the all-zero one.
pub async fn collect_report(
    provider: &dyn MetricsProvider,
    probe: &dyn BandwidthProbe,
    plan: WindowPlan,
    ceiling_mbps: f64,
    cancel: &CancellationToken,
) -> Option<Report> {
    let window = match collect_window(provider, plan, ceiling_mbps, cancel).await {
        Ok(window) => window,
        Err(SampleError::Cancelled) => return None,
        Err(e @ SampleError::InitialCounters(_)) => {
            warn!(error = %e, "error getting network statistics, reporting zeros");
            return Some(Report::zeroed());
        }
    };

    let system = provider.system_snapshot().await;
    let network = provider.network_snapshot(cancel).await;
    let speedtest_mbps = current_mbps(probe, cancel).await;
    if cancel.is_cancelled() {
        return None;
    }
    Some(assemble(window, system, network, speedtest_mbps))
}
