//! `MetricsProvider` backed by sysinfo and procfs.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, Networks, RefreshKind, System};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::latency::Pinger;
use crate::provider::{
    MetricsProvider, NetCounters, NetworkSnapshot, ProviderError, SystemSnapshot,
};
use crate::sockets::read_connection_counts;
use crate::types::InterfaceStat;

const ROOT_MOUNT: &str = "/";

pub struct HostMetrics {
    // Persistent sysinfo handles; CPU usage needs the previous refresh to diff against
    sys: Mutex<System>,
    nets: Mutex<Networks>,
    disks: Mutex<Disks>,
    pinger: Pinger,
}

impl HostMetrics {
    pub fn new(pinger: Pinger) -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
            .with_memory(MemoryRefreshKind::nothing().with_ram());
        Self {
            sys: Mutex::new(System::new_with_specifics(refresh_kind)),
            nets: Mutex::new(Networks::new_with_refreshed_list()),
            disks: Mutex::new(Disks::new_with_refreshed_list()),
            pinger,
        }
    }

    async fn disk_percent(&self) -> Result<f64, ProviderError> {
        let mut disks = self.disks.lock().await;
        disks.refresh(true);
        let root = disks
            .list()
            .iter()
            .find(|d| d.mount_point() == Path::new(ROOT_MOUNT))
            .ok_or(ProviderError::Unavailable("root filesystem usage"))?;
        let total = root.total_space();
        if total == 0 {
            return Err(ProviderError::Unavailable("root filesystem usage"));
        }
        let used = total.saturating_sub(root.available_space());
        Ok(used as f64 / total as f64 * 100.0)
    }

    async fn interface_stats(&self) -> BTreeMap<String, InterfaceStat> {
        let mut nets = self.nets.lock().await;
        nets.refresh(true);
        nets.iter()
            .map(|(name, data)| {
                (
                    name.to_string(),
                    InterfaceStat {
                        bytes_in: data.total_received(),
                        bytes_out: data.total_transmitted(),
                        packets_in: data.total_packets_received(),
                        packets_out: data.total_packets_transmitted(),
                        errors_in: data.total_errors_on_received(),
                        errors_out: data.total_errors_on_transmitted(),
                    },
                )
            })
            .collect()
    }
}

#[async_trait]
impl MetricsProvider for HostMetrics {
    async fn cpu_percent(&self, over: Duration) -> Result<f64, ProviderError> {
        // Two refreshes `over` apart; don't hold the lock while waiting.
        self.sys.lock().await.refresh_cpu_usage();
        tokio::time::sleep(over).await;
        let mut sys = self.sys.lock().await;
        sys.refresh_cpu_usage();
        if sys.cpus().is_empty() {
            return Err(ProviderError::Unavailable("cpu usage"));
        }
        Ok(f64::from(sys.global_cpu_usage()))
    }

    async fn memory_percent(&self) -> Result<f64, ProviderError> {
        let mut sys = self.sys.lock().await;
        sys.refresh_memory();
        let total = sys.total_memory();
        if total == 0 {
            return Err(ProviderError::Unavailable("memory usage"));
        }
        let used = total.saturating_sub(sys.available_memory());
        Ok(used as f64 / total as f64 * 100.0)
    }

    async fn cumulative_net_io(&self) -> Result<NetCounters, ProviderError> {
        let mut nets = self.nets.lock().await;
        nets.refresh(true);
        if nets.is_empty() {
            return Err(ProviderError::Unavailable("network counters"));
        }
        Ok(nets.values().fold(NetCounters::default(), |acc, data| NetCounters {
            bytes_in: acc.bytes_in.saturating_add(data.total_received()),
            bytes_out: acc.bytes_out.saturating_add(data.total_transmitted()),
        }))
    }

    async fn system_snapshot(&self) -> SystemSnapshot {
        let memory_percent = self.memory_percent().await.unwrap_or_else(|e| {
            warn!(field = "memory_percent", error = %e, "snapshot read failed");
            0.0
        });
        let disk_percent = self.disk_percent().await.unwrap_or_else(|e| {
            warn!(field = "disk_usage_percent", error = %e, "snapshot read failed");
            0.0
        });
        let fd_count = open_fd_count().unwrap_or_else(|e| {
            warn!(field = "file_descriptors", error = %e, "snapshot read failed");
            0
        });
        SystemSnapshot {
            uptime_seconds: System::uptime() as f64,
            load1: System::load_average().one,
            memory_percent,
            disk_percent,
            fd_count,
        }
    }

    async fn network_snapshot(&self, cancel: &CancellationToken) -> NetworkSnapshot {
        let connections = read_connection_counts().unwrap_or_else(|e| {
            warn!(field = "active_connections", error = %e, "snapshot read failed");
            Default::default()
        });
        let interfaces = self.interface_stats().await;
        let latency_ms = self.pinger.latency_ms(cancel).await;
        NetworkSnapshot {
            connections,
            latency_ms,
            interfaces,
        }
    }
}

#[cfg(target_os = "linux")]
fn open_fd_count() -> Result<u64, ProviderError> {
    let entries = std::fs::read_dir("/proc/self/fd").map_err(|source| ProviderError::Io {
        what: "/proc/self/fd",
        source,
    })?;
    Ok(entries.filter(|e| e.is_ok()).count() as u64)
}

#[cfg(not(target_os = "linux"))]
fn open_fd_count() -> Result<u64, ProviderError> {
    Err(ProviderError::Unavailable("file descriptor count"))
}
