//! Point-in-time OS readings the sampler and assembler are built on.
//!
//! [`MetricsProvider`] is the seam between the engine and the host: the
//! binary wires in [`crate::host::HostMetrics`], tests wire in scripted fakes.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::types::InterfaceStat;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{0} is unavailable on this host")]
    Unavailable(&'static str),
    #[error("failed to read {what}: {source}")]
    Io {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Aggregate byte counters across all interfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetCounters {
    pub bytes_in: u64,
    pub bytes_out: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SystemSnapshot {
    pub uptime_seconds: f64,
    pub load1: f64,
    /// Point-in-time memory use. Reports carry the window average instead;
    /// this reading is only what the host saw when the snapshot was taken.
    pub memory_percent: f64,
    pub disk_percent: f64,
    pub fd_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionCounts {
    pub active: u64,
    pub tcp: u64,
    pub udp: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkSnapshot {
    pub connections: ConnectionCounts,
    pub latency_ms: f64,
    pub interfaces: BTreeMap<String, InterfaceStat>,
}

#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Global CPU usage measured across `over`.
    async fn cpu_percent(&self, over: Duration) -> Result<f64, ProviderError>;

    async fn memory_percent(&self) -> Result<f64, ProviderError>;

    /// Cumulative bytes in/out summed over every interface.
    async fn cumulative_net_io(&self) -> Result<NetCounters, ProviderError>;

    /// Best-effort: a failing sub-read leaves its field at zero.
    async fn system_snapshot(&self) -> SystemSnapshot;

    /// Best-effort like [`MetricsProvider::system_snapshot`]. The latency
    /// probe is the only slow part and gives up when `cancel` fires.
    async fn network_snapshot(&self, cancel: &CancellationToken) -> NetworkSnapshot;
}
