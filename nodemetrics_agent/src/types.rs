//! Data types POSTed to the collector.
//! Keep this module minimal and stable; it defines the wire format.

use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceStat {
    // cumulative counters since the interface came up
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub packets_in: u64,
    pub packets_out: u64,
    pub errors_in: u64,
    pub errors_out: u64,
}

/// One cycle's report. Built once by the assembler, consumed once by the sink.
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct Report {
    // windowed averages
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub net_in_percent: f64,
    pub net_out_percent: f64,
    pub speedtest_mbps: f64,

    // system snapshot
    pub uptime_seconds: f64,
    pub load_average: f64,
    pub disk_usage_percent: f64,
    pub file_descriptors: u64,

    // network snapshot
    pub active_connections: u64,
    pub tcp_connections: u64,
    pub udp_connections: u64,
    pub network_latency: f64,
    pub interface_stats: BTreeMap<String, InterfaceStat>,
}

impl Report {
    /// The report sent when a cycle could not even read its starting counters.
    pub fn zeroed() -> Self {
        Self::default()
    }
}
