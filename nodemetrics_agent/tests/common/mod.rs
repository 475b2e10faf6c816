//! Scripted stand-ins for the host, the speed test and the collector.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use nodemetrics_agent::bandwidth::{BandwidthProbe, ProbeError};
use nodemetrics_agent::config::Config;
use nodemetrics_agent::delivery::ReportSink;
use nodemetrics_agent::provider::{
    ConnectionCounts, MetricsProvider, NetCounters, NetworkSnapshot, ProviderError, SystemSnapshot,
};
use nodemetrics_agent::types::{InterfaceStat, Report};

pub fn config(report_interval: u64, collect_interval: u64, collect_duration: u64) -> Config {
    Config {
        url: "http://x/report".into(),
        token: None,
        report_interval,
        collect_interval,
        collect_duration,
    }
}

pub fn counters(bytes_in: u64, bytes_out: u64) -> NetCounters {
    NetCounters {
        bytes_in,
        bytes_out,
    }
}

/// Host whose cumulative counter reads come from a script. `None` entries
/// are failed reads; once the script runs out the last good value repeats.
/// CPU reads can be scripted the same way; unscripted reads return `cpu`.
pub struct ScriptedHost {
    cpu: f64,
    memory: f64,
    cpu_script: Mutex<VecDeque<Option<f64>>>,
    memory_fails: bool,
    script: Mutex<VecDeque<Option<NetCounters>>>,
    last: Mutex<NetCounters>,
    pub net_reads: AtomicUsize,
    pub cpu_reads: AtomicUsize,
}

impl ScriptedHost {
    pub fn new(cpu: f64, memory: f64, script: Vec<Option<NetCounters>>) -> Self {
        Self {
            cpu,
            memory,
            cpu_script: Mutex::new(VecDeque::new()),
            memory_fails: false,
            script: Mutex::new(script.into()),
            last: Mutex::new(NetCounters::default()),
            net_reads: AtomicUsize::new(0),
            cpu_reads: AtomicUsize::new(0),
        }
    }

    pub fn steady() -> Self {
        Self::new(10.0, 20.0, Vec::new())
    }

    pub fn with_cpu_script(mut self, script: Vec<Option<f64>>) -> Self {
        self.cpu_script = Mutex::new(script.into());
        self
    }

    pub fn with_failing_memory(mut self) -> Self {
        self.memory_fails = true;
        self
    }
}

pub fn sample_network() -> NetworkSnapshot {
    let mut interfaces = BTreeMap::new();
    interfaces.insert(
        "eth0".to_string(),
        InterfaceStat {
            bytes_in: 1_000,
            bytes_out: 2_000,
            packets_in: 10,
            packets_out: 20,
            errors_in: 0,
            errors_out: 1,
        },
    );
    NetworkSnapshot {
        connections: ConnectionCounts {
            active: 7,
            tcp: 4,
            udp: 2,
        },
        latency_ms: 12.5,
        interfaces,
    }
}

pub fn sample_system() -> SystemSnapshot {
    SystemSnapshot {
        uptime_seconds: 3600.0,
        load1: 0.75,
        memory_percent: 41.0,
        disk_percent: 63.5,
        fd_count: 12,
    }
}

#[async_trait]
impl MetricsProvider for ScriptedHost {
    async fn cpu_percent(&self, over: Duration) -> Result<f64, ProviderError> {
        self.cpu_reads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(over).await;
        match self.cpu_script.lock().unwrap().pop_front() {
            Some(Some(v)) => Ok(v),
            Some(None) => Err(ProviderError::Unavailable("cpu usage")),
            None => Ok(self.cpu),
        }
    }

    async fn memory_percent(&self) -> Result<f64, ProviderError> {
        if self.memory_fails {
            return Err(ProviderError::Unavailable("memory usage"));
        }
        Ok(self.memory)
    }

    async fn cumulative_net_io(&self) -> Result<NetCounters, ProviderError> {
        self.net_reads.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Some(c)) => {
                *self.last.lock().unwrap() = c;
                Ok(c)
            }
            Some(None) => Err(ProviderError::Unavailable("network counters")),
            None => Ok(*self.last.lock().unwrap()),
        }
    }

    async fn system_snapshot(&self) -> SystemSnapshot {
        sample_system()
    }

    async fn network_snapshot(&self, _cancel: &CancellationToken) -> NetworkSnapshot {
        sample_network()
    }
}

pub enum ProbeScript {
    Mbps(f64),
    NotInstalled,
    Timeout,
}

pub struct ScriptedProbe {
    script: ProbeScript,
    pub calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new(script: ProbeScript) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl BandwidthProbe for ScriptedProbe {
    async fn measure_mbps(&self, _cancel: &CancellationToken) -> Result<f64, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script {
            ProbeScript::Mbps(v) => Ok(v),
            ProbeScript::NotInstalled => Err(ProbeError::NotInstalled {
                program: "speedtest-cli".into(),
            }),
            ProbeScript::Timeout => Err(ProbeError::Timeout(Duration::from_secs(30))),
        }
    }
}

#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<(tokio::time::Instant, Report)>>,
}

impl RecordingSink {
    pub fn reports(&self) -> Vec<Report> {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn times(&self) -> Vec<tokio::time::Instant> {
        self.reports.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }
}

#[async_trait]
impl ReportSink for RecordingSink {
    async fn deliver(&self, report: &Report, _cancel: &CancellationToken) {
        self.reports
            .lock()
            .unwrap()
            .push((tokio::time::Instant::now(), report.clone()));
    }
}
