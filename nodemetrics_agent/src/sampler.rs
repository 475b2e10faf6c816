//! Sampling window: a fixed number of ticks of CPU, memory and network
//! readings, folded into averages and bandwidth-normalized percentages.
//!
//! The window starts by reading the cumulative byte counters once. That is
//! the only read that can sink the whole window; every later failure just
//! zeroes that tick's contribution, and the tick still counts toward the
//! average.

use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::Config;
use crate::provider::{MetricsProvider, NetCounters, ProviderError};

/// How long each tick's CPU usage is measured over.
pub const CPU_MEASURE: Duration = Duration::from_secs(1);

const BITS_PER_BYTE: f64 = 8.0;
// binary mega; historical reports were computed with this divisor
const BITS_PER_MEGABIT: f64 = 1_048_576.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlan {
    pub sample_interval: Duration,
    pub duration: Duration,
}

impl WindowPlan {
    pub fn from_config(config: &Config) -> Self {
        Self {
            sample_interval: Duration::from_secs(config.collect_interval),
            duration: Duration::from_secs(config.collect_duration),
        }
    }

    /// `floor(duration / sample_interval)`
    pub fn samples(&self) -> u32 {
        if self.sample_interval.is_zero() {
            return 0;
        }
        let n = self.duration.as_nanos() / self.sample_interval.as_nanos();
        u32::try_from(n).unwrap_or(u32::MAX)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("initial network counters unreadable: {0}")]
    InitialCounters(#[source] ProviderError),
    #[error("sampling cancelled")]
    Cancelled,
}

/// The sampler's whole output for one window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowAverages {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub net_in_percent: f64,
    pub net_out_percent: f64,
}

/// Throughput in Mbps for `delta_bytes` transferred over `interval_secs`.
pub fn mbps(delta_bytes: u64, interval_secs: f64) -> f64 {
    delta_bytes as f64 * BITS_PER_BYTE / BITS_PER_MEGABIT / interval_secs
}

/// Running sums for one window. Lives only as long as `collect_window`.
#[derive(Debug)]
pub struct SampleWindow {
    cpu_sum: f64,
    memory_sum: f64,
    net_in_sum: f64,
    net_out_sum: f64,
    last: NetCounters,
    interval_secs: f64,
}

impl SampleWindow {
    pub fn new(start: NetCounters, sample_interval: Duration) -> Self {
        Self {
            cpu_sum: 0.0,
            memory_sum: 0.0,
            net_in_sum: 0.0,
            net_out_sum: 0.0,
            last: start,
            interval_secs: sample_interval.as_secs_f64(),
        }
    }

    pub fn add_cpu(&mut self, percent: f64) {
        self.cpu_sum += percent;
    }

    pub fn add_memory(&mut self, percent: f64) {
        self.memory_sum += percent;
    }

    /// Rate against the previous counters, then roll them forward. A counter
    /// that went backwards (interface reset) counts as no traffic.
    pub fn add_counters(&mut self, current: NetCounters) {
        let d_in = current.bytes_in.saturating_sub(self.last.bytes_in);
        let d_out = current.bytes_out.saturating_sub(self.last.bytes_out);
        self.net_in_sum += mbps(d_in, self.interval_secs);
        self.net_out_sum += mbps(d_out, self.interval_secs);
        self.last = current;
    }

    pub fn finish(self, samples: u32, ceiling_mbps: f64) -> WindowAverages {
        if samples == 0 {
            return WindowAverages::default();
        }
        let n = f64::from(samples);
        let percent_of_ceiling = |sum: f64| {
            if ceiling_mbps > 0.0 {
                sum / n / ceiling_mbps * 100.0
            } else {
                0.0
            }
        };
        WindowAverages {
            cpu_percent: self.cpu_sum / n,
            memory_percent: self.memory_sum / n,
            net_in_percent: percent_of_ceiling(self.net_in_sum),
            net_out_percent: percent_of_ceiling(self.net_out_sum),
        }
    }
}

/// Run one window against `provider`.
///
/// Each tick measures CPU over [`CPU_MEASURE`], reads memory, waits for the
/// next tick boundary (`start + k * sample_interval`), then re-reads the byte
/// counters. Cancellation interrupts any of those waits and abandons the
/// window.
pub async fn collect_window(
    provider: &dyn MetricsProvider,
    plan: WindowPlan,
    ceiling_mbps: f64,
    cancel: &CancellationToken,
) -> Result<WindowAverages, SampleError> {
    let start = provider
        .cumulative_net_io()
        .await
        .map_err(SampleError::InitialCounters)?;

    let samples = plan.samples();
    if samples == 0 {
        debug!(?plan, "window holds no samples");
        return Ok(WindowAverages::default());
    }

    let mut window = SampleWindow::new(start, plan.sample_interval);
    let mut boundary = interval_at(Instant::now() + plan.sample_interval, plan.sample_interval);
    boundary.set_missed_tick_behavior(MissedTickBehavior::Delay);

    for tick in 0..samples {
        let cpu = tokio::select! {
            _ = cancel.cancelled() => return Err(SampleError::Cancelled),
            res = provider.cpu_percent(CPU_MEASURE) => res,
        };
        match cpu {
            Ok(v) => window.add_cpu(v),
            Err(e) => warn!(tick, error = %e, "cpu sample failed"),
        }

        match provider.memory_percent().await {
            Ok(v) => window.add_memory(v),
            Err(e) => warn!(tick, error = %e, "memory sample failed"),
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(SampleError::Cancelled),
            _ = boundary.tick() => {}
        }

        match provider.cumulative_net_io().await {
            Ok(current) => window.add_counters(current),
            Err(e) => warn!(tick, error = %e, "network sample failed"),
        }
    }

    Ok(window.finish(samples, ceiling_mbps))
}
