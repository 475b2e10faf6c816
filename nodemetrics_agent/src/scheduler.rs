//! Report cadence: one cycle at startup, then one per report interval,
//! until cancelled.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::bandwidth::BandwidthProbe;
use crate::config::Config;
use crate::delivery::ReportSink;
use crate::provider::MetricsProvider;
use crate::report::collect_report;
use crate::sampler::WindowPlan;

/// Floor for the report period; `interval` rejects a zero period.
const MIN_REPORT_PERIOD: Duration = Duration::from_secs(1);

pub struct Scheduler {
    provider: Arc<dyn MetricsProvider>,
    probe: Arc<dyn BandwidthProbe>,
    sink: Arc<dyn ReportSink>,
    plan: WindowPlan,
    report_every: Duration,
    // measured once at startup, never refreshed
    ceiling_mbps: f64,
}

impl Scheduler {
    pub fn new(
        config: &Config,
        ceiling_mbps: f64,
        provider: Arc<dyn MetricsProvider>,
        probe: Arc<dyn BandwidthProbe>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            provider,
            probe,
            sink,
            plan: WindowPlan::from_config(config),
            report_every: config.report_every().max(MIN_REPORT_PERIOD),
            ceiling_mbps,
        }
    }

    /// Drive cycles until `cancel` fires. No new cycle starts once it has;
    /// a cycle in flight is abandoned at its next wait. Returns how many
    /// cycles produced a report.
    pub async fn run(&self, cancel: &CancellationToken) -> u64 {
        // first tick completes immediately
        let mut ticker = interval(self.report_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cycles = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if cycles == 0 {
                info!(
                    samples = self.plan.samples(),
                    report_every = ?self.report_every,
                    "sending initial metrics"
                );
            }
            let report = collect_report(
                self.provider.as_ref(),
                self.probe.as_ref(),
                self.plan,
                self.ceiling_mbps,
                cancel,
            )
            .await;
            let Some(report) = report else {
                info!("shutdown requested, abandoning cycle");
                break;
            };

            info!(
                cpu = report.cpu_percent,
                memory = report.memory_percent,
                net_in = report.net_in_percent,
                net_out = report.net_out_percent,
                "collected metrics"
            );
            debug!(?report, "full report");
            self.sink.deliver(&report, cancel).await;
            cycles += 1;
        }

        info!(cycles, "scheduler stopped");
        cycles
    }
}
