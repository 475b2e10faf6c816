//! Achievable-throughput estimate from an external speed test.
//!
//! The same probe serves two roles: once at startup it yields the ceiling
//! used to turn Mbps into percentages, and on every cycle it yields the
//! `speedtest_mbps` reading itself.

use async_trait::async_trait;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const DEFAULT_CEILING_MBPS: f64 = 1000.0;
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

const DOWNLOAD_LABEL: &str = "Download:";

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("{program} is not installed")]
    NotInstalled { program: String },
    #[error("{program} exited with {status}")]
    Failed { program: String, status: ExitStatus },
    #[error("speed test did not finish within {0:?}")]
    Timeout(Duration),
    #[error("no download speed in speed test output")]
    Unparseable,
    #[error("failed to run speed test: {0}")]
    Io(#[from] io::Error),
    #[error("speed test cancelled")]
    Cancelled,
}

#[async_trait]
pub trait BandwidthProbe: Send + Sync {
    /// Measured download throughput in Mbps.
    async fn measure_mbps(&self, cancel: &CancellationToken) -> Result<f64, ProbeError>;
}

/// `speedtest-cli --simple`
#[derive(Debug, Clone)]
pub struct SpeedtestCli {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl Default for SpeedtestCli {
    fn default() -> Self {
        Self {
            program: "speedtest-cli".into(),
            args: vec!["--simple".into()],
            timeout: PROBE_TIMEOUT,
        }
    }
}

#[async_trait]
impl BandwidthProbe for SpeedtestCli {
    async fn measure_mbps(&self, cancel: &CancellationToken) -> Result<f64, ProbeError> {
        let run = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::select! {
            _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
            res = tokio::time::timeout(self.timeout, run) => res,
        };
        let output = match output {
            Err(_) => return Err(ProbeError::Timeout(self.timeout)),
            Ok(Err(e)) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ProbeError::NotInstalled {
                    program: self.program.clone(),
                })
            }
            Ok(res) => res?,
        };
        if !output.status.success() {
            return Err(ProbeError::Failed {
                program: self.program.clone(),
                status: output.status,
            });
        }

        // the label may land on either stream depending on the probe version
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        parse_download_mbps(&combined)
    }
}

/// Find the line holding `Download:` and read its second field as Mbps.
pub fn parse_download_mbps(output: &str) -> Result<f64, ProbeError> {
    let line = output
        .lines()
        .find(|l| l.contains(DOWNLOAD_LABEL))
        .ok_or(ProbeError::Unparseable)?;
    line.split_whitespace()
        .nth(1)
        .and_then(|v| v.parse::<f64>().ok())
        .ok_or(ProbeError::Unparseable)
}

/// Ceiling for the process lifetime. Never fails: any probe error, or a
/// reading that can't be used as a divisor, falls back to
/// [`DEFAULT_CEILING_MBPS`].
pub async fn startup_ceiling(probe: &dyn BandwidthProbe, cancel: &CancellationToken) -> f64 {
    let ceiling = match probe.measure_mbps(cancel).await {
        Ok(mbps) if mbps.is_finite() && mbps > 0.0 => mbps,
        Ok(mbps) => {
            warn!(
                measured_mbps = mbps,
                fallback_mbps = DEFAULT_CEILING_MBPS,
                "unusable bandwidth measurement, using default"
            );
            DEFAULT_CEILING_MBPS
        }
        Err(e) => {
            warn!(
                error = %e,
                fallback_mbps = DEFAULT_CEILING_MBPS,
                "could not determine bandwidth, using default"
            );
            DEFAULT_CEILING_MBPS
        }
    };
    info!(ceiling_mbps = ceiling, "maximum bandwidth");
    ceiling
}

/// The per-cycle reading; 0 when the probe fails.
pub async fn current_mbps(probe: &dyn BandwidthProbe, cancel: &CancellationToken) -> f64 {
    match probe.measure_mbps(cancel).await {
        Ok(mbps) => mbps,
        Err(ProbeError::Cancelled) => 0.0,
        Err(e) => {
            warn!(field = "speedtest_mbps", error = %e, "speed test failed");
            0.0
        }
    }
}
