//! Round-trip latency via a single external `ping`.

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub const DEFAULT_TARGET: &str = "8.8.8.8";
pub const PING_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Pinger {
    pub program: String,
    pub target: String,
    pub timeout: Duration,
}

impl Default for Pinger {
    fn default() -> Self {
        Self {
            program: "ping".into(),
            target: DEFAULT_TARGET.into(),
            timeout: PING_TIMEOUT,
        }
    }
}

impl Pinger {
    /// One echo request. Any failure (spawn, timeout, non-zero exit, no
    /// `time=` in the output) is logged and reported as 0.
    pub async fn latency_ms(&self, cancel: &CancellationToken) -> f64 {
        let child = Command::new(&self.program)
            .args(["-c", "1"])
            .arg(&self.target)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::select! {
            _ = cancel.cancelled() => return 0.0,
            res = tokio::time::timeout(self.timeout, child) => res,
        };
        let output = match output {
            Ok(Ok(out)) => out,
            Ok(Err(e)) => {
                warn!(program = %self.program, error = %e, "latency probe failed to start");
                return 0.0;
            }
            Err(_) => {
                warn!(host = %self.target, timeout = ?self.timeout, "latency probe timed out");
                return 0.0;
            }
        };
        if !output.status.success() {
            warn!(host = %self.target, status = %output.status, "latency probe exited with failure");
            return 0.0;
        }
        let text = String::from_utf8_lossy(&output.stdout);
        match parse_rtt_ms(&text) {
            Some(ms) => ms,
            None => {
                warn!(host = %self.target, "no round-trip time in ping output");
                0.0
            }
        }
    }
}

/// Pull the value out of the first `time=<ms>` token.
pub fn parse_rtt_ms(output: &str) -> Option<f64> {
    let (_, rest) = output.split_once("time=")?;
    rest.split_whitespace().next()?.parse().ok()
}
