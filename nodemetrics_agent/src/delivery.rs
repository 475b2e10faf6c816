//! Report delivery: one JSON POST per cycle, no retries, no queue.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::Config;
use crate::types::Report;

pub const POST_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_LOGGED_BODY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("error marshaling JSON: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("error sending metrics: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("delivery cancelled")]
    Cancelled,
}

#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Hand off a finished report. Failures are logged and the report dropped.
    async fn deliver(&self, report: &Report, cancel: &CancellationToken);
}

pub struct HttpSink {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpSink {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(POST_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: config.url.trim().to_string(),
            token: config.auth_token().map(str::to_owned),
        })
    }

    /// POST the report; any 2xx is success.
    pub async fn post(&self, report: &Report) -> Result<StatusCode, DeliveryError> {
        let body = serde_json::to_vec(report)?;
        let mut req = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(token) = &self.token {
            req = req.header(AUTHORIZATION, token);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(status);
        }
        let body = match resp.text().await {
            Ok(text) => truncate(&text, MAX_LOGGED_BODY),
            Err(e) => format!("[failed to read response body: {e}]"),
        };
        Err(DeliveryError::Status { status, body })
    }
}

#[async_trait]
impl ReportSink for HttpSink {
    async fn deliver(&self, report: &Report, cancel: &CancellationToken) {
        let res = tokio::select! {
            _ = cancel.cancelled() => Err(DeliveryError::Cancelled),
            res = self.post(report) => res,
        };
        match res {
            Ok(status) => debug!(%status, url = %self.url, "metrics delivered"),
            Err(e) => warn!(url = %self.url, error = %e, "metrics not delivered"),
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
