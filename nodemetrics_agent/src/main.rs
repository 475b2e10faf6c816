//! Entry point for nodemetrics_agent. Parses args, loads config, wires the
//! host provider, speed test and HTTP sink into the scheduler.

use anyhow::Context;
use std::{env, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nodemetrics_agent::bandwidth::{startup_ceiling, BandwidthProbe, SpeedtestCli};
use nodemetrics_agent::cli::{parse_args, usage, CliAction};
use nodemetrics_agent::config::Config;
use nodemetrics_agent::delivery::HttpSink;
use nodemetrics_agent::host::HostMetrics;
use nodemetrics_agent::latency::Pinger;
use nodemetrics_agent::scheduler::Scheduler;
use nodemetrics_agent::shutdown::spawn_signal_listener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = match parse_args(env::args()) {
        Ok(CliAction::Run { config_path }) => config_path,
        Ok(CliAction::Version) => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Ok(CliAction::Help) => {
            println!("{}", usage("nodemetrics_agent"));
            return Ok(());
        }
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        endpoint = %config.url,
        "nodemetrics_agent starting"
    );

    let cancel = CancellationToken::new();
    let signals = spawn_signal_listener(cancel.clone());

    let probe: Arc<dyn BandwidthProbe> = Arc::new(SpeedtestCli::default());
    let ceiling_mbps = startup_ceiling(probe.as_ref(), &cancel).await;

    let sink = HttpSink::new(&config).context("building HTTP client")?;
    let scheduler = Scheduler::new(
        &config,
        ceiling_mbps,
        Arc::new(HostMetrics::new(Pinger::default())),
        probe,
        Arc::new(sink),
    );
    scheduler.run(&cancel).await;

    signals.abort();
    info!("shutting down");
    Ok(())
}
