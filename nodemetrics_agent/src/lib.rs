//! Host agent that samples CPU, memory and network load over a short
//! window, normalizes throughput against a measured bandwidth ceiling and
//! POSTs one report per interval to a collector.

pub mod bandwidth;
pub mod cli;
pub mod config;
pub mod delivery;
pub mod host;
pub mod latency;
pub mod provider;
pub mod report;
pub mod sampler;
pub mod scheduler;
pub mod shutdown;
pub mod sockets;
pub mod types;
