//! Socket counting from the kernel's socket tables.
//!
//! Every row of every table is one open connection. Inet tables are
//! classified by the table they come from; unix sockets carry their type in
//! a column (`0001` stream, `0002` datagram).

use crate::provider::{ConnectionCounts, ProviderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketTable {
    Tcp,
    Udp,
    Unix,
}

#[cfg(target_os = "linux")]
const TABLES: &[(&str, SocketTable)] = &[
    ("/proc/net/tcp", SocketTable::Tcp),
    ("/proc/net/tcp6", SocketTable::Tcp),
    ("/proc/net/udp", SocketTable::Udp),
    ("/proc/net/udp6", SocketTable::Udp),
    ("/proc/net/unix", SocketTable::Unix),
];

// unix socket type column values (SOCK_STREAM / SOCK_DGRAM)
const UNIX_STREAM: u32 = 1;
const UNIX_DGRAM: u32 = 2;

impl ConnectionCounts {
    pub fn merge(&mut self, other: ConnectionCounts) {
        self.active += other.active;
        self.tcp += other.tcp;
        self.udp += other.udp;
    }
}

/// Count the rows of one table. The first line is always a column header.
pub fn classify_table(table: SocketTable, contents: &str) -> ConnectionCounts {
    let mut counts = ConnectionCounts::default();
    for line in contents.lines().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        counts.active += 1;
        match table {
            SocketTable::Tcp => counts.tcp += 1,
            SocketTable::Udp => counts.udp += 1,
            SocketTable::Unix => {
                // Num RefCount Protocol Flags Type St Inode [Path]
                let kind = line
                    .split_whitespace()
                    .nth(4)
                    .and_then(|t| u32::from_str_radix(t, 16).ok());
                match kind {
                    Some(UNIX_STREAM) => counts.tcp += 1,
                    Some(UNIX_DGRAM) => counts.udp += 1,
                    _ => {}
                }
            }
        }
    }
    counts
}

/// Read and classify every socket table the kernel exposes. Tables that are
/// missing (e.g. no IPv6) are skipped; it is only an error if none can be read.
#[cfg(target_os = "linux")]
pub fn read_connection_counts() -> Result<ConnectionCounts, ProviderError> {
    let mut total = ConnectionCounts::default();
    let mut last_err = None;
    let mut read_any = false;
    for (path, table) in TABLES {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                read_any = true;
                total.merge(classify_table(*table, &contents));
            }
            Err(e) => {
                tracing::debug!(path, error = %e, "socket table unreadable");
                last_err = Some(e);
            }
        }
    }
    match (read_any, last_err) {
        (false, Some(source)) => Err(ProviderError::Io {
            what: "socket tables",
            source,
        }),
        _ => Ok(total),
    }
}

#[cfg(not(target_os = "linux"))]
pub fn read_connection_counts() -> Result<ConnectionCounts, ProviderError> {
    Err(ProviderError::Unavailable("socket tables"))
}
