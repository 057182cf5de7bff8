// Port scanner
//
// SimulatedProber never touches the network: it rolls weighted dice per port
// after a 500-1500ms delay. Its results are demo data and every response it
// produces carries `summary.simulated = true`. TcpConnectProber performs a
// real TCP connect with a per-port timeout.

use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use rand::Rng;
use std::{net::IpAddr, sync::Arc, time::Duration};
use tokio::{
    net::{lookup_host, TcpStream},
    time::Instant,
};
use tracing::instrument;

use crate::{
    models::{PortScanResponse, PortScanSummary, PortStatus, PortStatusEntry},
    utils::ThreatMonitorError,
};

const RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Well-known ports and their service names
pub const WELL_KNOWN_PORTS: [(u16, &str); 16] = [
    (21, "ftp"),
    (22, "ssh"),
    (23, "telnet"),
    (25, "smtp"),
    (53, "dns"),
    (80, "http"),
    (110, "pop3"),
    (143, "imap"),
    (443, "https"),
    (993, "imaps"),
    (995, "pop3s"),
    (3389, "rdp"),
    (5432, "postgresql"),
    (3306, "mysql"),
    (1433, "mssql"),
    (27017, "mongodb"),
];

pub fn service_name(port: u16) -> &'static str {
    WELL_KNOWN_PORTS
        .iter()
        .find(|(p, _)| *p == port)
        .map_or("unknown", |(_, name)| *name)
}

#[async_trait]
pub trait PortProber: Send + Sync {
    /// True when results are fabricated rather than observed
    fn is_simulated(&self) -> bool;
    async fn probe(&self, addr: IpAddr, port: u16) -> PortStatus;
}

/// Resolve a validated host to the address that gets scanned.
///
/// IP literals are used as-is. Hostnames go through the system resolver and
/// an IPv4 answer is preferred. A host that does not resolve is a validation
/// failure, never a scan full of filtered ports.
pub async fn resolve_host(host: &str) -> Result<IpAddr, ThreatMonitorError> {
    if let Ok(addr) = host.parse::<IpAddr>() {
        return Ok(addr);
    }

    let unresolvable =
        || ThreatMonitorError::Validation("Host could not be resolved".to_string());
    let lookup = tokio::time::timeout(RESOLVE_TIMEOUT, lookup_host((host, 0))).await;
    let addrs: Vec<IpAddr> = match lookup {
        Ok(Ok(addrs)) => addrs.map(|addr| addr.ip()).collect(),
        Ok(Err(e)) => {
            tracing::debug!(host, error = %e, "Host lookup failed");
            return Err(unresolvable());
        },
        Err(_) => {
            tracing::debug!(host, "Host lookup timed out");
            return Err(unresolvable());
        },
    };

    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(unresolvable)
}

pub struct SimulatedProber {
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl SimulatedProber {
    pub fn new() -> Self {
        Self {
            min_delay_ms: 500,
            max_delay_ms: 1500,
        }
    }

    /// Common services lean open, everything else leans closed or filtered
    fn status_for(port: u16, roll: f64) -> PortStatus {
        let (open, closed) = if service_name(port) != "unknown" {
            (0.6, 0.85)
        } else {
            (0.1, 0.7)
        };
        if roll < open {
            PortStatus::Open
        } else if roll < closed {
            PortStatus::Closed
        } else {
            PortStatus::Filtered
        }
    }
}

impl Default for SimulatedProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PortProber for SimulatedProber {
    fn is_simulated(&self) -> bool {
        true
    }

    async fn probe(&self, _addr: IpAddr, port: u16) -> PortStatus {
        let (delay_ms, roll) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(self.min_delay_ms..=self.max_delay_ms),
                rng.gen::<f64>(),
            )
        };
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        Self::status_for(port, roll)
    }
}

pub struct TcpConnectProber {
    timeout: Duration,
}

impl TcpConnectProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl PortProber for TcpConnectProber {
    fn is_simulated(&self) -> bool {
        false
    }

    async fn probe(&self, addr: IpAddr, port: u16) -> PortStatus {
        match tokio::time::timeout(self.timeout, TcpStream::connect((addr, port))).await {
            Ok(Ok(_stream)) => PortStatus::Open,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::ConnectionRefused => PortStatus::Closed,
            Ok(Err(e)) => {
                tracing::debug!(%addr, port, error = %e, "Connect failed");
                PortStatus::Filtered
            },
            Err(_) => PortStatus::Filtered,
        }
    }
}

pub struct PortScanner {
    prober: Arc<dyn PortProber>,
}

impl PortScanner {
    pub fn new(prober: Arc<dyn PortProber>) -> Self {
        Self { prober }
    }

    pub fn is_simulated(&self) -> bool {
        self.prober.is_simulated()
    }

    /// Check all ports of `addr` concurrently. `host` is what the caller
    /// asked for and `addr` its resolved address; `ports` must already be
    /// validated.
    #[instrument(skip(self, ports), fields(port_count = ports.len()))]
    pub async fn scan(&self, host: &str, addr: IpAddr, ports: &[u16]) -> PortScanResponse {
        let started = Instant::now();
        let simulated = self.prober.is_simulated();
        if simulated {
            tracing::debug!(host, "Using simulated port prober; results are not real findings");
        }

        let statuses = join_all(ports.iter().map(|port| self.prober.probe(addr, *port))).await;

        let entries: Vec<PortStatusEntry> = ports
            .iter()
            .zip(statuses)
            .map(|(port, status)| PortStatusEntry {
                port: *port,
                status,
                service: service_name(*port).to_string(),
                version: None,
            })
            .collect();

        let count = |wanted: PortStatus| entries.iter().filter(|e| e.status == wanted).count();
        let summary = PortScanSummary {
            total: entries.len(),
            open: count(PortStatus::Open),
            closed: count(PortStatus::Closed),
            filtered: count(PortStatus::Filtered),
            simulated,
        };

        tracing::info!(host, open = summary.open, simulated, "Port scan complete");

        PortScanResponse {
            host: host.to_string(),
            ports: entries,
            scan_time: started.elapsed().as_millis() as u64,
            summary,
            scanned_at: Utc::now(),
        }
    }
}
