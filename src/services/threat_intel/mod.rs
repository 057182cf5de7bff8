// Scan orchestration
// Each scanner fans out to its providers, settles every branch and folds the
// results through the risk heuristics.

pub mod domain_intel;
pub mod ip_reputation;
pub mod port_scan;
pub mod risk;
pub mod settle;
pub mod url_scan;

use serde::Serialize;
use std::{sync::Arc, time::Duration};

pub use domain_intel::DomainIntelScanner;
pub use ip_reputation::IpReputationScanner;
pub use port_scan::{resolve_host, PortProber, PortScanner, SimulatedProber, TcpConnectProber};
pub use settle::{settle, ProviderResult};
pub use url_scan::UrlScanner;

use crate::{
    app_config::{PortScanMode, ThreatIntelConfig},
    services::providers::{
        build_http_client, AbuseIpDbClient, DohClient, IpApiClient, PhishTankClient,
        ProviderConfigError, RdapClient, SecurityTrailsClient, SslLabsClient,
    },
    utils::ThreatMonitorError,
};

/// All scanners, built once at startup.
///
/// Scanners whose required credential is missing are kept as the
/// construction error so only their endpoint answers 503.
pub struct ThreatIntelServices {
    domain_intel: Result<DomainIntelScanner, ProviderConfigError>,
    ip_reputation: Result<IpReputationScanner, ProviderConfigError>,
    url_scan: UrlScanner,
    port_scan: PortScanner,
}

/// Which scanners are usable, reported by the health endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerAvailability {
    pub domain_intel: bool,
    pub ip_reputation: bool,
    pub url_scan: bool,
    pub port_scan: bool,
    pub port_scan_simulated: bool,
}

impl ThreatIntelServices {
    pub fn new(
        domain_intel: Result<DomainIntelScanner, ProviderConfigError>,
        ip_reputation: Result<IpReputationScanner, ProviderConfigError>,
        url_scan: UrlScanner,
        port_scan: PortScanner,
    ) -> Self {
        Self {
            domain_intel,
            ip_reputation,
            url_scan,
            port_scan,
        }
    }

    /// Wire the real provider clients from configuration. Fails only when the
    /// shared HTTP client cannot be built.
    pub fn from_config(config: &ThreatIntelConfig) -> Result<Self, ProviderConfigError> {
        let http = build_http_client(config)?;
        let timeout = Duration::from_secs(config.provider_timeout_secs);

        let domain_intel = SecurityTrailsClient::new(http.clone(), config).map(|history| {
            DomainIntelScanner::new(
                Arc::new(history),
                Arc::new(RdapClient::new(http.clone(), config)),
                Arc::new(DohClient::new(http.clone(), config)),
                timeout,
            )
        });

        let ip_reputation = AbuseIpDbClient::new(http.clone(), config).map(|abuse| {
            IpReputationScanner::new(
                Arc::new(abuse),
                Arc::new(IpApiClient::new(http.clone(), config)),
                timeout,
            )
        });

        let url_scan = UrlScanner::new(
            Arc::new(PhishTankClient::new(http.clone(), config)),
            Arc::new(SslLabsClient::new(http, config)),
            config.screenshot_service_url.clone(),
            timeout,
        );

        let prober: Arc<dyn PortProber> = match config.port_scan_mode {
            PortScanMode::Simulated => Arc::new(SimulatedProber::new()),
            PortScanMode::TcpConnect => Arc::new(TcpConnectProber::new(Duration::from_millis(
                config.port_probe_timeout_ms,
            ))),
        };

        for error in [domain_intel.as_ref().err(), ip_reputation.as_ref().err()]
            .into_iter()
            .flatten()
        {
            tracing::warn!("{}; endpoint will answer 503", error);
        }
        if config.port_scan_mode == PortScanMode::Simulated {
            tracing::warn!("Port scan runs in simulated mode; results are demo data");
        }

        Ok(Self::new(
            domain_intel,
            ip_reputation,
            url_scan,
            PortScanner::new(prober),
        ))
    }

    pub fn domain_intel(&self) -> Result<&DomainIntelScanner, ThreatMonitorError> {
        self.domain_intel
            .as_ref()
            .map_err(|e| ThreatMonitorError::Configuration(e.clone()))
    }

    pub fn ip_reputation(&self) -> Result<&IpReputationScanner, ThreatMonitorError> {
        self.ip_reputation
            .as_ref()
            .map_err(|e| ThreatMonitorError::Configuration(e.clone()))
    }

    pub fn url_scan(&self) -> &UrlScanner {
        &self.url_scan
    }

    pub fn port_scan(&self) -> &PortScanner {
        &self.port_scan
    }

    pub fn availability(&self) -> ScannerAvailability {
        ScannerAvailability {
            domain_intel: self.domain_intel.is_ok(),
            ip_reputation: self.ip_reputation.is_ok(),
            url_scan: true,
            port_scan: true,
            port_scan_simulated: self.port_scan.is_simulated(),
        }
    }
}
