// Daily quota configuration
// Every scan endpoint allows one call per user per server-local calendar day

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::app_config::AppConfig;

/// Rate limited endpoints. The string form is the key stored in the usage log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanEndpoint {
    DomainIntel,
    IpReputation,
    UrlScan,
    PortScan,
}

impl ScanEndpoint {
    pub const ALL: [ScanEndpoint; 4] = [
        ScanEndpoint::DomainIntel,
        ScanEndpoint::IpReputation,
        ScanEndpoint::UrlScan,
        ScanEndpoint::PortScan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanEndpoint::DomainIntel => "domain-intel",
            ScanEndpoint::IpReputation => "ip-reputation",
            ScanEndpoint::UrlScan => "url-scan",
            ScanEndpoint::PortScan => "port-scan",
        }
    }

    /// Human readable label used in 429 messages
    pub fn label(&self) -> &'static str {
        match self {
            ScanEndpoint::DomainIntel => "domain intelligence",
            ScanEndpoint::IpReputation => "IP reputation",
            ScanEndpoint::UrlScan => "URL safety",
            ScanEndpoint::PortScan => "port scan",
        }
    }
}

impl fmt::Display for ScanEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rate limiting settings derived from the application config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// When false every check is Allowed and nothing is written
    pub enabled: bool,
}

impl RateLimitingConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            enabled: config.features.enable_rate_limiting,
        }
    }
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keys_are_unique() {
        let mut keys: Vec<&str> = ScanEndpoint::ALL.iter().map(|e| e.as_str()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), ScanEndpoint::ALL.len());
        assert_eq!(ScanEndpoint::UrlScan.to_string(), "url-scan");
    }
}
