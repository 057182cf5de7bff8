// Utility modules for the threat monitor

pub mod client_ip;
pub mod target_validator;
pub mod threat_errors;

pub use client_ip::{build_my_ip_response, detect_client_ip};
pub use target_validator::{
    normalize_domain, validate_host, validate_ipv4, validate_ports, validate_url, ScanUrl,
    MAX_PORTS_PER_SCAN,
};
pub use threat_errors::{ThreatErrorDetail, ThreatErrorResponse, ThreatMonitorError};
