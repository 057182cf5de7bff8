// Input normalization and validation for scan targets

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::utils::threat_errors::ThreatMonitorError;

pub const MAX_PORTS_PER_SCAN: usize = 50;

/// Targets accepted by the development-only localhost convenience rule
const LOCALHOST_ALIASES: [&str; 3] = ["::1", "localhost", "127.0.0.1"];

static DOMAIN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$")
        .expect("domain regex is valid")
});

static IPV4_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)(?:\.(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)){3}$",
    )
    .expect("ipv4 regex is valid")
});

static HOSTNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)*$")
        .expect("hostname regex is valid")
});

/// Strip scheme, `www.`, port and path so equivalent inputs map to one target.
///
/// `https://www.Example.com/path?q=1` and `example.com` both become `example.com`.
pub fn normalize_domain(input: &str) -> Result<String, ThreatMonitorError> {
    let mut domain = input.trim().to_ascii_lowercase();

    for scheme in ["https://", "http://"] {
        if let Some(rest) = domain.strip_prefix(scheme) {
            domain = rest.to_string();
            break;
        }
    }
    if let Some(rest) = domain.strip_prefix("www.") {
        domain = rest.to_string();
    }
    if let Some(end) = domain.find(['/', '?', '#', ':']) {
        domain.truncate(end);
    }
    let domain = domain.trim_end_matches('.').to_string();

    if domain.is_empty() || domain.len() > 253 || !DOMAIN_REGEX.is_match(&domain) {
        return Err(ThreatMonitorError::Validation(
            "Invalid domain format".to_string(),
        ));
    }
    Ok(domain)
}

/// Validate an IPv4 dotted-quad.
///
/// `localhost_substitute` is only passed in development; it replaces
/// loopback aliases (including `::1`) with a public address so the
/// upstream providers have something to look up.
pub fn validate_ipv4(
    input: &str,
    localhost_substitute: Option<&str>,
) -> Result<String, ThreatMonitorError> {
    let mut ip = input.trim();

    if let Some(substitute) = localhost_substitute {
        if LOCALHOST_ALIASES.contains(&ip.to_ascii_lowercase().as_str()) {
            tracing::debug!(original = ip, substitute, "Remapping localhost for development");
            ip = substitute;
        }
    }

    if !IPV4_REGEX.is_match(ip) {
        return Err(ThreatMonitorError::Validation(
            "Invalid IP address format. Only IPv4 addresses are supported".to_string(),
        ));
    }
    Ok(ip.to_string())
}

/// A URL that parsed and uses http or https
#[derive(Debug, Clone)]
pub struct ScanUrl {
    pub original: String,
    pub parsed: Url,
}

impl ScanUrl {
    pub fn is_https(&self) -> bool {
        self.parsed.scheme() == "https"
    }

    pub fn host(&self) -> &str {
        self.parsed.host_str().unwrap_or_default()
    }
}

pub fn validate_url(input: &str) -> Result<ScanUrl, ThreatMonitorError> {
    let original = input.trim().to_string();
    let parsed = Url::parse(&original)
        .map_err(|_| ThreatMonitorError::Validation("Invalid URL format".to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ThreatMonitorError::Validation(
            "Only http and https URLs can be scanned".to_string(),
        ));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ThreatMonitorError::Validation(
            "URL must include a host".to_string(),
        ));
    }

    Ok(ScanUrl { original, parsed })
}

/// Accepts an IPv4 address or a hostname
pub fn validate_host(input: &str) -> Result<String, ThreatMonitorError> {
    let host = input.trim().trim_end_matches('.').to_ascii_lowercase();
    // Digits and dots only means an IPv4 literal or nothing
    let numeric = host.chars().all(|c| c.is_ascii_digit() || c == '.');
    let well_formed = if numeric {
        IPV4_REGEX.is_match(&host)
    } else {
        HOSTNAME_REGEX.is_match(&host)
    };
    if host.is_empty() || host.len() > 253 || !well_formed {
        return Err(ThreatMonitorError::Validation(
            "Invalid host format".to_string(),
        ));
    }
    Ok(host)
}

/// Bounds-check a requested port list and drop duplicates, keeping first-seen order
pub fn validate_ports(ports: &[i64]) -> Result<Vec<u16>, ThreatMonitorError> {
    if ports.is_empty() {
        return Err(ThreatMonitorError::Validation(
            "At least one port is required".to_string(),
        ));
    }
    if ports.len() > MAX_PORTS_PER_SCAN {
        return Err(ThreatMonitorError::Validation(format!(
            "A maximum of {} ports can be scanned per request",
            MAX_PORTS_PER_SCAN
        )));
    }

    let mut validated: Vec<u16> = Vec::with_capacity(ports.len());
    for &port in ports {
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| {
                ThreatMonitorError::Validation(format!(
                    "Invalid port {}: must be between 1 and 65535",
                    port
                ))
            })?;
        if !validated.contains(&port) {
            validated.push(port);
        }
    }
    Ok(validated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_normalization_is_idempotent() {
        let variants = [
            "example.com",
            "www.example.com",
            "http://example.com",
            "https://www.example.com",
            "https://www.example.com/some/path?q=1",
            "  HTTPS://Example.COM/  ",
            "example.com:8443",
        ];
        for variant in variants {
            assert_eq!(normalize_domain(variant).unwrap(), "example.com", "{}", variant);
        }
        let once = normalize_domain("https://www.sub.example.org/a").unwrap();
        assert_eq!(normalize_domain(&once).unwrap(), once);
    }

    #[test]
    fn test_invalid_domains_rejected() {
        for bad in ["", "not a domain", "localhost", "https://", "-bad.com", "exa_mple.com"] {
            assert!(normalize_domain(bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_ipv4_boundaries() {
        assert_eq!(validate_ipv4("8.8.8.8", None).unwrap(), "8.8.8.8");
        assert_eq!(validate_ipv4(" 1.1.1.1 ", None).unwrap(), "1.1.1.1");
        assert!(validate_ipv4("::1", None).is_err());
        assert!(validate_ipv4("not-an-ip", None).is_err());
        assert!(validate_ipv4("256.1.1.1", None).is_err());
        assert!(validate_ipv4("1.2.3", None).is_err());
        assert!(validate_ipv4("01.2.3.4", None).is_err());
    }

    #[test]
    fn test_development_localhost_remap() {
        // Non-production convenience: only active when a substitute is supplied
        assert_eq!(validate_ipv4("::1", Some("8.8.8.8")).unwrap(), "8.8.8.8");
        assert_eq!(validate_ipv4("localhost", Some("8.8.8.8")).unwrap(), "8.8.8.8");
        assert_eq!(validate_ipv4("127.0.0.1", Some("8.8.8.8")).unwrap(), "8.8.8.8");
        assert!(validate_ipv4("not-an-ip", Some("8.8.8.8")).is_err());
    }

    #[test]
    fn test_url_validation() {
        let url = validate_url("https://example.com/login").unwrap();
        assert!(url.is_https());
        assert_eq!(url.host(), "example.com");

        assert!(!validate_url("http://example.com").unwrap().is_https());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("not a url").is_err());
        assert!(validate_url("").is_err());
    }

    #[test]
    fn test_host_validation() {
        assert_eq!(validate_host("Scanme.Nmap.org").unwrap(), "scanme.nmap.org");
        assert_eq!(validate_host("10.0.0.1").unwrap(), "10.0.0.1");
        assert!(validate_host("bad host").is_err());
        assert!(validate_host("").is_err());
    }

    #[test]
    fn test_host_rejects_malformed_dotted_quads() {
        for bad in ["999.1.1.1", "256.0.0.1", "1.2.3", "1.2.3.4.5", "01.2.3.4", "1234"] {
            assert!(validate_host(bad).is_err(), "{}", bad);
        }
        assert_eq!(validate_host("192.168.1.254").unwrap(), "192.168.1.254");
        assert_eq!(validate_host("web01.example.com").unwrap(), "web01.example.com");
    }

    #[test]
    fn test_port_list_boundaries() {
        let fifty: Vec<i64> = (1..=50).collect();
        assert_eq!(validate_ports(&fifty).unwrap().len(), 50);

        let fifty_one: Vec<i64> = (1..=51).collect();
        assert!(validate_ports(&fifty_one).is_err());

        assert!(validate_ports(&[]).is_err());
        assert!(validate_ports(&[0]).is_err());
        assert!(validate_ports(&[65536]).is_err());
        assert!(validate_ports(&[-22]).is_err());
        assert_eq!(validate_ports(&[443, 80, 443, 22]).unwrap(), vec![443, 80, 22]);
    }
}
