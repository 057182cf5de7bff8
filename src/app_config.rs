// Centralized configuration management for the threat monitor
// Load ALL env vars ONCE at startup, then hand the result to AppState

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub threat_intel: ThreatIntelConfig,
    pub features: FeatureConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub environment: Environment,
    pub rust_log: String,
}

/// Environment type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" => Environment::Test,
            "staging" | "stage" => Environment::Staging,
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Database configuration. `url` is optional: without it the rate limiter
/// keeps its usage log in process memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: u64,
    pub idle_timeout: u64,
    pub max_lifetime: u64,
    pub disable_embedded_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 20,
            min_connections: 2,
            connect_timeout: 30,
            idle_timeout: 600,
            max_lifetime: 1800,
            disable_embedded_migrations: false,
        }
    }
}

/// Security configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_audience: Option<String>,
    pub jwt_issuer: Option<String>,
    pub session_cookie_name: String,
    pub cors_allowed_origins: Vec<String>,
    pub cors_primary_origin: String,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_audience", &self.jwt_audience)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("session_cookie_name", &self.session_cookie_name)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("cors_primary_origin", &self.cors_primary_origin)
            .finish()
    }
}

/// How the port-scan endpoint determines port status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PortScanMode {
    /// Demo behaviour: weighted randomness plus artificial latency, no sockets
    Simulated,
    /// Real TCP connect probes with a per-port timeout
    TcpConnect,
}

impl From<String> for PortScanMode {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "tcp-connect" | "tcp_connect" | "tcp" => PortScanMode::TcpConnect,
            _ => PortScanMode::Simulated,
        }
    }
}

/// Threat intelligence provider configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ThreatIntelConfig {
    pub securitytrails_api_key: Option<String>,
    pub securitytrails_base_url: String,
    pub abuseipdb_api_key: Option<String>,
    pub abuseipdb_base_url: String,
    pub ipapi_api_key: Option<String>,
    pub ipapi_base_url: String,
    pub phishtank_app_key: Option<String>,
    pub phishtank_base_url: String,
    pub ssllabs_base_url: String,
    pub rdap_base_url: String,
    pub doh_base_url: String,
    pub screenshot_service_url: Option<String>,
    pub provider_timeout_secs: u64,
    pub provider_user_agent: String,
    pub port_scan_mode: PortScanMode,
    pub port_probe_timeout_ms: u64,
    pub dev_localhost_substitute_ip: String,
}

impl Default for ThreatIntelConfig {
    fn default() -> Self {
        Self {
            securitytrails_api_key: None,
            securitytrails_base_url: "https://api.securitytrails.com/v1".to_string(),
            abuseipdb_api_key: None,
            abuseipdb_base_url: "https://api.abuseipdb.com/api/v2".to_string(),
            ipapi_api_key: None,
            ipapi_base_url: "http://ip-api.com".to_string(),
            phishtank_app_key: None,
            phishtank_base_url: "https://checkurl.phishtank.com".to_string(),
            ssllabs_base_url: "https://api.ssllabs.com/api/v3".to_string(),
            rdap_base_url: "https://rdap.org".to_string(),
            doh_base_url: "https://cloudflare-dns.com/dns-query".to_string(),
            screenshot_service_url: None,
            provider_timeout_secs: 8,
            provider_user_agent: "threat-monitor/0.1".to_string(),
            port_scan_mode: PortScanMode::Simulated,
            port_probe_timeout_ms: 1500,
            dev_localhost_substitute_ip: "8.8.8.8".to_string(),
        }
    }
}

impl std::fmt::Debug for ThreatIntelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("ThreatIntelConfig")
            .field("securitytrails_api_key", &redact(&self.securitytrails_api_key))
            .field("securitytrails_base_url", &self.securitytrails_base_url)
            .field("abuseipdb_api_key", &redact(&self.abuseipdb_api_key))
            .field("abuseipdb_base_url", &self.abuseipdb_base_url)
            .field("ipapi_api_key", &redact(&self.ipapi_api_key))
            .field("ipapi_base_url", &self.ipapi_base_url)
            .field("phishtank_app_key", &redact(&self.phishtank_app_key))
            .field("phishtank_base_url", &self.phishtank_base_url)
            .field("ssllabs_base_url", &self.ssllabs_base_url)
            .field("rdap_base_url", &self.rdap_base_url)
            .field("doh_base_url", &self.doh_base_url)
            .field("screenshot_service_url", &self.screenshot_service_url)
            .field("provider_timeout_secs", &self.provider_timeout_secs)
            .field("provider_user_agent", &self.provider_user_agent)
            .field("port_scan_mode", &self.port_scan_mode)
            .field("port_probe_timeout_ms", &self.port_probe_timeout_ms)
            .field("dev_localhost_substitute_ip", &self.dev_localhost_substitute_ip)
            .finish()
    }
}

/// Feature flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub enable_rate_limiting: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            enable_rate_limiting: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Helper function to get required env var
        let get_required = |key: &str| -> Result<String, ConfigError> {
            env::var(key).map_err(|_| ConfigError::MissingVar(key.to_string()))
        };

        // Helper function to get optional env var with default
        let get_or_default = |key: &str, default: &str| -> String {
            env::var(key).unwrap_or_else(|_| default.to_string())
        };

        // Optional env var; empty strings count as unset
        let get_optional = |key: &str| -> Option<String> {
            env::var(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let parse_or_default = |key: &str, default: &str| -> Result<u32, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u32".to_string())
            })
        };

        let parse_u64_or_default = |key: &str, default: &str| -> Result<u64, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u64".to_string())
            })
        };

        let parse_bool_or_default = |key: &str, default: &str| -> bool {
            get_or_default(key, default).to_lowercase() == "true"
        };

        // Parse bind address to extract port
        let bind_address = get_or_default("BIND_ADDRESS", "0.0.0.0:8080");
        let port = bind_address
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let environment = Environment::from(get_or_default("ENVIRONMENT", "development"));
        let rust_log = get_or_default("RUST_LOG", "threat_monitor_core=debug,tower_http=info");

        let jwt_secret = get_required("JWT_SECRET")?;
        if jwt_secret.len() < 32 {
            return Err(ConfigError::InvalidValue(
                "JWT_SECRET".to_string(),
                "Secret must be at least 32 characters long".to_string(),
            ));
        }

        let cors_allowed_origins: Vec<String> = get_or_default("CORS_ALLOWED_ORIGINS", "")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let cors_primary_origin = get_or_default("CORS_PRIMARY_ORIGIN", "http://localhost:3000");

        let provider_timeout_secs = parse_u64_or_default("PROVIDER_TIMEOUT_SECS", "8")?;
        if provider_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "PROVIDER_TIMEOUT_SECS".to_string(),
                "timeout must be greater than zero".to_string(),
            ));
        }

        let defaults = ThreatIntelConfig::default();

        let server = ServerConfig {
            bind_address,
            port,
            environment,
            rust_log,
        };

        let database = DatabaseConfig {
            url: get_optional("DATABASE_URL"),
            max_connections: parse_or_default("DATABASE_MAX_CONNECTIONS", "20")?,
            min_connections: parse_or_default("DATABASE_MIN_CONNECTIONS", "2")?,
            connect_timeout: parse_u64_or_default("DATABASE_CONNECT_TIMEOUT", "30")?,
            idle_timeout: parse_u64_or_default("DATABASE_IDLE_TIMEOUT", "600")?,
            max_lifetime: parse_u64_or_default("DATABASE_MAX_LIFETIME", "1800")?,
            disable_embedded_migrations: parse_bool_or_default(
                "DISABLE_EMBEDDED_MIGRATIONS",
                "false",
            ),
        };

        let security = SecurityConfig {
            jwt_secret,
            jwt_audience: get_optional("JWT_AUDIENCE"),
            jwt_issuer: get_optional("JWT_ISSUER"),
            session_cookie_name: get_or_default("SESSION_COOKIE_NAME", "session-token"),
            cors_allowed_origins,
            cors_primary_origin,
        };

        let threat_intel = ThreatIntelConfig {
            securitytrails_api_key: get_optional("SECURITYTRAILS_API_KEY"),
            securitytrails_base_url: get_or_default(
                "SECURITYTRAILS_BASE_URL",
                &defaults.securitytrails_base_url,
            ),
            abuseipdb_api_key: get_optional("ABUSEIPDB_API_KEY"),
            abuseipdb_base_url: get_or_default("ABUSEIPDB_BASE_URL", &defaults.abuseipdb_base_url),
            ipapi_api_key: get_optional("IPAPI_API_KEY"),
            ipapi_base_url: get_or_default("IPAPI_BASE_URL", &defaults.ipapi_base_url),
            phishtank_app_key: get_optional("PHISHTANK_APP_KEY"),
            phishtank_base_url: get_or_default("PHISHTANK_BASE_URL", &defaults.phishtank_base_url),
            ssllabs_base_url: get_or_default("SSLLABS_BASE_URL", &defaults.ssllabs_base_url),
            rdap_base_url: get_or_default("RDAP_BASE_URL", &defaults.rdap_base_url),
            doh_base_url: get_or_default("DOH_BASE_URL", &defaults.doh_base_url),
            screenshot_service_url: get_optional("SCREENSHOT_SERVICE_URL"),
            provider_timeout_secs,
            provider_user_agent: get_or_default(
                "PROVIDER_USER_AGENT",
                &defaults.provider_user_agent,
            ),
            port_scan_mode: PortScanMode::from(get_or_default("PORT_SCAN_MODE", "simulated")),
            port_probe_timeout_ms: parse_u64_or_default("PORT_PROBE_TIMEOUT_MS", "1500")?,
            dev_localhost_substitute_ip: get_or_default(
                "DEV_LOCALHOST_SUBSTITUTE_IP",
                &defaults.dev_localhost_substitute_ip,
            ),
        };

        let features = FeatureConfig {
            enable_rate_limiting: parse_bool_or_default("ENABLE_RATE_LIMITING", "true"),
        };

        Ok(Self {
            server,
            database,
            security,
            threat_intel,
            features,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.server.environment == Environment::Production
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.server.environment == Environment::Development
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_environment_from_string() {
        assert_eq!(
            Environment::from("development".to_string()),
            Environment::Development
        );
        assert_eq!(
            Environment::from("prod".to_string()),
            Environment::Production
        );
        assert_eq!(Environment::from("test".to_string()), Environment::Test);
        assert_eq!(
            Environment::from("staging".to_string()),
            Environment::Staging
        );
    }

    #[test]
    fn test_port_scan_mode_from_string() {
        assert_eq!(
            PortScanMode::from("tcp-connect".to_string()),
            PortScanMode::TcpConnect
        );
        assert_eq!(
            PortScanMode::from("anything-else".to_string()),
            PortScanMode::Simulated
        );
    }

    #[test]
    #[serial]
    fn test_config_with_env() {
        env::set_var(
            "JWT_SECRET",
            "test-secret-that-is-at-least-32-characters-long",
        );
        env::set_var("ABUSEIPDB_API_KEY", "abuse-key");
        env::set_var("SECURITYTRAILS_API_KEY", "   ");
        env::set_var("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example");

        let config = AppConfig::from_env().expect("Failed to load test config");

        assert_eq!(config.threat_intel.abuseipdb_api_key.as_deref(), Some("abuse-key"));
        // Blank keys are treated as missing
        assert!(config.threat_intel.securitytrails_api_key.is_none());
        assert_eq!(
            config.security.cors_allowed_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert_eq!(config.threat_intel.provider_timeout_secs, 8);
        assert!(config.features.enable_rate_limiting);

        let debug = format!("{:?}", config);
        assert!(!debug.contains("abuse-key"));
        assert!(!debug.contains("test-secret-that"));

        env::remove_var("JWT_SECRET");
        env::remove_var("ABUSEIPDB_API_KEY");
        env::remove_var("SECURITYTRAILS_API_KEY");
        env::remove_var("CORS_ALLOWED_ORIGINS");
    }

    #[test]
    #[serial]
    fn test_short_jwt_secret_rejected() {
        env::set_var("JWT_SECRET", "too-short");
        let result = AppConfig::from_env();
        assert!(matches!(result, Err(ConfigError::InvalidValue(ref key, _)) if key == "JWT_SECRET"));
        env::remove_var("JWT_SECRET");
    }
}
