// Threat intelligence provider clients
// One async capability trait per kind of signal; scanners hold `Arc<dyn Trait>`

pub mod abuseipdb;
pub mod doh;
pub mod ip_api;
pub mod phishtank;
pub mod rdap;
pub mod security_trails;
pub mod ssl_labs;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use crate::{
    app_config::ThreatIntelConfig,
    models::{GeoLocation, HistoricalDnsRecord, PhishingVerdict, SslReport},
};

pub use abuseipdb::AbuseIpDbClient;
pub use doh::DohClient;
pub use ip_api::IpApiClient;
pub use phishtank::PhishTankClient;
pub use rdap::RdapClient;
pub use security_trails::SecurityTrailsClient;
pub use ssl_labs::SslLabsClient;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Failure of a single upstream call. Scanners absorb these.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} returned HTTP {status}")]
    Http { provider: &'static str, status: u16 },

    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} response could not be parsed: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} rejected the lookup: {message}")]
    Rejected {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} did not respond in time")]
    Timeout { provider: &'static str },
}

impl ProviderError {
    pub fn provider(&self) -> &'static str {
        match self {
            ProviderError::Http { provider, .. }
            | ProviderError::Transport { provider, .. }
            | ProviderError::Decode { provider, .. }
            | ProviderError::Rejected { provider, .. }
            | ProviderError::Timeout { provider } => provider,
        }
    }

    pub(crate) fn from_reqwest(provider: &'static str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            ProviderError::Timeout { provider }
        } else if source.is_decode() {
            ProviderError::Decode {
                provider,
                message: source.to_string(),
            }
        } else {
            ProviderError::Transport { provider, source }
        }
    }
}

/// Raised at construction when a client's credential is absent
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderConfigError {
    #[error("{provider} is not configured: missing {env_var}")]
    MissingCredential {
        provider: &'static str,
        env_var: &'static str,
    },

    #[error("provider HTTP client could not be built: {message}")]
    HttpClient { message: String },
}

pub(crate) fn require_credential(
    provider: &'static str,
    env_var: &'static str,
    value: Option<&String>,
) -> Result<String, ProviderConfigError> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or(ProviderConfigError::MissingCredential { provider, env_var })
}

// =============================================================================
// PROVIDER PAYLOADS
// =============================================================================

/// Current state of a domain as seen by the domain-details provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainDetails {
    pub hostname: String,
    pub subdomain_count: Option<u64>,
    pub alexa_rank: Option<u64>,
    pub current_a_records: Vec<String>,
    pub current_name_servers: Vec<String>,
}

/// Registration metadata. Every field is optional so records from
/// different providers can be layered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationRecord {
    pub registrar: Option<String>,
    pub created_date: Option<DateTime<Utc>>,
    pub expires_date: Option<DateTime<Utc>>,
    pub updated_date: Option<DateTime<Utc>>,
    pub name_servers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DnsHistory {
    pub records: Vec<HistoricalDnsRecord>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbuseReport {
    pub ip_address: String,
    pub abuse_confidence_score: u8,
    pub is_whitelisted: Option<bool>,
    pub country_code: Option<String>,
    pub usage_type: Option<String>,
    pub isp: Option<String>,
    pub domain: Option<String>,
    pub total_reports: u64,
    pub last_reported_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsRecordType {
    A,
    Mx,
    Txt,
    Cname,
    Ns,
}

impl DnsRecordType {
    pub const ALL: [DnsRecordType; 5] = [
        DnsRecordType::A,
        DnsRecordType::Mx,
        DnsRecordType::Txt,
        DnsRecordType::Cname,
        DnsRecordType::Ns,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DnsRecordType::A => "A",
            DnsRecordType::Mx => "MX",
            DnsRecordType::Txt => "TXT",
            DnsRecordType::Cname => "CNAME",
            DnsRecordType::Ns => "NS",
        }
    }

    /// RR type number used in DNS JSON answers
    pub fn code(&self) -> u16 {
        match self {
            DnsRecordType::A => 1,
            DnsRecordType::Ns => 2,
            DnsRecordType::Cname => 5,
            DnsRecordType::Mx => 15,
            DnsRecordType::Txt => 16,
        }
    }
}

// =============================================================================
// CAPABILITY TRAITS
// =============================================================================

#[async_trait]
pub trait DomainHistorySource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn domain_details(&self, domain: &str) -> Result<DomainDetails, ProviderError>;
    async fn domain_whois(&self, domain: &str) -> Result<RegistrationRecord, ProviderError>;
    async fn dns_history(&self, domain: &str) -> Result<DnsHistory, ProviderError>;
}

/// Dedicated registration lookup, preferred over the domain-details provider
#[async_trait]
pub trait WhoisSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn lookup(&self, domain: &str) -> Result<RegistrationRecord, ProviderError>;
}

#[async_trait]
pub trait DnsSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn resolve(
        &self,
        domain: &str,
        record_type: DnsRecordType,
    ) -> Result<Vec<String>, ProviderError>;
}

#[async_trait]
pub trait AbuseSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn check_ip(&self, ip: &str) -> Result<AbuseReport, ProviderError>;
}

#[async_trait]
pub trait GeoSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn locate(&self, ip: &str) -> Result<GeoLocation, ProviderError>;
}

#[async_trait]
pub trait PhishingSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn lookup_url(&self, url: &str) -> Result<PhishingVerdict, ProviderError>;
}

#[async_trait]
pub trait SslSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn inspect(&self, host: &str) -> Result<SslReport, ProviderError>;
}

// =============================================================================
// SHARED HTTP PLUMBING
// =============================================================================

/// One pooled client shared by every provider
pub fn build_http_client(
    config: &ThreatIntelConfig,
) -> Result<reqwest::Client, ProviderConfigError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.provider_timeout_secs))
        .connect_timeout(Duration::from_secs(config.provider_timeout_secs.min(5)))
        .user_agent(config.provider_user_agent.clone())
        .build()
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build provider HTTP client");
            ProviderConfigError::HttpClient {
                message: e.to_string(),
            }
        })
}

/// Send a request and decode a JSON body, mapping every failure to `ProviderError`
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Http {
            provider,
            status: status.as_u16(),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, e))
}

pub(crate) fn trim_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}
