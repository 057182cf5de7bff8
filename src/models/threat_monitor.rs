// Threat monitor request and response models
// Responses are camelCase JSON; absent provider data is serialized as null, never omitted

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::Validate;

// =============================================================================
// REQUEST DTOs
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct DomainIntelRequest {
    #[validate(length(min = 1, max = 2048, message = "Domain is required"))]
    pub domain: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct IpReputationRequest {
    #[validate(length(min = 1, max = 64, message = "IP address is required"))]
    pub ip: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct UrlScanRequest {
    #[validate(length(min = 1, max = 8192, message = "URL is required"))]
    pub url: String,
    pub capture_screenshot: Option<bool>,
}

/// Ports arrive as signed integers so out-of-range values become a 400
/// with a useful message instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct PortScanRequest {
    #[validate(length(min = 1, max = 253, message = "Host is required"))]
    pub host: String,
    pub ports: Vec<i64>,
}

// =============================================================================
// SHARED VIEWS
// =============================================================================

/// Risk band derived from a 0-100 score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=20 => RiskLevel::Safe,
            21..=40 => RiskLevel::Low,
            41..=60 => RiskLevel::Medium,
            61..=80 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }
}

/// DNS answers keyed by lowercase record type. Every key is always present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsRecords {
    pub a: Vec<String>,
    pub mx: Vec<String>,
    pub txt: Vec<String>,
    pub cname: Vec<String>,
    pub ns: Vec<String>,
}

impl DnsRecords {
    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
            && self.mx.is_empty()
            && self.txt.is_empty()
            && self.cname.is_empty()
            && self.ns.is_empty()
    }
}

/// One historical A-record observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalDnsRecord {
    pub values: Vec<String>,
    pub organizations: Vec<String>,
    pub first_seen: Option<String>,
    pub last_seen: Option<String>,
}

// =============================================================================
// DOMAIN INTEL
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainIntelResponse {
    pub domain: String,
    pub whois: WhoisView,
    pub dns: DnsRecords,
    pub threat_intel: DomainThreatIntel,
    pub historical_data: Option<HistoricalData>,
    pub scanned_at: DateTime<Utc>,
}

/// Registration data merged field by field from the WHOIS and domain-details providers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoisView {
    pub registrar: Option<String>,
    pub created_date: Option<DateTime<Utc>>,
    pub expires_date: Option<DateTime<Utc>>,
    pub updated_date: Option<DateTime<Utc>>,
    pub name_servers: Vec<String>,
    pub domain_age_days: Option<i64>,
    /// Providers that supplied at least one field
    pub source: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainThreatIntel {
    pub risk_score: u8,
    pub is_malicious: bool,
    pub risk_level: RiskLevel,
    pub categories: BTreeSet<String>,
    pub contributing_sources: BTreeSet<String>,
    pub subdomain_count: Option<u64>,
    pub alexa_rank: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalData {
    pub record_count: usize,
    pub records: Vec<HistoricalDnsRecord>,
}

// =============================================================================
// IP REPUTATION
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpReputationResponse {
    pub ip: String,
    pub is_safe: bool,
    pub risk_score: u8,
    pub country: Option<String>,
    pub isp: Option<String>,
    pub threat_type: Option<String>,
    pub blacklisted: bool,
    pub abuse_confidence: Option<u8>,
    pub details: IpReputationDetails,
    pub scanned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpReputationDetails {
    pub usage_type: Option<String>,
    pub total_reports: Option<u64>,
    pub last_reported_at: Option<String>,
    pub domain: Option<String>,
    pub is_whitelisted: Option<bool>,
    pub geolocation: Option<GeoLocation>,
    pub sources: BTreeSet<String>,
}

/// Geolocation block returned by the geolocation provider
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub isp: Option<String>,
    pub org: Option<String>,
    pub asn: Option<String>,
    pub hosting: bool,
    pub proxy: bool,
    pub mobile: bool,
}

// =============================================================================
// URL SCAN
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlScanResponse {
    pub url: String,
    pub is_safe: bool,
    pub risk_score: u8,
    pub threats: Vec<String>,
    pub screenshot: Option<String>,
    pub ssl: Option<SslReport>,
    pub phishing: Option<PhishingVerdict>,
    pub scan_sources: BTreeSet<String>,
    pub scanned_at: DateTime<Utc>,
}

/// Certificate assessment. `synthesized` marks the assume-valid placeholder
/// used while the analysis service is busy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SslReport {
    pub valid: bool,
    pub grade: Option<String>,
    pub issuer: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub days_until_expiry: Option<i64>,
    pub synthesized: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhishingVerdict {
    pub in_database: bool,
    pub verified: bool,
    pub valid: bool,
    pub phish_id: Option<String>,
    pub detail_page: Option<String>,
}

impl PhishingVerdict {
    /// Listed and confirmed by the community
    pub fn is_confirmed_phish(&self) -> bool {
        self.in_database && self.verified
    }
}

// =============================================================================
// PORT SCAN
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortStatus {
    Open,
    Closed,
    Filtered,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortStatusEntry {
    pub port: u16,
    pub status: PortStatus,
    pub service: String,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortScanSummary {
    pub total: usize,
    pub open: usize,
    pub closed: usize,
    pub filtered: usize,
    /// True when results come from the simulated prober and are not real findings
    pub simulated: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortScanResponse {
    pub host: String,
    pub ports: Vec<PortStatusEntry>,
    /// Wall-clock duration of the scan in milliseconds
    pub scan_time: u64,
    pub summary: PortScanSummary,
    pub scanned_at: DateTime<Utc>,
}

// =============================================================================
// MY IP
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyIpResponse {
    pub ip: String,
    pub ip_type: String,
    pub is_localhost: bool,
    pub display_message: String,
    pub timestamp: DateTime<Utc>,
}
