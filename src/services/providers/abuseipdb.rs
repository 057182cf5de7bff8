// AbuseIPDB v2 reputation check

use async_trait::async_trait;
use serde::Deserialize;

use super::{
    require_credential, send_json, trim_base_url, AbuseReport, AbuseSource,
    ProviderConfigError, ProviderError,
};
use crate::app_config::ThreatIntelConfig;

const PROVIDER: &str = "abuseipdb";
const MAX_AGE_IN_DAYS: &str = "90";

pub struct AbuseIpDbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AbuseIpDbClient {
    pub fn new(http: reqwest::Client, config: &ThreatIntelConfig) -> Result<Self, ProviderConfigError> {
        let api_key =
            require_credential(PROVIDER, "ABUSEIPDB_API_KEY", config.abuseipdb_api_key.as_ref())?;
        Ok(Self {
            http,
            base_url: trim_base_url(&config.abuseipdb_base_url),
            api_key,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    data: CheckData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckData {
    ip_address: String,
    #[serde(default)]
    abuse_confidence_score: u8,
    #[serde(default)]
    is_whitelisted: Option<bool>,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    usage_type: Option<String>,
    #[serde(default)]
    isp: Option<String>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    total_reports: u64,
    #[serde(default)]
    last_reported_at: Option<String>,
}

impl From<CheckData> for AbuseReport {
    fn from(data: CheckData) -> Self {
        AbuseReport {
            ip_address: data.ip_address,
            abuse_confidence_score: data.abuse_confidence_score.min(100),
            is_whitelisted: data.is_whitelisted,
            country_code: data.country_code,
            usage_type: data.usage_type,
            isp: data.isp,
            domain: data.domain,
            total_reports: data.total_reports,
            last_reported_at: data.last_reported_at,
        }
    }
}

#[async_trait]
impl AbuseSource for AbuseIpDbClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn check_ip(&self, ip: &str) -> Result<AbuseReport, ProviderError> {
        let request = self
            .http
            .get(format!("{}/check", self.base_url))
            .query(&[("ipAddress", ip), ("maxAgeInDays", MAX_AGE_IN_DAYS)])
            .header("Key", &self.api_key)
            .header("Accept", "application/json");
        let body: CheckResponse = send_json(PROVIDER, request).await?;
        Ok(body.data.into())
    }
}
