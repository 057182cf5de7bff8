// SecurityTrails v1: domain details, registration data and A-record history

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use super::{
    require_credential, send_json, trim_base_url, DnsHistory, DomainDetails,
    DomainHistorySource, ProviderConfigError, ProviderError, RegistrationRecord,
};
use crate::{app_config::ThreatIntelConfig, models::HistoricalDnsRecord};

const PROVIDER: &str = "securitytrails";

pub struct SecurityTrailsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SecurityTrailsClient {
    pub fn new(http: reqwest::Client, config: &ThreatIntelConfig) -> Result<Self, ProviderConfigError> {
        let api_key = require_credential(
            PROVIDER,
            "SECURITYTRAILS_API_KEY",
            config.securitytrails_api_key.as_ref(),
        )?;
        Ok(Self {
            http,
            base_url: trim_base_url(&config.securitytrails_base_url),
            api_key,
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}{}", self.base_url, path))
            .header("APIKEY", &self.api_key)
            .header("Accept", "application/json")
    }
}

// Upstream response shapes

#[derive(Debug, Deserialize)]
struct DomainResponse {
    #[serde(default)]
    hostname: Option<String>,
    #[serde(default)]
    subdomain_count: Option<u64>,
    #[serde(default)]
    alexa_rank: Option<u64>,
    #[serde(default)]
    current_dns: Option<CurrentDns>,
}

#[derive(Debug, Default, Deserialize)]
struct CurrentDns {
    #[serde(default)]
    a: Option<DnsValues>,
    #[serde(default)]
    ns: Option<DnsValues>,
}

#[derive(Debug, Default, Deserialize)]
struct DnsValues {
    #[serde(default)]
    values: Vec<DnsValue>,
}

#[derive(Debug, Deserialize)]
struct DnsValue {
    #[serde(default)]
    ip: Option<String>,
    #[serde(default)]
    nameserver: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WhoisResponse {
    #[serde(default)]
    registrar_name: Option<String>,
    #[serde(default)]
    created_date: Option<i64>,
    #[serde(default)]
    expires_date: Option<i64>,
    #[serde(default)]
    updated_date: Option<i64>,
    #[serde(default)]
    name_servers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    records: Vec<HistoryRecord>,
}

#[derive(Debug, Deserialize)]
struct HistoryRecord {
    #[serde(default)]
    values: Vec<DnsValue>,
    #[serde(default)]
    organizations: Vec<String>,
    #[serde(default)]
    first_seen: Option<String>,
    #[serde(default)]
    last_seen: Option<String>,
}

fn from_millis(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}

#[async_trait]
impl DomainHistorySource for SecurityTrailsClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn domain_details(&self, domain: &str) -> Result<DomainDetails, ProviderError> {
        let body: DomainResponse = send_json(PROVIDER, self.get(&format!("/domain/{}", domain))).await?;
        let dns = body.current_dns.unwrap_or_default();

        Ok(DomainDetails {
            hostname: body.hostname.unwrap_or_else(|| domain.to_string()),
            subdomain_count: body.subdomain_count,
            alexa_rank: body.alexa_rank,
            current_a_records: dns
                .a
                .unwrap_or_default()
                .values
                .into_iter()
                .filter_map(|v| v.ip)
                .collect(),
            current_name_servers: dns
                .ns
                .unwrap_or_default()
                .values
                .into_iter()
                .filter_map(|v| v.nameserver)
                .collect(),
        })
    }

    async fn domain_whois(&self, domain: &str) -> Result<RegistrationRecord, ProviderError> {
        let body: WhoisResponse =
            send_json(PROVIDER, self.get(&format!("/domain/{}/whois", domain))).await?;

        Ok(RegistrationRecord {
            registrar: body.registrar_name.filter(|r| !r.is_empty()),
            created_date: from_millis(body.created_date),
            expires_date: from_millis(body.expires_date),
            updated_date: from_millis(body.updated_date),
            name_servers: body
                .name_servers
                .into_iter()
                .map(|ns| ns.to_ascii_lowercase())
                .collect(),
        })
    }

    async fn dns_history(&self, domain: &str) -> Result<DnsHistory, ProviderError> {
        let body: HistoryResponse =
            send_json(PROVIDER, self.get(&format!("/history/{}/dns/a", domain))).await?;

        let records = body
            .records
            .into_iter()
            .map(|record| HistoricalDnsRecord {
                values: record.values.into_iter().filter_map(|v| v.ip).collect(),
                organizations: record.organizations,
                first_seen: record.first_seen,
                last_seen: record.last_seen,
            })
            .collect();

        Ok(DnsHistory { records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_fails_fast() {
        let config = ThreatIntelConfig::default();
        let result = SecurityTrailsClient::new(reqwest::Client::new(), &config);
        assert!(matches!(
            result,
            Err(ProviderConfigError::MissingCredential {
                env_var: "SECURITYTRAILS_API_KEY",
                ..
            })
        ));
    }

    #[test]
    fn test_epoch_millis_conversion() {
        let date = from_millis(Some(1_527_724_800_000)).unwrap();
        assert_eq!(date.to_rfc3339(), "2018-05-31T00:00:00+00:00");
        assert!(from_millis(None).is_none());
    }
}
