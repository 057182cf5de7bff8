// DNS-over-HTTPS resolver using the JSON wire format

use async_trait::async_trait;
use serde::Deserialize;

use super::{send_json, trim_base_url, DnsRecordType, DnsSource, ProviderError};
use crate::app_config::ThreatIntelConfig;

const PROVIDER: &str = "doh";

pub struct DohClient {
    http: reqwest::Client,
    base_url: String,
}

impl DohClient {
    pub fn new(http: reqwest::Client, config: &ThreatIntelConfig) -> Self {
        Self {
            http,
            base_url: trim_base_url(&config.doh_base_url),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(rename = "Status")]
    status: u32,
    #[serde(rename = "Answer", default)]
    answer: Vec<DohAnswer>,
}

#[derive(Debug, Deserialize)]
struct DohAnswer {
    #[serde(rename = "type")]
    record_type: u16,
    data: String,
}

/// Drop trailing dots from names and the quoting around TXT strings
fn clean_answer(record_type: DnsRecordType, data: &str) -> String {
    match record_type {
        DnsRecordType::Txt => data.trim_matches('"').replace("\" \"", ""),
        _ => data.trim_end_matches('.').to_string(),
    }
}

fn extract_answers(response: DohResponse, record_type: DnsRecordType) -> Vec<String> {
    // NXDOMAIN and friends resolve to nothing rather than an error
    if response.status != 0 {
        return Vec::new();
    }
    response
        .answer
        .into_iter()
        .filter(|a| a.record_type == record_type.code())
        .map(|a| clean_answer(record_type, &a.data))
        .collect()
}

#[async_trait]
impl DnsSource for DohClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn resolve(
        &self,
        domain: &str,
        record_type: DnsRecordType,
    ) -> Result<Vec<String>, ProviderError> {
        let request = self
            .http
            .get(&self.base_url)
            .query(&[("name", domain), ("type", record_type.as_str())])
            .header("Accept", "application/dns-json");
        let body: DohResponse = send_json(PROVIDER, request).await?;
        Ok(extract_answers(body, record_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filters_cname_chain_from_a_answers() {
        let response: DohResponse = serde_json::from_value(json!({
            "Status": 0,
            "Answer": [
                {"name": "www.example.com.", "type": 5, "TTL": 300, "data": "example.com."},
                {"name": "example.com.", "type": 1, "TTL": 300, "data": "93.184.216.34"}
            ]
        }))
        .unwrap();
        assert_eq!(extract_answers(response, DnsRecordType::A), vec!["93.184.216.34"]);
    }

    #[test]
    fn test_nxdomain_yields_empty() {
        let response: DohResponse = serde_json::from_value(json!({"Status": 3})).unwrap();
        assert!(extract_answers(response, DnsRecordType::Mx).is_empty());
    }

    #[test]
    fn test_cleans_txt_and_names() {
        assert_eq!(
            clean_answer(DnsRecordType::Txt, "\"v=spf1 -all\""),
            "v=spf1 -all"
        );
        assert_eq!(
            clean_answer(DnsRecordType::Mx, "10 mail.example.com."),
            "10 mail.example.com"
        );
    }
}
