// PhishTank checkurl lookup (form POST, app key optional)

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{send_json, trim_base_url, PhishingSource, ProviderError};
use crate::{app_config::ThreatIntelConfig, models::PhishingVerdict};

const PROVIDER: &str = "phishtank";

pub struct PhishTankClient {
    http: reqwest::Client,
    base_url: String,
    app_key: Option<String>,
    user_agent: String,
}

impl PhishTankClient {
    pub fn new(http: reqwest::Client, config: &ThreatIntelConfig) -> Self {
        Self {
            http,
            base_url: trim_base_url(&config.phishtank_base_url),
            app_key: config
                .phishtank_app_key
                .as_ref()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            // PhishTank asks clients to identify themselves with this prefix
            user_agent: format!("phishtank/{}", config.provider_user_agent),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CheckUrlResponse {
    results: CheckUrlResults,
}

#[derive(Debug, Deserialize)]
struct CheckUrlResults {
    #[serde(default)]
    in_database: Value,
    #[serde(default)]
    verified: Value,
    #[serde(default)]
    valid: Value,
    #[serde(default)]
    phish_id: Option<Value>,
    #[serde(default)]
    phish_detail_page: Option<String>,
}

/// PhishTank sends booleans, but older responses use "true"/"false" strings
fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("y"),
        _ => false,
    }
}

impl From<CheckUrlResults> for PhishingVerdict {
    fn from(results: CheckUrlResults) -> Self {
        PhishingVerdict {
            in_database: flag(&results.in_database),
            verified: flag(&results.verified),
            valid: flag(&results.valid),
            phish_id: results.phish_id.and_then(|id| match id {
                Value::String(s) if !s.is_empty() => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }),
            detail_page: results.phish_detail_page,
        }
    }
}

#[async_trait]
impl PhishingSource for PhishTankClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn lookup_url(&self, url: &str) -> Result<PhishingVerdict, ProviderError> {
        let mut form = vec![("url", url), ("format", "json")];
        if let Some(key) = &self.app_key {
            form.push(("app_key", key.as_str()));
        }

        let request = self
            .http
            .post(format!("{}/checkurl/", self.base_url))
            .header("User-Agent", &self.user_agent)
            .form(&form);
        let body: CheckUrlResponse = send_json(PROVIDER, request).await?;
        Ok(body.results.into())
    }
}
