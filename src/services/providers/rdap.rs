// RDAP registration lookup, the dedicated WHOIS source

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::{send_json, trim_base_url, ProviderError, RegistrationRecord, WhoisSource};
use crate::app_config::ThreatIntelConfig;

const PROVIDER: &str = "rdap";

pub struct RdapClient {
    http: reqwest::Client,
    base_url: String,
}

impl RdapClient {
    pub fn new(http: reqwest::Client, config: &ThreatIntelConfig) -> Self {
        Self {
            http,
            base_url: trim_base_url(&config.rdap_base_url),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RdapDomain {
    #[serde(default)]
    events: Vec<RdapEvent>,
    #[serde(default)]
    nameservers: Vec<RdapNameserver>,
    #[serde(default)]
    entities: Vec<RdapEntity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RdapEvent {
    event_action: String,
    event_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RdapNameserver {
    ldh_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RdapEntity {
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    vcard_array: Option<Value>,
}

impl RdapDomain {
    fn event(&self, action: &str) -> Option<DateTime<Utc>> {
        self.events
            .iter()
            .find(|e| e.event_action.eq_ignore_ascii_case(action))
            .and_then(|e| e.event_date)
    }

    fn registrar(&self) -> Option<String> {
        self.entities
            .iter()
            .find(|e| e.roles.iter().any(|r| r == "registrar"))
            .and_then(|e| e.vcard_array.as_ref())
            .and_then(vcard_full_name)
    }
}

/// Pull the `fn` property out of a jCard: `["vcard", [["fn", {}, "text", "Name"], ...]]`
fn vcard_full_name(vcard: &Value) -> Option<String> {
    vcard
        .get(1)?
        .as_array()?
        .iter()
        .filter_map(Value::as_array)
        .find(|prop| prop.first().and_then(Value::as_str) == Some("fn"))
        .and_then(|prop| prop.get(3))
        .and_then(Value::as_str)
        .map(String::from)
}

#[async_trait]
impl WhoisSource for RdapClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn lookup(&self, domain: &str) -> Result<RegistrationRecord, ProviderError> {
        let request = self
            .http
            .get(format!("{}/domain/{}", self.base_url, domain))
            .header("Accept", "application/rdap+json");
        let body: RdapDomain = send_json(PROVIDER, request).await?;

        Ok(RegistrationRecord {
            registrar: body.registrar(),
            created_date: body.event("registration"),
            expires_date: body.event("expiration"),
            updated_date: body
                .event("last changed")
                .or_else(|| body.event("last update of RDAP database")),
            name_servers: body
                .nameservers
                .iter()
                .filter_map(|ns| ns.ldh_name.as_ref())
                .map(|ns| ns.to_ascii_lowercase())
                .collect(),
        })
    }
}
