// Domain intelligence scanner
// Registration data, current DNS, A-record history and a derived risk score

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use std::{collections::BTreeSet, sync::Arc, time::Duration};
use tracing::instrument;

use super::{
    risk::{domain_risk, DomainSignals},
    settle::{settle, ProviderResult},
};
use crate::{
    models::{
        DnsRecords, DomainIntelResponse, DomainThreatIntel, HistoricalData, RiskLevel, WhoisView,
    },
    services::providers::{
        DnsRecordType, DnsSource, DomainHistorySource, RegistrationRecord, WhoisSource,
    },
};

pub struct DomainIntelScanner {
    history: Arc<dyn DomainHistorySource>,
    whois: Arc<dyn WhoisSource>,
    dns: Arc<dyn DnsSource>,
    provider_timeout: Duration,
}

impl DomainIntelScanner {
    pub fn new(
        history: Arc<dyn DomainHistorySource>,
        whois: Arc<dyn WhoisSource>,
        dns: Arc<dyn DnsSource>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            history,
            whois,
            dns,
            provider_timeout,
        }
    }

    /// `domain` must already be normalized
    #[instrument(skip(self))]
    pub async fn scan(&self, domain: &str) -> DomainIntelResponse {
        let deadline = self.provider_timeout;
        let history_name = self.history.name();

        let (registration, details, history_whois, history, (dns, dns_ok)) = tokio::join!(
            settle(self.whois.name(), deadline, self.whois.lookup(domain)),
            settle(history_name, deadline, self.history.domain_details(domain)),
            settle(history_name, deadline, self.history.domain_whois(domain)),
            settle(history_name, deadline, self.history.dns_history(domain)),
            resolve_all(self.dns.as_ref(), domain, deadline),
        );

        let mut sources = BTreeSet::new();
        for (name, ok) in [
            (registration.provider_name, registration.is_success()),
            (details.provider_name, details.is_success()),
            (history_whois.provider_name, history_whois.is_success()),
            (history.provider_name, history.is_success()),
            (self.dns.name(), dns_ok),
        ] {
            if ok {
                sources.insert(name.to_string());
            }
        }

        let now = Utc::now();
        let whois = merge_whois(&registration, &history_whois, now);
        let details = details.into_option();
        let history = history.into_option();

        let subdomain_count = details.as_ref().and_then(|d| d.subdomain_count);
        let risk = domain_risk(&DomainSignals {
            domain,
            domain_age_days: whois.domain_age_days,
            dns_history_count: history.as_ref().map(|h| h.records.len()),
            subdomain_count,
        });

        tracing::info!(
            domain,
            risk_score = risk.risk_score,
            sources = sources.len(),
            "Domain intelligence scan complete"
        );

        DomainIntelResponse {
            domain: domain.to_string(),
            whois,
            dns,
            threat_intel: DomainThreatIntel {
                risk_score: risk.risk_score,
                is_malicious: risk.is_malicious,
                risk_level: RiskLevel::from_score(risk.risk_score),
                categories: risk.categories,
                contributing_sources: sources,
                subdomain_count,
                alexa_rank: details.as_ref().and_then(|d| d.alexa_rank),
            },
            historical_data: history.map(|h| HistoricalData {
                record_count: h.records.len(),
                records: h.records,
            }),
            scanned_at: now,
        }
    }
}

/// Query every record type concurrently. A failed type yields an empty list.
/// The flag reports whether any query succeeded.
async fn resolve_all(dns: &dyn DnsSource, domain: &str, deadline: Duration) -> (DnsRecords, bool) {
    let results = join_all(
        DnsRecordType::ALL
            .iter()
            .map(|record_type| settle(dns.name(), deadline, dns.resolve(domain, *record_type))),
    )
    .await;

    let mut records = DnsRecords::default();
    let mut any_ok = false;
    for (record_type, result) in DnsRecordType::ALL.iter().zip(results) {
        any_ok |= result.is_success();
        let answers = result.into_option().unwrap_or_default();
        match record_type {
            DnsRecordType::A => records.a = answers,
            DnsRecordType::Mx => records.mx = answers,
            DnsRecordType::Txt => records.txt = answers,
            DnsRecordType::Cname => records.cname = answers,
            DnsRecordType::Ns => records.ns = answers,
        }
    }
    (records, any_ok)
}

/// Layer the dedicated WHOIS provider over the domain-details provider, field by field
pub fn merge_whois(
    primary: &ProviderResult<RegistrationRecord>,
    fallback: &ProviderResult<RegistrationRecord>,
    now: DateTime<Utc>,
) -> WhoisView {
    let p = primary.as_option();
    let f = fallback.as_option();
    let mut source = BTreeSet::new();

    let mut pick = |get: fn(&RegistrationRecord) -> Option<DateTime<Utc>>| {
        if let Some(value) = p.and_then(get) {
            source.insert(primary.provider_name);
            Some(value)
        } else if let Some(value) = f.and_then(get) {
            source.insert(fallback.provider_name);
            Some(value)
        } else {
            None
        }
    };

    let created_date = pick(|r| r.created_date);
    let expires_date = pick(|r| r.expires_date);
    let updated_date = pick(|r| r.updated_date);

    let registrar = match (p.and_then(|r| r.registrar.clone()), f.and_then(|r| r.registrar.clone())) {
        (Some(name), _) => {
            source.insert(primary.provider_name);
            Some(name)
        },
        (None, Some(name)) => {
            source.insert(fallback.provider_name);
            Some(name)
        },
        (None, None) => None,
    };

    let name_servers = match (p.map(|r| &r.name_servers), f.map(|r| &r.name_servers)) {
        (Some(ns), _) if !ns.is_empty() => {
            source.insert(primary.provider_name);
            ns.clone()
        },
        (_, Some(ns)) if !ns.is_empty() => {
            source.insert(fallback.provider_name);
            ns.clone()
        },
        _ => Vec::new(),
    };

    WhoisView {
        registrar,
        domain_age_days: created_date.map(|created| (now - created).num_days()),
        created_date,
        expires_date,
        updated_date,
        name_servers,
        source: source.into_iter().map(String::from).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::ProviderError;
    use chrono::Duration as ChronoDuration;

    fn ok(provider: &'static str, record: RegistrationRecord) -> ProviderResult<RegistrationRecord> {
        ProviderResult {
            provider_name: provider,
            outcome: Ok(record),
        }
    }

    fn failed(provider: &'static str) -> ProviderResult<RegistrationRecord> {
        ProviderResult {
            provider_name: provider,
            outcome: Err(ProviderError::Timeout { provider }),
        }
    }

    #[test]
    fn test_merge_prefers_primary_field_by_field() {
        let now = Utc::now();
        let primary = ok(
            "rdap",
            RegistrationRecord {
                registrar: Some("Primary Registrar".into()),
                created_date: None,
                ..Default::default()
            },
        );
        let fallback = ok(
            "securitytrails",
            RegistrationRecord {
                registrar: Some("Fallback Registrar".into()),
                created_date: Some(now - ChronoDuration::days(400)),
                name_servers: vec!["ns1.example.net".into()],
                ..Default::default()
            },
        );

        let view = merge_whois(&primary, &fallback, now);
        assert_eq!(view.registrar.as_deref(), Some("Primary Registrar"));
        assert_eq!(view.domain_age_days, Some(400));
        assert_eq!(view.name_servers, vec!["ns1.example.net"]);
        assert_eq!(view.source, vec!["rdap", "securitytrails"]);
    }

    #[test]
    fn test_merge_with_both_failed_is_empty() {
        let view = merge_whois(&failed("rdap"), &failed("securitytrails"), Utc::now());
        assert_eq!(view, WhoisView::default());
    }
}
