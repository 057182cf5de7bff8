// IP reputation scanner: abuse reports plus geolocation

use chrono::Utc;
use std::{collections::BTreeSet, sync::Arc, time::Duration};
use tracing::instrument;

use super::{risk::ip_risk, settle::settle};
use crate::{
    models::{IpReputationDetails, IpReputationResponse},
    services::providers::{AbuseSource, GeoSource},
};

pub struct IpReputationScanner {
    abuse: Arc<dyn AbuseSource>,
    geo: Arc<dyn GeoSource>,
    provider_timeout: Duration,
}

impl IpReputationScanner {
    pub fn new(abuse: Arc<dyn AbuseSource>, geo: Arc<dyn GeoSource>, provider_timeout: Duration) -> Self {
        Self {
            abuse,
            geo,
            provider_timeout,
        }
    }

    /// `ip` must already be a validated IPv4 address
    #[instrument(skip(self))]
    pub async fn scan(&self, ip: &str) -> IpReputationResponse {
        let (abuse, geo) = tokio::join!(
            settle(self.abuse.name(), self.provider_timeout, self.abuse.check_ip(ip)),
            settle(self.geo.name(), self.provider_timeout, self.geo.locate(ip)),
        );

        let mut sources = BTreeSet::new();
        if abuse.is_success() {
            sources.insert(abuse.provider_name.to_string());
        }
        if geo.is_success() {
            sources.insert(geo.provider_name.to_string());
        }

        let abuse = abuse.into_option();
        let geo = geo.into_option();
        let risk = ip_risk(abuse.as_ref());

        let country = geo
            .as_ref()
            .and_then(|g| g.country.clone())
            .or_else(|| abuse.as_ref().and_then(|a| a.country_code.clone()));
        let isp = abuse
            .as_ref()
            .and_then(|a| a.isp.clone())
            .or_else(|| geo.as_ref().and_then(|g| g.isp.clone()));

        tracing::info!(
            ip,
            risk_score = risk.risk_score,
            blacklisted = risk.blacklisted,
            "IP reputation scan complete"
        );

        IpReputationResponse {
            ip: ip.to_string(),
            is_safe: risk.is_safe,
            risk_score: risk.risk_score,
            country,
            isp,
            threat_type: risk.threat_type,
            blacklisted: risk.blacklisted,
            abuse_confidence: abuse.as_ref().map(|a| a.abuse_confidence_score),
            details: IpReputationDetails {
                usage_type: abuse.as_ref().and_then(|a| a.usage_type.clone()),
                total_reports: abuse.as_ref().map(|a| a.total_reports),
                last_reported_at: abuse.as_ref().and_then(|a| a.last_reported_at.clone()),
                domain: abuse.as_ref().and_then(|a| a.domain.clone()),
                is_whitelisted: abuse.as_ref().and_then(|a| a.is_whitelisted),
                geolocation: geo,
                sources,
            },
            scanned_at: Utc::now(),
        }
    }
}
