// URL safety scanner: phishing lookup plus certificate inspection for https

use chrono::Utc;
use std::{collections::BTreeSet, sync::Arc, time::Duration};
use tracing::instrument;

use super::{risk::url_risk, settle::settle};
use crate::{
    models::UrlScanResponse,
    services::providers::{PhishingSource, SslSource},
    utils::ScanUrl,
};

pub struct UrlScanner {
    phishing: Arc<dyn PhishingSource>,
    ssl: Arc<dyn SslSource>,
    screenshot_service_url: Option<String>,
    provider_timeout: Duration,
}

impl UrlScanner {
    pub fn new(
        phishing: Arc<dyn PhishingSource>,
        ssl: Arc<dyn SslSource>,
        screenshot_service_url: Option<String>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            phishing,
            ssl,
            screenshot_service_url,
            provider_timeout,
        }
    }

    #[instrument(skip(self, target), fields(url = %target.original))]
    pub async fn scan(&self, target: &ScanUrl, capture_screenshot: bool) -> UrlScanResponse {
        let is_https = target.is_https();
        let deadline = self.provider_timeout;

        let ssl_check = async {
            if is_https {
                Some(settle(self.ssl.name(), deadline, self.ssl.inspect(target.host())).await)
            } else {
                None
            }
        };
        let (phishing, ssl) = tokio::join!(
            settle(
                self.phishing.name(),
                deadline,
                self.phishing.lookup_url(&target.original)
            ),
            ssl_check,
        );

        let mut scan_sources = BTreeSet::new();
        if phishing.is_success() {
            scan_sources.insert(phishing.provider_name.to_string());
        }
        if let Some(result) = &ssl {
            if result.is_success() {
                scan_sources.insert(result.provider_name.to_string());
            }
        }

        let phishing = phishing.into_option();
        let ssl = ssl.and_then(|result| result.into_option());
        let risk = url_risk(phishing.as_ref(), is_https, ssl.as_ref());

        let screenshot = if capture_screenshot {
            self.screenshot_service_url
                .as_deref()
                .map(|service| screenshot_url(service, &target.original))
        } else {
            None
        };

        tracing::info!(
            risk_score = risk.risk_score,
            threats = risk.threats.len(),
            "URL scan complete"
        );

        UrlScanResponse {
            url: target.original.clone(),
            is_safe: risk.is_safe,
            risk_score: risk.risk_score,
            threats: risk.threats,
            screenshot,
            ssl,
            phishing,
            scan_sources,
            scanned_at: Utc::now(),
        }
    }
}

/// Substitute `{url}` in the service template, or append it as a query parameter
pub fn screenshot_url(service: &str, target: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
    if service.contains("{url}") {
        service.replace("{url}", &encoded)
    } else if service.contains('?') {
        format!("{}&url={}", service, encoded)
    } else {
        format!("{}?url={}", service, encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screenshot_url_templates() {
        assert_eq!(
            screenshot_url("https://shots.example/render", "https://a.com/x?y=1"),
            "https://shots.example/render?url=https%3A%2F%2Fa.com%2Fx%3Fy%3D1"
        );
        assert_eq!(
            screenshot_url("https://shots.example/render?w=1280", "http://a.com"),
            "https://shots.example/render?w=1280&url=http%3A%2F%2Fa.com"
        );
        assert_eq!(
            screenshot_url("https://shots.example/{url}/png", "http://a.com"),
            "https://shots.example/http%3A%2F%2Fa.com/png"
        );
    }
}
