// SSL Labs v3 certificate assessment
//
// Assessments take minutes to complete. While one is still running, or when
// SSL Labs sheds load with 503/529, the client answers with a synthesized
// "assume valid for a year" report flagged `synthesized: true`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Deserialize;

use super::{trim_base_url, ProviderError, SslSource};
use crate::{app_config::ThreatIntelConfig, models::SslReport};

const PROVIDER: &str = "ssllabs";
const SYNTHESIZED_EXPIRY_DAYS: i64 = 365;

/// Grades that mean the certificate is not trusted or the config is broken
const FAILING_GRADES: [&str; 3] = ["T", "M", "F"];

pub struct SslLabsClient {
    http: reqwest::Client,
    base_url: String,
}

impl SslLabsClient {
    pub fn new(http: reqwest::Client, config: &ThreatIntelConfig) -> Self {
        Self {
            http,
            base_url: trim_base_url(&config.ssllabs_base_url),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResponse {
    status: String,
    #[serde(default)]
    status_message: Option<String>,
    #[serde(default)]
    endpoints: Vec<Endpoint>,
    #[serde(default)]
    certs: Vec<Cert>,
}

#[derive(Debug, Deserialize)]
struct Endpoint {
    #[serde(default)]
    grade: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Cert {
    #[serde(default)]
    issuer_subject: Option<String>,
    #[serde(default)]
    not_after: Option<i64>,
    #[serde(default)]
    issues: u32,
}

pub fn synthesized_report(now: DateTime<Utc>) -> SslReport {
    SslReport {
        valid: true,
        grade: None,
        issuer: None,
        expires_at: Some(now + Duration::days(SYNTHESIZED_EXPIRY_DAYS)),
        days_until_expiry: Some(SYNTHESIZED_EXPIRY_DAYS),
        synthesized: true,
    }
}

/// Prefer the organisation from a DN like `CN=R3, O=Let's Encrypt, C=US`
fn issuer_name(subject: &str) -> String {
    let component = |prefix: &str| {
        subject
            .split(',')
            .map(str::trim)
            .find_map(|part| part.strip_prefix(prefix))
            .map(String::from)
    };
    component("O=")
        .or_else(|| component("CN="))
        .unwrap_or_else(|| subject.to_string())
}

fn build_report(body: AnalyzeResponse, now: DateTime<Utc>) -> Result<SslReport, ProviderError> {
    if matches!(body.status.as_str(), "DNS" | "IN_PROGRESS") {
        return Ok(synthesized_report(now));
    }
    if body.status != "READY" {
        return Err(ProviderError::Rejected {
            provider: PROVIDER,
            message: body.status_message.unwrap_or(body.status),
        });
    }

    let grade = body.endpoints.iter().find_map(|e| e.grade.clone());
    let leaf = body.certs.first();
    let expires_at = leaf
        .and_then(|c| c.not_after)
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
    let days_until_expiry = expires_at.map(|exp| (exp - now).num_days());

    let grade_ok = grade
        .as_deref()
        .is_some_and(|g| !FAILING_GRADES.contains(&g));
    let not_expired = expires_at.is_some_and(|exp| exp > now);
    let no_issues = leaf.map_or(true, |c| c.issues == 0);

    Ok(SslReport {
        valid: grade_ok && not_expired && no_issues,
        issuer: leaf
            .and_then(|c| c.issuer_subject.as_deref())
            .map(issuer_name),
        grade,
        expires_at,
        days_until_expiry,
        synthesized: false,
    })
}

#[async_trait]
impl SslSource for SslLabsClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn inspect(&self, host: &str) -> Result<SslReport, ProviderError> {
        let response = self
            .http
            .get(format!("{}/analyze", self.base_url))
            .query(&[
                ("host", host),
                ("fromCache", "on"),
                ("maxAge", "24"),
                ("all", "done"),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        let status = response.status().as_u16();
        if status == 503 || status == 529 {
            tracing::debug!(host, status, "SSL Labs overloaded, synthesizing report");
            return Ok(synthesized_report(Utc::now()));
        }
        if !response.status().is_success() {
            return Err(ProviderError::Http {
                provider: PROVIDER,
                status,
            });
        }

        let body: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;
        build_report(body, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> AnalyzeResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_ready_assessment() {
        // Millisecond precision so the day count is exact
        let now = Utc.timestamp_millis_opt(Utc::now().timestamp_millis()).unwrap();
        let not_after = (now + Duration::days(60)).timestamp_millis();
        let report = build_report(
            parse(json!({
                "host": "example.com",
                "status": "READY",
                "endpoints": [{"ipAddress": "93.184.216.34", "grade": "A+"}],
                "certs": [{
                    "subject": "CN=example.com",
                    "issuerSubject": "CN=R3, O=Let's Encrypt, C=US",
                    "notAfter": not_after,
                    "issues": 0
                }]
            })),
            now,
        )
        .unwrap();

        assert!(report.valid);
        assert_eq!(report.grade.as_deref(), Some("A+"));
        assert_eq!(report.issuer.as_deref(), Some("Let's Encrypt"));
        assert_eq!(report.days_until_expiry, Some(60));
        assert!(!report.synthesized);
    }

    #[test]
    fn test_failing_grade_is_invalid() {
        let now = Utc::now();
        let report = build_report(
            parse(json!({
                "status": "READY",
                "endpoints": [{"grade": "T"}],
                "certs": [{"notAfter": (now + Duration::days(10)).timestamp_millis(), "issues": 0}]
            })),
            now,
        )
        .unwrap();
        assert!(!report.valid);
    }

    #[test]
    fn test_in_progress_is_synthesized() {
        let now = Utc::now();
        let report = build_report(parse(json!({"status": "IN_PROGRESS"})), now).unwrap();
        assert!(report.valid);
        assert!(report.synthesized);
        assert_eq!(report.days_until_expiry, Some(365));
    }

    #[test]
    fn test_error_status_is_provider_error() {
        let result = build_report(
            parse(json!({"status": "ERROR", "statusMessage": "Unable to resolve domain name"})),
            Utc::now(),
        );
        assert!(matches!(result, Err(ProviderError::Rejected { .. })));
    }
}
