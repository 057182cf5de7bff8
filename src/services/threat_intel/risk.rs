// Risk heuristics
// Pure functions from provider signals to a 0-100 score and verdict; no I/O

use std::collections::BTreeSet;

use crate::{
    models::{PhishingVerdict, SslReport},
    services::providers::AbuseReport,
};

pub const MAX_RISK_SCORE: u8 = 100;

/// Brand keywords that commonly appear in lookalike domains
pub const BRAND_KEYWORDS: [&str; 6] = ["bank", "paypal", "amazon", "microsoft", "google", "apple"];

pub const TYPOSQUATTING_CATEGORY: &str = "Potential Typosquatting";
pub const NEW_DOMAIN_CATEGORY: &str = "Newly Registered Domain";
pub const RECENT_DOMAIN_CATEGORY: &str = "Recently Registered Domain";
pub const DNS_CHURN_CATEGORY: &str = "Frequent DNS Changes";
pub const SUBDOMAIN_SPRAWL_CATEGORY: &str = "Large Subdomain Footprint";

/// IP confidence at or above which an address counts as blacklisted
pub const BLACKLIST_CONFIDENCE: u8 = 75;
/// Highest abuse confidence still considered safe
pub const SAFE_IP_CONFIDENCE: u8 = 25;

fn clamp(score: u32) -> u8 {
    score.min(MAX_RISK_SCORE as u32) as u8
}

// =============================================================================
// DOMAIN
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct DomainSignals<'a> {
    pub domain: &'a str,
    pub domain_age_days: Option<i64>,
    pub dns_history_count: Option<usize>,
    pub subdomain_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomainRisk {
    pub risk_score: u8,
    pub is_malicious: bool,
    pub categories: BTreeSet<String>,
}

/// True when the domain borrows a brand keyword without being `<keyword>.com`
pub fn is_potential_typosquat(domain: &str) -> bool {
    let domain = domain.to_ascii_lowercase();
    BRAND_KEYWORDS
        .iter()
        .any(|keyword| domain.contains(keyword) && !domain.ends_with(&format!("{}.com", keyword)))
}

pub fn domain_risk(signals: &DomainSignals<'_>) -> DomainRisk {
    let mut score: u32 = 0;
    let mut categories = BTreeSet::new();

    match signals.domain_age_days {
        Some(age) if age < 30 => {
            score += 30;
            categories.insert(NEW_DOMAIN_CATEGORY.to_string());
        },
        Some(age) if age < 90 => {
            score += 15;
            categories.insert(RECENT_DOMAIN_CATEGORY.to_string());
        },
        _ => {},
    }

    if signals.dns_history_count.is_some_and(|count| count > 10) {
        score += 20;
        categories.insert(DNS_CHURN_CATEGORY.to_string());
    }

    if signals.subdomain_count.is_some_and(|count| count > 100) {
        score += 25;
        categories.insert(SUBDOMAIN_SPRAWL_CATEGORY.to_string());
    }

    if is_potential_typosquat(signals.domain) {
        score += 40;
        categories.insert(TYPOSQUATTING_CATEGORY.to_string());
    }

    let risk_score = clamp(score);
    DomainRisk {
        risk_score,
        is_malicious: risk_score > 50,
        categories,
    }
}

// =============================================================================
// IP
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct IpRisk {
    pub risk_score: u8,
    pub is_safe: bool,
    pub blacklisted: bool,
    pub threat_type: Option<String>,
}

/// Score is the abuse confidence as-is. With no abuse data every input
/// defaults to zero, so the verdict falls out of the same formula.
pub fn ip_risk(abuse: Option<&AbuseReport>) -> IpRisk {
    let risk_score = clamp(abuse.map_or(0, |a| a.abuse_confidence_score as u32));
    let whitelisted = abuse.and_then(|a| a.is_whitelisted).unwrap_or(false);
    let blacklisted = risk_score >= BLACKLIST_CONFIDENCE && !whitelisted;
    let malware = abuse
        .and_then(|a| a.usage_type.as_deref())
        .is_some_and(|usage| usage.to_ascii_lowercase().contains("malware"));

    let is_safe = !blacklisted && !malware && risk_score <= SAFE_IP_CONFIDENCE;

    let threat_type = if malware {
        Some("Malware")
    } else if blacklisted {
        Some("Blacklisted")
    } else if risk_score > SAFE_IP_CONFIDENCE {
        Some("Suspicious Activity")
    } else {
        None
    };

    IpRisk {
        risk_score,
        is_safe,
        blacklisted,
        threat_type: threat_type.map(String::from),
    }
}

// =============================================================================
// URL
// =============================================================================

pub const PHISHING_THREAT: &str = "Phishing";
pub const INVALID_SSL_THREAT: &str = "Invalid SSL Certificate";

#[derive(Debug, Clone, PartialEq)]
pub struct UrlRisk {
    pub risk_score: u8,
    pub is_safe: bool,
    pub threats: Vec<String>,
}

/// `ssl` is `None` when the inspection failed; for https URLs that counts
/// the same as an invalid certificate.
pub fn url_risk(
    phishing: Option<&PhishingVerdict>,
    is_https: bool,
    ssl: Option<&SslReport>,
) -> UrlRisk {
    let mut score: u32 = 0;
    let mut threats = Vec::new();

    if phishing.is_some_and(PhishingVerdict::is_confirmed_phish) {
        score += 80;
        threats.push(PHISHING_THREAT.to_string());
    }

    if is_https && !ssl.is_some_and(|report| report.valid) {
        score += 30;
        threats.push(INVALID_SSL_THREAT.to_string());
    }

    let risk_score = clamp(score);
    UrlRisk {
        risk_score,
        is_safe: risk_score < 50,
        threats,
    }
}
