// Common test utilities and helper structs
// Shared across all test files to avoid duplication

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, Response, StatusCode},
    Router,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};
use threat_monitor_core::{
    app::AppState,
    app_config::{
        AppConfig, DatabaseConfig, Environment, FeatureConfig, SecurityConfig, ServerConfig,
        ThreatIntelConfig,
    },
    build_router,
    config::RateLimitingConfig,
    models::{GeoLocation, HistoricalDnsRecord, IdentityClaims, PhishingVerdict, PortStatus, SslReport},
    services::{
        providers::{
            AbuseReport, AbuseSource, DnsHistory, DnsRecordType, DnsSource, DomainDetails,
            DomainHistorySource, GeoSource, PhishingSource, ProviderConfigError, ProviderError,
            RegistrationRecord, SslSource, WhoisSource,
        },
        threat_intel::PortProber,
        DailyRateLimiter, DomainIntelScanner, InMemoryUsageLog, IpReputationScanner,
        JwtIdentityResolver, PortScanner, ThreatIntelServices, UrlScanner,
    },
};
use tower::util::ServiceExt;

pub const TEST_JWT_SECRET: &str = "test-secret-key-that-is-at-least-32-characters-long";
pub const TEST_ORIGIN: &str = "http://localhost:3000";

/// How the stub providers behave for a test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    /// Every provider answers with canned data
    Healthy,
    /// Every provider fails
    Outage,
    /// Only the certificate provider fails
    SslOutage,
}

fn outage(provider: &'static str) -> ProviderError {
    ProviderError::Rejected {
        provider,
        message: "upstream unavailable".to_string(),
    }
}

/// Domain registered 10 days ago with 15 historical A-record changes
pub struct StubDomainHistory(pub ProviderMode);

#[async_trait]
impl DomainHistorySource for StubDomainHistory {
    fn name(&self) -> &'static str {
        "securitytrails"
    }

    async fn domain_details(&self, domain: &str) -> Result<DomainDetails, ProviderError> {
        if self.0 == ProviderMode::Outage {
            return Err(outage(self.name()));
        }
        Ok(DomainDetails {
            hostname: domain.to_string(),
            subdomain_count: Some(3),
            alexa_rank: None,
            current_a_records: vec!["203.0.113.10".to_string()],
            current_name_servers: vec!["ns1.example-dns.net".to_string()],
        })
    }

    async fn domain_whois(&self, _domain: &str) -> Result<RegistrationRecord, ProviderError> {
        if self.0 == ProviderMode::Outage {
            return Err(outage(self.name()));
        }
        Ok(RegistrationRecord {
            registrar: Some("Example Registrar, Inc.".to_string()),
            created_date: Some(Utc::now() - ChronoDuration::days(10)),
            ..Default::default()
        })
    }

    async fn dns_history(&self, _domain: &str) -> Result<DnsHistory, ProviderError> {
        if self.0 == ProviderMode::Outage {
            return Err(outage(self.name()));
        }
        let records = (0..15)
            .map(|i| HistoricalDnsRecord {
                values: vec![format!("198.51.100.{}", i + 1)],
                organizations: vec!["Example Hosting".to_string()],
                first_seen: Some("2025-01-01".to_string()),
                last_seen: Some("2025-01-02".to_string()),
            })
            .collect();
        Ok(DnsHistory { records })
    }
}

/// Registration lookup that always fails, so the history provider's record is used
pub struct StubWhois(pub ProviderMode);

#[async_trait]
impl WhoisSource for StubWhois {
    fn name(&self) -> &'static str {
        "rdap"
    }

    async fn lookup(&self, _domain: &str) -> Result<RegistrationRecord, ProviderError> {
        match self.0 {
            ProviderMode::Outage => Err(outage(self.name())),
            _ => Ok(RegistrationRecord::default()),
        }
    }
}

pub struct StubDns(pub ProviderMode);

#[async_trait]
impl DnsSource for StubDns {
    fn name(&self) -> &'static str {
        "doh"
    }

    async fn resolve(
        &self,
        _domain: &str,
        record_type: DnsRecordType,
    ) -> Result<Vec<String>, ProviderError> {
        if self.0 == ProviderMode::Outage {
            return Err(outage(self.name()));
        }
        Ok(match record_type {
            DnsRecordType::A => vec!["203.0.113.10".to_string()],
            DnsRecordType::Ns => vec!["ns1.example-dns.net.".to_string()],
            _ => Vec::new(),
        })
    }
}

pub struct StubAbuse(pub ProviderMode);

#[async_trait]
impl AbuseSource for StubAbuse {
    fn name(&self) -> &'static str {
        "abuseipdb"
    }

    async fn check_ip(&self, ip: &str) -> Result<AbuseReport, ProviderError> {
        if self.0 == ProviderMode::Outage {
            return Err(outage(self.name()));
        }
        Ok(AbuseReport {
            ip_address: ip.to_string(),
            abuse_confidence_score: 0,
            is_whitelisted: Some(true),
            country_code: Some("US".to_string()),
            usage_type: Some("Content Delivery Network".to_string()),
            isp: Some("Google LLC".to_string()),
            domain: Some("google.com".to_string()),
            total_reports: 0,
            last_reported_at: None,
        })
    }
}

pub struct StubGeo(pub ProviderMode);

#[async_trait]
impl GeoSource for StubGeo {
    fn name(&self) -> &'static str {
        "ip-api"
    }

    async fn locate(&self, _ip: &str) -> Result<GeoLocation, ProviderError> {
        if self.0 == ProviderMode::Outage {
            return Err(outage(self.name()));
        }
        Ok(GeoLocation {
            country: Some("United States".to_string()),
            country_code: Some("US".to_string()),
            city: Some("Mountain View".to_string()),
            ..Default::default()
        })
    }
}

pub struct StubPhishing(pub ProviderMode);

#[async_trait]
impl PhishingSource for StubPhishing {
    fn name(&self) -> &'static str {
        "phishtank"
    }

    async fn lookup_url(&self, _url: &str) -> Result<PhishingVerdict, ProviderError> {
        match self.0 {
            ProviderMode::Outage => Err(outage(self.name())),
            _ => Ok(PhishingVerdict::default()),
        }
    }
}

pub struct StubSsl(pub ProviderMode);

#[async_trait]
impl SslSource for StubSsl {
    fn name(&self) -> &'static str {
        "ssllabs"
    }

    async fn inspect(&self, _host: &str) -> Result<SslReport, ProviderError> {
        if matches!(self.0, ProviderMode::Outage | ProviderMode::SslOutage) {
            return Err(outage(self.name()));
        }
        Ok(SslReport {
            valid: true,
            grade: Some("A".to_string()),
            issuer: Some("Let's Encrypt".to_string()),
            expires_at: Some(Utc::now() + ChronoDuration::days(60)),
            days_until_expiry: Some(60),
            synthesized: false,
        })
    }
}

/// Instant prober: port 443 open, everything else closed
pub struct StubProber;

#[async_trait]
impl PortProber for StubProber {
    fn is_simulated(&self) -> bool {
        false
    }

    async fn probe(&self, _addr: IpAddr, port: u16) -> PortStatus {
        if port == 443 {
            PortStatus::Open
        } else {
            PortStatus::Closed
        }
    }
}

/// Port checker with a bug: it panics instead of answering
pub struct PanickingPortCheck;

#[async_trait]
impl PortProber for PanickingPortCheck {
    fn is_simulated(&self) -> bool {
        false
    }

    async fn probe(&self, _addr: IpAddr, port: u16) -> PortStatus {
        panic!("port check exploded on {}", port)
    }
}

/// Knobs for building a test application
#[derive(Debug, Clone)]
pub struct TestAppOptions {
    pub environment: Environment,
    pub providers: ProviderMode,
    pub rate_limiting: bool,
    pub missing_domain_credential: bool,
    pub missing_ip_credential: bool,
    pub panicking_port_checks: bool,
}

impl Default for TestAppOptions {
    fn default() -> Self {
        Self {
            environment: Environment::Test,
            providers: ProviderMode::Healthy,
            rate_limiting: true,
            missing_domain_credential: false,
            missing_ip_credential: false,
            panicking_port_checks: false,
        }
    }
}

/// Test application wrapper
pub struct TestApp {
    pub app: Router,
    pub usage_log: Arc<InMemoryUsageLog>,
}

impl TestApp {
    /// Send a POST request
    pub fn post(&self, uri: &str) -> TestRequest<'_> {
        TestRequest::new(self, "POST", uri)
    }

    /// Send a GET request
    pub fn get(&self, uri: &str) -> TestRequest<'_> {
        TestRequest::new(self, "GET", uri)
    }

    /// Send an OPTIONS request
    pub fn options(&self, uri: &str) -> TestRequest<'_> {
        TestRequest::new(self, "OPTIONS", uri)
    }
}

/// Test request builder
pub struct TestRequest<'a> {
    app: &'a TestApp,
    builder: axum::http::request::Builder,
    body: Body,
    peer: SocketAddr,
}

impl<'a> TestRequest<'a> {
    fn new(app: &'a TestApp, method: &str, uri: &str) -> Self {
        Self {
            app,
            builder: Request::builder().method(method).uri(uri),
            body: Body::empty(),
            peer: "203.0.113.50:40000".parse().unwrap(),
        }
    }

    /// Add JSON body to request
    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        self.builder = self.builder.header("content-type", "application/json");
        self.body = Body::from(serde_json::to_vec(body).unwrap());
        self
    }

    /// Raw body with a JSON content type
    pub fn raw_json(mut self, body: &str) -> Self {
        self.builder = self.builder.header("content-type", "application/json");
        self.body = Body::from(body.to_string());
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Authenticate as `user_id` with a freshly minted bearer token
    pub fn as_user(self, user_id: &str) -> Self {
        let token = mint_token(user_id, 3600);
        self.header("authorization", &format!("Bearer {}", token))
    }

    /// Set the socket peer address seen by the server
    pub fn with_peer(mut self, peer: &str) -> Self {
        self.peer = peer.parse().unwrap();
        self
    }

    /// Send the request
    pub async fn send(self) -> TestResponse {
        let mut request = self.builder.body(self.body).unwrap();
        request.extensions_mut().insert(ConnectInfo(self.peer));

        let response = self.app.app.clone().oneshot(request).await.unwrap();
        TestResponse { response }
    }
}

/// Test response wrapper
pub struct TestResponse {
    response: Response<Body>,
}

impl TestResponse {
    /// Get status code
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    }

    /// Parse JSON response
    pub async fn json<T: serde::de::DeserializeOwned>(self) -> T {
        let body = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    /// Get response body as text
    pub async fn text(self) -> String {
        let body = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }
}

/// Sign an identity token the way the external auth provider would
pub fn mint_token(user_id: &str, expires_in_secs: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = IdentityClaims {
        sub: user_id.to_string(),
        exp: (now + expires_in_secs).max(0) as u64,
        iat: Some(now as u64),
        email: Some(format!("{}@example.com", user_id)),
        aud: None,
        iss: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

/// Unique user id so tests never share quota
pub fn unique_user() -> String {
    format!("user-{}", uuid::Uuid::new_v4().simple())
}

pub fn test_config(options: &TestAppOptions) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            port: 0,
            environment: options.environment.clone(),
            rust_log: "threat_monitor_core=debug".to_string(),
        },
        database: DatabaseConfig::default(),
        security: SecurityConfig {
            jwt_secret: TEST_JWT_SECRET.to_string(),
            jwt_audience: None,
            jwt_issuer: None,
            session_cookie_name: "session-token".to_string(),
            cors_allowed_origins: vec![TEST_ORIGIN.to_string()],
            cors_primary_origin: TEST_ORIGIN.to_string(),
        },
        threat_intel: ThreatIntelConfig::default(),
        features: FeatureConfig {
            enable_rate_limiting: options.rate_limiting,
        },
    }
}

fn stub_services(options: &TestAppOptions) -> ThreatIntelServices {
    let mode = options.providers;
    let timeout = Duration::from_secs(2);

    let domain_intel = if options.missing_domain_credential {
        Err(ProviderConfigError::MissingCredential {
            provider: "securitytrails",
            env_var: "SECURITYTRAILS_API_KEY",
        })
    } else {
        Ok(DomainIntelScanner::new(
            Arc::new(StubDomainHistory(mode)),
            Arc::new(StubWhois(mode)),
            Arc::new(StubDns(mode)),
            timeout,
        ))
    };

    let ip_reputation = if options.missing_ip_credential {
        Err(ProviderConfigError::MissingCredential {
            provider: "abuseipdb",
            env_var: "ABUSEIPDB_API_KEY",
        })
    } else {
        Ok(IpReputationScanner::new(
            Arc::new(StubAbuse(mode)),
            Arc::new(StubGeo(mode)),
            timeout,
        ))
    };

    let prober: Arc<dyn PortProber> = if options.panicking_port_checks {
        Arc::new(PanickingPortCheck)
    } else {
        Arc::new(StubProber)
    };

    ThreatIntelServices::new(
        domain_intel,
        ip_reputation,
        UrlScanner::new(
            Arc::new(StubPhishing(mode)),
            Arc::new(StubSsl(mode)),
            Some("https://shots.example.com/render?url={url}".to_string()),
            timeout,
        ),
        PortScanner::new(prober),
    )
}

/// Setup test application with stub providers and an in-memory usage log
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(TestAppOptions::default()).await
}

pub async fn setup_test_app_with(options: TestAppOptions) -> TestApp {
    let config = test_config(&options);
    let usage_log = Arc::new(InMemoryUsageLog::new());

    let state = AppState {
        rate_limiter: Arc::new(DailyRateLimiter::new(
            usage_log.clone(),
            RateLimitingConfig::from_app_config(&config),
        )),
        threat_intel: Arc::new(stub_services(&options)),
        identity: Arc::new(JwtIdentityResolver::new(&config.security)),
        config: Arc::new(config),
        diesel_pool: None,
    };

    TestApp {
        app: build_router(state),
        usage_log,
    }
}
