// Threat monitor handlers
// Check order: identity (middleware) -> provider configuration -> input -> daily quota -> scan

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::Request,
    Json,
};
use std::net::SocketAddr;
use validator::Validate;

use crate::{
    app::AppState,
    config::ScanEndpoint,
    middleware::AuthenticatedUser,
    models::{
        DomainIntelRequest, DomainIntelResponse, IpReputationRequest, IpReputationResponse,
        MyIpResponse, PortScanRequest, PortScanResponse, UrlScanRequest, UrlScanResponse,
    },
    services::{threat_intel::resolve_host, RateLimitDecision},
    utils::{
        build_my_ip_response, detect_client_ip, normalize_domain, validate_host, validate_ipv4,
        validate_ports, validate_url, ThreatMonitorError,
    },
};

type ThreatResult<T> = Result<Json<T>, ThreatMonitorError>;

/// Malformed or missing JSON bodies are validation failures, not 422s
fn parse_body<T: Validate>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ThreatMonitorError> {
    let Json(request) = payload.map_err(|rejection| {
        ThreatMonitorError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    })?;
    request.validate()?;
    Ok(request)
}

async fn consume_daily_quota(
    state: &AppState,
    user: &AuthenticatedUser,
    endpoint: ScanEndpoint,
) -> Result<(), ThreatMonitorError> {
    match state
        .rate_limiter
        .check_and_consume(&user.user_id, endpoint)
        .await
    {
        RateLimitDecision::Allowed => Ok(()),
        RateLimitDecision::Denied { reset_at } => {
            Err(ThreatMonitorError::RateLimited { endpoint, reset_at })
        },
    }
}

/// POST /threat-monitor/domain-intel
pub async fn domain_intel(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<DomainIntelRequest>, JsonRejection>,
) -> ThreatResult<DomainIntelResponse> {
    let scanner = state.threat_intel.domain_intel()?;
    let request = parse_body(payload)?;
    let domain = normalize_domain(&request.domain)?;

    consume_daily_quota(&state, &user, ScanEndpoint::DomainIntel).await?;
    tracing::info!(user_id = %user.user_id, domain = %domain, "Domain intelligence requested");

    Ok(Json(scanner.scan(&domain).await))
}

/// POST /threat-monitor/ip-reputation
pub async fn ip_reputation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<IpReputationRequest>, JsonRejection>,
) -> ThreatResult<IpReputationResponse> {
    let scanner = state.threat_intel.ip_reputation()?;
    let request = parse_body(payload)?;

    // Localhost remapping is a development convenience and never applies elsewhere
    let substitute = state
        .config
        .is_development()
        .then(|| state.config.threat_intel.dev_localhost_substitute_ip.as_str());
    let ip = validate_ipv4(&request.ip, substitute)?;

    consume_daily_quota(&state, &user, ScanEndpoint::IpReputation).await?;
    tracing::info!(user_id = %user.user_id, ip = %ip, "IP reputation requested");

    Ok(Json(scanner.scan(&ip).await))
}

/// POST /threat-monitor/url-scan
pub async fn url_scan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<UrlScanRequest>, JsonRejection>,
) -> ThreatResult<UrlScanResponse> {
    let request = parse_body(payload)?;
    let target = validate_url(&request.url)?;

    consume_daily_quota(&state, &user, ScanEndpoint::UrlScan).await?;
    tracing::info!(user_id = %user.user_id, url = %target.original, "URL scan requested");

    let capture_screenshot = request.capture_screenshot.unwrap_or(false);
    Ok(Json(
        state
            .threat_intel
            .url_scan()
            .scan(&target, capture_screenshot)
            .await,
    ))
}

/// POST /threat-monitor/port-scan
pub async fn port_scan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<PortScanRequest>, JsonRejection>,
) -> ThreatResult<PortScanResponse> {
    let request = parse_body(payload)?;
    let host = validate_host(&request.host)?;
    let ports = validate_ports(&request.ports)?;
    let addr = resolve_host(&host).await?;

    consume_daily_quota(&state, &user, ScanEndpoint::PortScan).await?;
    tracing::info!(user_id = %user.user_id, host = %host, %addr, ports = ports.len(), "Port scan requested");

    Ok(Json(
        state
            .threat_intel
            .port_scan()
            .scan(&host, addr, &ports)
            .await,
    ))
}

/// GET /threat-monitor/my-ip
///
/// Not metered: it makes no upstream calls.
pub async fn my_ip(_user: AuthenticatedUser, request: Request<Body>) -> Json<MyIpResponse> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    Json(build_my_ip_response(detect_client_ip(
        request.headers(),
        peer,
    )))
}
