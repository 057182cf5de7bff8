// Caller IP detection for the my-ip endpoint

use axum::http::HeaderMap;
use chrono::Utc;
use std::net::{IpAddr, SocketAddr};

use crate::models::MyIpResponse;

/// Proxy headers first, then the socket peer
pub fn detect_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or(real_ip)
        .map(String::from)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

pub fn build_my_ip_response(ip: Option<String>) -> MyIpResponse {
    let ip = ip.unwrap_or_else(|| "unknown".to_string());
    let parsed = ip.parse::<IpAddr>().ok();

    let ip_type = match parsed {
        Some(IpAddr::V4(_)) => "IPv4",
        Some(IpAddr::V6(_)) => "IPv6",
        None => "unknown",
    };

    let is_localhost = match parsed {
        Some(IpAddr::V6(v6)) => {
            v6.is_loopback() || v6.to_ipv4_mapped().is_some_and(|v4| v4.is_loopback())
        },
        Some(addr) => addr.is_loopback(),
        None => ip.eq_ignore_ascii_case("localhost"),
    };

    let display_message = if is_localhost {
        "You are connecting from localhost. Deploy behind a public address to see your external IP."
            .to_string()
    } else if parsed.is_none() {
        "Your IP address could not be determined.".to_string()
    } else {
        format!("Your public {} address is {}", ip_type, ip)
    };

    MyIpResponse {
        ip,
        ip_type: ip_type.to_string(),
        is_localhost,
        display_message,
        timestamp: Utc::now(),
    }
}
