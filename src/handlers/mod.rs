// HTTP handlers for the threat monitor API

pub mod health;
pub mod threat_monitor;

use crate::app::AppState;
use axum::{
    routing::{get, post},
    Router,
};

// Threat monitor routes, nested under /api/v1/threat-monitor
pub fn threat_monitor_routes() -> Router<AppState> {
    Router::new()
        .route("/domain-intel", post(threat_monitor::domain_intel))
        .route("/ip-reputation", post(threat_monitor::ip_reputation))
        .route("/url-scan", post(threat_monitor::url_scan))
        .route("/port-scan", post(threat_monitor::port_scan))
        .route("/my-ip", get(threat_monitor::my_ip))
}
