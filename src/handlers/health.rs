// Health check: usage log backend and scanner availability

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::{app::AppState, db};

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let mut overall_healthy = true;
    let timestamp = chrono::Utc::now().to_rfc3339();

    let usage_log = match &state.diesel_pool {
        Some(pool) => match db::check_diesel_health(pool).await {
            Ok(_) => json!({
                "backend": "postgresql",
                "status": "healthy",
                "max_connections": state.config.database.max_connections,
                "error": null
            }),
            Err(e) => {
                overall_healthy = false;
                json!({
                    "backend": "postgresql",
                    "status": "unhealthy",
                    "error": format!("Database connection failed: {}", e)
                })
            },
        },
        None => json!({
            "backend": "in-memory",
            "status": "healthy",
            "error": null
        }),
    };

    let response = json!({
        "status": if overall_healthy { "healthy" } else { "degraded" },
        "service": "threat-monitor-core",
        "environment": state.config.server.environment.to_string(),
        "timestamp": timestamp,
        "components": {
            "usage_log": usage_log,
            "rate_limiting": state.rate_limiter.is_enabled(),
            "scanners": state.threat_intel.availability()
        }
    });

    if overall_healthy {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
