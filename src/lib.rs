// Library exports for the threat monitor backend
// This file exposes modules and the router/state builders for the binary and tests

pub mod app;
pub mod app_config;
pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use app::AppState;
pub use app_config::AppConfig;
pub use config::{RateLimitingConfig, ScanEndpoint};
pub use db::DieselPool;
pub use middleware::AuthenticatedUser;
pub use services::{DailyRateLimiter, ThreatIntelServices};
pub use utils::ThreatMonitorError;

use axum::{
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::{any::Any, sync::Arc};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::services::{DieselUsageLog, InMemoryUsageLog, JwtIdentityResolver, UsageLog};

/// Assemble the HTTP surface.
///
/// Everything under `/api/v1/threat-monitor` requires an identity; CORS
/// wraps all routes so preflights never reach the identity check.
pub fn build_router(state: AppState) -> Router {
    let threat_monitor = handlers::threat_monitor_routes().route_layer(from_fn_with_state(
        state.clone(),
        middleware::require_identity,
    ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/health", get(handlers::health::health_check))
        .nest("/api/v1/threat-monitor", threat_monitor)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::dynamic_cors_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A panicking handler becomes the generic 500 envelope; the panic message
/// is only logged
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "handler panicked".to_string()
    };
    ThreatMonitorError::Internal(detail).into_response()
}

/// Build the shared state from configuration: usage log backend, scanners,
/// identity verification and the daily limiter
pub async fn initialize_app_state(
    config: AppConfig,
) -> Result<AppState, Box<dyn std::error::Error + Send + Sync>> {
    let diesel_pool = match db::DieselDatabaseConfig::from_config(&config.database) {
        Some(db_config) => {
            info!("Initializing database pool...");
            let database_url = db_config.url.clone();
            let pool = db::create_diesel_pool(db_config).await?;

            if migrations::should_run_migrations(&config.database) {
                info!("Running embedded migrations...");
                migrations::run_all_migrations(&database_url)
                    .await
                    .map_err(|e| format!("Migration failed: {}", e))?;
            }
            Some(pool)
        },
        None => {
            warn!("DATABASE_URL not set; scan quotas are kept in memory and reset on restart");
            None
        },
    };

    let usage_log: Arc<dyn UsageLog> = match &diesel_pool {
        Some(pool) => Arc::new(DieselUsageLog::new(pool.clone())),
        None => Arc::new(InMemoryUsageLog::new()),
    };

    let rate_limiter = Arc::new(DailyRateLimiter::new(
        usage_log,
        RateLimitingConfig::from_app_config(&config),
    ));
    if !rate_limiter.is_enabled() {
        warn!("Daily scan quotas are disabled");
    }

    let threat_intel = Arc::new(ThreatIntelServices::from_config(&config.threat_intel)?);
    let identity = Arc::new(JwtIdentityResolver::new(&config.security));

    Ok(AppState {
        config: Arc::new(config),
        threat_intel,
        rate_limiter,
        identity,
        diesel_pool,
    })
}
