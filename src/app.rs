// Application state shared across handlers
use std::sync::Arc;

use crate::{
    app_config::AppConfig,
    db::DieselPool,
    services::{DailyRateLimiter, IdentityResolver, ThreatIntelServices},
};

// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub threat_intel: Arc<ThreatIntelServices>,
    pub rate_limiter: Arc<DailyRateLimiter>,
    pub identity: Arc<dyn IdentityResolver>,
    /// None when running on the in-process usage log
    pub diesel_pool: Option<DieselPool>,
}
