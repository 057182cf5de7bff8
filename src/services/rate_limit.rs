// Daily scan quota
// One allowed call per user per endpoint per server-local calendar day.
// The usage log is append-only and doubles as the limiter's source of truth.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, instrument};

use crate::{
    config::{RateLimitingConfig, ScanEndpoint},
    db::DieselPool,
    models::NewRateLimitRecord,
    schema::rate_limit_records,
};

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug, Error)]
pub enum UsageLogError {
    #[error("Database connection failed: {0}")]
    Pool(String),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
}

// =============================================================================
// DAY WINDOW
// =============================================================================

/// The calendar day containing `now`, in server-local time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayWindow {
    pub now: DateTime<Local>,
    pub start: DateTime<Local>,
    pub reset_at: DateTime<Local>,
}

/// Earliest instant of a local date. Handles zones where midnight is
/// skipped or repeated by a DST transition.
fn local_day_start(date: NaiveDate) -> Option<DateTime<Local>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Local.from_local_datetime(&midnight).earliest().or_else(|| {
        // Midnight fell in a DST gap; the day starts an hour later
        let one_am = date.and_hms_opt(1, 0, 0)?;
        Local.from_local_datetime(&one_am).earliest()
    })
}

impl DayWindow {
    pub fn containing(now: DateTime<Local>) -> Self {
        let today = now.date_naive();
        let start = local_day_start(today).unwrap_or(now);
        let reset_at = today
            .succ_opt()
            .and_then(local_day_start)
            .unwrap_or_else(|| now + Duration::days(1));
        Self {
            now,
            start,
            reset_at,
        }
    }
}

// =============================================================================
// USAGE LOG
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageDecision {
    Consumed,
    AlreadyUsed,
}

/// Narrow repository for the usage log
#[async_trait]
pub trait UsageLog: Send + Sync {
    /// Record a use in `window` unless one already exists
    async fn check_and_consume(
        &self,
        user_id: &str,
        endpoint: &str,
        window: &DayWindow,
    ) -> Result<UsageDecision, UsageLogError>;
}

/// Postgres-backed usage log
#[derive(Clone)]
pub struct DieselUsageLog {
    pool: DieselPool,
}

impl DieselUsageLog {
    pub fn new(pool: DieselPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageLog for DieselUsageLog {
    async fn check_and_consume(
        &self,
        user_id: &str,
        endpoint: &str,
        window: &DayWindow,
    ) -> Result<UsageDecision, UsageLogError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| UsageLogError::Pool(e.to_string()))?;

        let existing: i64 = rate_limit_records::table
            .filter(rate_limit_records::user_id.eq(user_id))
            .filter(rate_limit_records::endpoint.eq(endpoint))
            .filter(rate_limit_records::created_at.ge(window.start.with_timezone(&Utc)))
            .count()
            .get_result(&mut conn)
            .await?;

        if existing > 0 {
            return Ok(UsageDecision::AlreadyUsed);
        }

        // The unique (user_id, endpoint, occurred_on) constraint settles
        // concurrent first calls: the loser inserts nothing
        let inserted = diesel::insert_into(rate_limit_records::table)
            .values(&NewRateLimitRecord::new(user_id, endpoint, window.now))
            .on_conflict((
                rate_limit_records::user_id,
                rate_limit_records::endpoint,
                rate_limit_records::occurred_on,
            ))
            .do_nothing()
            .execute(&mut conn)
            .await?;

        Ok(if inserted == 0 {
            UsageDecision::AlreadyUsed
        } else {
            UsageDecision::Consumed
        })
    }
}

/// In-process usage log for tests and database-less development
#[derive(Default)]
pub struct InMemoryUsageLog {
    entries: Mutex<HashMap<(String, String), Vec<DateTime<Utc>>>>,
}

impl InMemoryUsageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_count(&self, user_id: &str, endpoint: &str) -> usize {
        self.entries
            .lock()
            .await
            .get(&(user_id.to_string(), endpoint.to_string()))
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl UsageLog for InMemoryUsageLog {
    async fn check_and_consume(
        &self,
        user_id: &str,
        endpoint: &str,
        window: &DayWindow,
    ) -> Result<UsageDecision, UsageLogError> {
        let start = window.start.with_timezone(&Utc);
        let mut entries = self.entries.lock().await;
        let uses = entries
            .entry((user_id.to_string(), endpoint.to_string()))
            .or_default();

        if uses.iter().any(|at| *at >= start) {
            return Ok(UsageDecision::AlreadyUsed);
        }
        uses.push(window.now.with_timezone(&Utc));
        Ok(UsageDecision::Consumed)
    }
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateLimitDecision {
    Allowed,
    Denied { reset_at: DateTime<Local> },
}

pub struct DailyRateLimiter {
    log: Arc<dyn UsageLog>,
    config: RateLimitingConfig,
}

impl DailyRateLimiter {
    pub fn new(log: Arc<dyn UsageLog>, config: RateLimitingConfig) -> Self {
        Self { log, config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub async fn check_and_consume(&self, user_id: &str, endpoint: ScanEndpoint) -> RateLimitDecision {
        self.check_and_consume_at(user_id, endpoint, Local::now()).await
    }

    /// Store errors fail open: the call is Allowed and the error logged
    #[instrument(skip(self, now), fields(endpoint = %endpoint))]
    pub async fn check_and_consume_at(
        &self,
        user_id: &str,
        endpoint: ScanEndpoint,
        now: DateTime<Local>,
    ) -> RateLimitDecision {
        if !self.config.enabled {
            return RateLimitDecision::Allowed;
        }

        let window = DayWindow::containing(now);
        match self
            .log
            .check_and_consume(user_id, endpoint.as_str(), &window)
            .await
        {
            Ok(UsageDecision::Consumed) => RateLimitDecision::Allowed,
            Ok(UsageDecision::AlreadyUsed) => {
                info!(user_id, reset_at = %window.reset_at, "Daily scan quota already used");
                RateLimitDecision::Denied {
                    reset_at: window.reset_at,
                }
            },
            Err(e) => {
                error!(user_id, error = %e, "Usage log unavailable, allowing request");
                RateLimitDecision::Allowed
            },
        }
    }
}
