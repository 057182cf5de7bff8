// Usage log entry for the daily scan quota
// Append-only: rows are created once and never updated or deleted

use chrono::{DateTime, Local, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::rate_limit_records;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = rate_limit_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RateLimitRecord {
    pub id: Uuid,
    pub user_id: String,
    pub endpoint: String,
    pub occurred_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = rate_limit_records)]
pub struct NewRateLimitRecord {
    pub id: Uuid,
    pub user_id: String,
    pub endpoint: String,
    pub occurred_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl NewRateLimitRecord {
    /// `occurred_on` is the server-local calendar day of `now`
    pub fn new(user_id: &str, endpoint: &str, now: DateTime<Local>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            endpoint: endpoint.to_string(),
            occurred_on: now.date_naive(),
            created_at: now.with_timezone(&Utc),
        }
    }
}
