pub mod auth;
pub mod rate_limit_record;
pub mod threat_monitor;

// Re-export common types
pub use auth::IdentityClaims;
pub use rate_limit_record::{NewRateLimitRecord, RateLimitRecord};
pub use threat_monitor::*;
