// Configuration modules for the threat monitor

pub mod rate_limit;

pub use rate_limit::{RateLimitingConfig, ScanEndpoint};
