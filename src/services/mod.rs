// Services module for the threat monitor
// Provider clients, scan orchestration, the daily quota and identity resolution

pub mod identity;
pub mod providers;
pub mod rate_limit;
pub mod threat_intel;

// Re-export commonly used services
pub use identity::{IdentityError, IdentityResolver, JwtIdentityResolver};
pub use providers::{ProviderConfigError, ProviderError};
pub use rate_limit::{
    DailyRateLimiter, DayWindow, DieselUsageLog, InMemoryUsageLog, RateLimitDecision,
    UsageDecision, UsageLog, UsageLogError,
};
pub use threat_intel::{
    DomainIntelScanner, IpReputationScanner, PortScanner, ScannerAvailability,
    ThreatIntelServices, UrlScanner,
};
