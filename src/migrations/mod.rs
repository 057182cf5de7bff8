// Migration orchestrator
// Embedded in the application binary so the usage log table exists before serving

pub mod diesel;

use std::error::Error;
use tracing::{error, info};

use crate::app_config::DatabaseConfig;

/// Run embedded Diesel migrations against the configured database
pub async fn run_all_migrations(database_url: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("[MIGRATIONS] Running Diesel (PostgreSQL) migrations...");
    match diesel::run_migrations(database_url.to_string()).await {
        Ok(0) => {
            info!("[MIGRATIONS] ✓ Diesel migrations up to date");
            Ok(())
        },
        Ok(applied_count) => {
            info!("[MIGRATIONS] ✓ Applied {} Diesel migrations", applied_count);
            Ok(())
        },
        Err(e) => {
            error!("[MIGRATIONS] ✗ Diesel migration failed: {}", e);
            Err(format!("Diesel migration failed: {}", e).into())
        },
    }
}

/// Migrations run whenever a database is configured, unless explicitly disabled
pub fn should_run_migrations(config: &DatabaseConfig) -> bool {
    config.url.is_some() && !config.disable_embedded_migrations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_run_migrations() {
        let mut config = DatabaseConfig::default();
        assert!(!should_run_migrations(&config));

        config.url = Some("postgresql://localhost/threats".to_string());
        assert!(should_run_migrations(&config));

        config.disable_embedded_migrations = true;
        assert!(!should_run_migrations(&config));
    }
}
