//! PostgreSQL bootstrap for the rental store.
//!
//! `migrations/` is embedded at compile time. It creates the status enums
//! (roles, approval, booking, payment, dispute), the item stock bounds
//! constraint `0 <= available_stock <= stock`, and the partial unique index
//! that allows one non-failed payment per booking.

use sqlx::migrate::MigrateError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::Config;
use crate::store::PgStore;

const IDLE_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("failed to apply migrations: {0}")]
    Migrate(#[from] MigrateError),
}

/// Pool sizing and timeouts taken from [`Config`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl PoolSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_connections: config.db_max_connections.max(1),
            acquire_timeout: Duration::from_secs(config.db_acquire_timeout_seconds.max(1)),
            idle_timeout: IDLE_TIMEOUT,
        }
    }

    fn options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
    }
}

/// Connect, bring the schema up to date and hand back a ready store.
pub async fn open_store(config: &Config) -> Result<PgStore, DbError> {
    let settings = PoolSettings::from_config(config);
    tracing::info!(
        url = %config.database_url_masked(),
        max_connections = settings.max_connections,
        acquire_timeout_secs = settings.acquire_timeout.as_secs(),
        "Connecting to database"
    );

    let pool = settings
        .options()
        .connect(&config.database_url)
        .await
        .map_err(DbError::Connect)?;

    migrate(&pool).await?;
    Ok(PgStore::new(pool))
}

pub async fn migrate(pool: &PgPool) -> Result<(), DbError> {
    let migrator = sqlx::migrate!("./migrations");
    tracing::info!(count = migrator.iter().count(), "Applying migrations");
    migrator.run(pool).await?;
    Ok(())
}

/// Round trip used by the health endpoint.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, GatewayKind};

    fn config(max_connections: u32, acquire_timeout_seconds: u64) -> Config {
        Config {
            database_url: "postgresql://rental:pw@localhost/rental".to_string(),
            environment: Environment::Development,
            port: 3001,
            db_max_connections: max_connections,
            db_acquire_timeout_seconds: acquire_timeout_seconds,
            cors_allowed_origins: None,
            log_level: "info".to_string(),
            jwt_secret: "secret".to_string(),
            jwt_access_token_ttl_seconds: 3600,
            payment_provider: GatewayKind::Mock,
            midtrans_server_key: None,
            midtrans_base_url: "https://api.sandbox.midtrans.com".to_string(),
            sendgrid_api_key: None,
            email_from: "no-reply@example.com".to_string(),
            notify_queue_capacity: 16,
            notify_max_retries: 1,
        }
    }

    #[test]
    fn test_pool_settings_follow_config() {
        let settings = PoolSettings::from_config(&config(12, 8));
        assert_eq!(settings.max_connections, 12);
        assert_eq!(settings.acquire_timeout, Duration::from_secs(8));
        assert_eq!(settings.idle_timeout, IDLE_TIMEOUT);
    }

    #[test]
    fn test_pool_settings_never_zero() {
        let settings = PoolSettings::from_config(&config(0, 0));
        assert_eq!(settings.max_connections, 1);
        assert_eq!(settings.acquire_timeout, Duration::from_secs(1));
    }
}
