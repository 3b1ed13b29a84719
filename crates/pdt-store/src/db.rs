//! Connection pool construction and migrations.

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use pdt_config::DatabaseSettings;

use crate::error::StoreError;

/// Build the shared connection pool from settings.
///
/// # Errors
/// Returns an error if the database is unreachable.
pub async fn connect(settings: &DatabaseSettings) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .max_lifetime(Duration::from_secs(settings.max_lifetime_secs))
        .test_before_acquire(settings.test_before_acquire)
        .connect(settings.url.expose_secret())
        .await?;

    info!(
        url = %settings.url_masked(),
        max_connections = settings.max_connections,
        "Database pool created"
    );

    Ok(pool)
}

/// Apply pending migrations.
///
/// # Errors
/// Returns an error if a migration fails; a schema mismatch is fatal for
/// every job.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Internal(anyhow::anyhow!("migration failed: {e}")))?;
    Ok(())
}
