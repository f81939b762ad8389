use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;

/// Connection settings for the PostgreSQL stores.
#[derive(Debug, Clone)]
pub struct DbSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DbSettings {
    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
    }
}

pub async fn connect_pool(settings: &DbSettings) -> Result<PgPool, sqlx::Error> {
    let pool = settings.pool_options().connect(&settings.url).await?;
    info!(
        max_connections = settings.max_connections,
        acquire_timeout_ms = settings.acquire_timeout.as_millis(),
        "database pool ready"
    );
    Ok(pool)
}

// Games and users tables; applied on every startup.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
    MIGRATOR.run(pool).await
}
