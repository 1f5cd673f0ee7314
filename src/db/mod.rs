pub mod mock_db;
pub mod postgres_support_report_repository;
pub mod support_report_repository;

use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::info;

use crate::config::Config;

/// Establish a connection pool to the database and verify it.
pub async fn establish_connection(config: &Config) -> Result<PgPool, sqlx::Error> {
    let options =
        PgConnectOptions::from_str(&config.database_url)?.ssl_mode(config.database_ssl_mode);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;

    info!("Successfully connected to the database");
    Ok(pool)
}
