//! Database connection and schema

use crate::error::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Open (creating when missing) the database file and ensure the schema
pub async fn connect(path: &Path) -> Result<Pool<Sqlite>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite:{}?mode=rwc", path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Some(Duration::from_secs(60)))
        .connect(&db_url)
        .await?;

    info!("Connected to database: {}", path.display());
    init_schema(&pool).await?;
    Ok(pool)
}

/// Create the `persisted_state` table if it does not exist
pub async fn init_schema(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS persisted_state (
            domain TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (domain, key)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
