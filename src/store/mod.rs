//! Status record store (SQLite via sqlx)

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

pub mod signals;
pub mod status_store;

pub use signals::RecordSignals;
pub use status_store::StatusStore;

/// Initialize the SQLite connection pool, creating the file if needed
pub async fn init_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Single-connection in-memory pool; the database lives as long as the pool
pub async fn init_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
}

/// Create the schema if it is missing
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            user_id             INTEGER PRIMARY KEY AUTOINCREMENT,
            lastname            VARCHAR(100) NOT NULL,
            confirmation_number VARCHAR(100) NOT NULL,
            birth_year          VARCHAR(100) NOT NULL,
            captcha_image       BLOB,
            captcha_result      VARCHAR(100),
            check_result        VARCHAR(16),
            last_update         TIMESTAMP,
            screenshot          BLOB
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
