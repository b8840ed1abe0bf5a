//! SQLite connection pool and schema setup.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, instrument};

use crate::config::DatabaseConfig;
use crate::store::StoreError;
use crate::store::sqlite::map_sqlx_error;

/// The full schema (donors, inventory, blood requests, outreach).
///
/// ```sql
#[doc = include_str!("../sql/schema.sql")]
/// ```
pub const SCHEMA: &str = include_str!("../sql/schema.sql");

/// How long a writer waits for another connection's write lock.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a pool for `config`, creating the database file if it is missing.
///
/// Foreign keys are enforced on every connection so deleting a donor or a
/// blood request cascades to its outreach records. File databases run in WAL
/// mode so readers do not block the single writer.
#[instrument(skip(config), fields(url = %config.url), err)]
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| map_sqlx_error("parse_database_url", e))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    let mut pool_options =
        SqlitePoolOptions::new().max_connections(config.effective_max_connections());

    let options = if config.is_memory() {
        // Dropping the only connection would drop the whole database.
        pool_options = pool_options
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
        options
    } else {
        options.journal_mode(SqliteJournalMode::Wal)
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(|e| map_sqlx_error("connect", e))?;

    debug!(
        max_connections = config.effective_max_connections(),
        "database pool ready"
    );
    Ok(pool)
}

/// Create all tables and indexes. Safe to run repeatedly.
#[instrument(skip(pool), err)]
pub async fn migrate(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("migrate", e))?;
    Ok(())
}
