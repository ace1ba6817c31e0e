//! SQLite connection pool and schema

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::error::{sanitize_url, DatabaseError, DatabaseOperation, Error, Result};

/// Tables and indexes, created when missing
///
/// Timestamps are RFC 3339 text in UTC, so they compare and sort lexically.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS players (
    id          TEXT PRIMARY KEY NOT NULL,
    name        TEXT,
    email       TEXT,
    phone       TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS games (
    id          TEXT PRIMARY KEY NOT NULL,
    genre       TEXT,
    title       TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS scores (
    id          TEXT PRIMARY KEY NOT NULL,
    score_value INTEGER CHECK (score_value BETWEEN -999999999 AND 999999999),
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    game_id     TEXT REFERENCES games (id) ON DELETE SET NULL,
    player_id   TEXT REFERENCES players (id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_scores_game_id ON scores (game_id);
CREATE INDEX IF NOT EXISTS idx_scores_player_id ON scores (player_id);
"#;

/// Create the pool, retrying with exponential backoff, and ensure the schema
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    let pool = create_pool_with_retries(config, config.max_retries).await?;
    ensure_schema(&pool).await?;
    Ok(pool)
}

async fn create_pool_with_retries(config: &DatabaseConfig, max_retries: u32) -> Result<SqlitePool> {
    let mut attempt = 0;
    let base_delay = Duration::from_secs(config.retry_delay_secs);

    loop {
        match try_create_pool(config).await {
            Ok(pool) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Database connection established");
                } else {
                    tracing::info!(
                        max = config.max_connections,
                        min = config.min_connections,
                        "Database connection pool created"
                    );
                }
                return Ok(pool);
            }
            Err(e) if !e.is_retriable() || attempt >= max_retries => {
                tracing::error!(attempts = attempt + 1, error = %e, "Failed to connect to database");
                return Err(Error::Database(e));
            }
            Err(e) => {
                attempt += 1;
                let delay = base_delay * 2_u32.pow(attempt.saturating_sub(1));
                tracing::warn!(
                    attempt,
                    error = %e,
                    "Database connection failed, retrying in {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

async fn try_create_pool(config: &DatabaseConfig) -> std::result::Result<SqlitePool, DatabaseError> {
    let url_safe = sanitize_url(&config.url);
    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| DatabaseError::from_sqlx(DatabaseOperation::Connect, e).add_context(url_safe.clone()))?
        .foreign_keys(true)
        .busy_timeout(config.connection_timeout());

    // Each connection to `:memory:` is its own database, so keep exactly one
    // connection alive for the lifetime of the pool.
    let pool_options = if config.is_in_memory() {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
    };
    let options = if config.is_in_memory() {
        options
    } else {
        options.journal_mode(SqliteJournalMode::Wal)
    };

    pool_options
        .acquire_timeout(config.connection_timeout())
        .connect_with(options)
        .await
        .map_err(|e| DatabaseError::from_sqlx(DatabaseOperation::Connect, e).add_context(url_safe))
}

/// Create missing tables and indexes
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::from_sqlx(DatabaseOperation::Schema, e))?;
    tracing::debug!("Database schema ensured");
    Ok(())
}

/// Round-trip a trivial query
pub async fn ping(pool: &SqlitePool) -> std::result::Result<(), DatabaseError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(|e| DatabaseError::from_sqlx(DatabaseOperation::Query, e))
}

/// Fresh in-memory database with the schema applied
pub async fn memory_pool() -> Result<SqlitePool> {
    create_pool(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_retries: 0,
        ..DatabaseConfig::default()
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_pool_has_schema() {
        let pool = memory_pool().await.unwrap();
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(tables, vec!["games", "players", "scores"]);
        ping(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_schema_is_repeatable() {
        let pool = memory_pool().await.unwrap();
        ensure_schema(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_file_database_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("players.db");
        let config = DatabaseConfig {
            url: format!("sqlite://{}?mode=rwc", path.display()),
            max_retries: 0,
            ..DatabaseConfig::default()
        };
        let pool = create_pool(&config).await.unwrap();
        ping(&pool).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_unopenable_file_is_not_retried() {
        let config = DatabaseConfig {
            url: "sqlite:///nonexistent-dir/nested/players.db".to_string(),
            max_retries: 5,
            retry_delay_secs: 60,
            ..DatabaseConfig::default()
        };
        let err = create_pool(&config).await.unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }
}
