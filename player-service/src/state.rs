//! Application state management

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::{
    config::Config,
    database,
    error::Result,
    repository::{GameRepository, PlayerRepository, ScoreRepository},
};

/// Application state shared across handlers
///
/// Cloning is cheap: the config sits behind an `Arc` and `SqlitePool` is
/// reference counted internally.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    db: SqlitePool,
}

impl AppState {
    /// Create state from a config and an already-open pool
    pub fn new(config: Config, db: SqlitePool) -> Self {
        Self {
            config: Arc::new(config),
            db,
        }
    }

    /// Create a new builder for AppState
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.db
    }

    pub fn players(&self) -> PlayerRepository {
        PlayerRepository::new(self.db.clone())
    }

    pub fn games(&self) -> GameRepository {
        GameRepository::new(self.db.clone())
    }

    pub fn scores(&self) -> ScoreRepository {
        ScoreRepository::new(self.db.clone())
    }
}

/// Builder for AppState
///
/// Opens the pool from `config.database` unless one is supplied.
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<Config>,
    db: Option<SqlitePool>,
}

impl AppStateBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Use an existing pool instead of connecting
    pub fn db(mut self, pool: SqlitePool) -> Self {
        self.db = Some(pool);
        self
    }

    /// Build the AppState, connecting to the database if needed
    pub async fn build(self) -> Result<AppState> {
        let config = self.config.unwrap_or_default();

        let db = match self.db {
            Some(pool) => pool,
            None => database::create_pool(&config.database).await?,
        };

        Ok(AppState::new(config, db))
    }
}
