//! # player-service
//!
//! REST data-access service for players, games and scores on SQLite.
//!
//! ## Features
//!
//! - **Dynamic queries**: `where.<field>[.<op>]` filters including nested
//!   relation filters, `sortBy`, `skip` and `take`
//! - **Relationships**: connect, disconnect and replace the scores owned by a
//!   player or game, each in one transaction
//! - **Middleware stack**: JWT auth, request tracking, panic recovery, body size limits
//! - **Health checks**: Liveness and readiness probes
//! - **Graceful shutdown**: Proper signal handling (SIGTERM, SIGINT)
//!
//! ## Example
//!
//! ```rust,no_run
//! use player_service::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config);
//!
//!     let state = AppState::builder().config(config).build().await?;
//!     Server::new(state)?.serve().await
//! }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod health;
pub mod ids;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod query;
pub mod repository;
pub mod server;
pub mod state;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, DatabaseConfig, JwtConfig, MiddlewareConfig, ServiceConfig};
    pub use crate::error::{DatabaseError, DatabaseErrorKind, DatabaseOperation, Error, Result};
    pub use crate::handlers::{api_routes, ApiError, ApiErrorKind};
    pub use crate::health::{health, readiness};
    pub use crate::ids::{IdPrefix, MakeTypedRequestId, RequestId};
    pub use crate::middleware::{Claims, JwtAuth, TokenValidator};
    pub use crate::models::{
        CreateGame, CreatePlayer, CreateScore, EntityRef, Game, Player, Score, UpdateGame,
        UpdatePlayer, UpdateScore,
    };
    pub use crate::observability::{init_tracing, shutdown_tracing};
    pub use crate::query::{FindManyArgs, Query};
    pub use crate::repository::{
        GameRepository, PlayerRepository, Repository, RepositoryError, RepositoryErrorKind,
        RepositoryResult, ScoreOwner, ScoreRepository,
    };
    pub use crate::server::Server;
    pub use crate::state::{AppState, AppStateBuilder};
}
