//! Entity repositories on SQLite
//!
//! # Features
//!
//! - **CRUD**: [`Repository`] for create, list, count, get, partial update and delete
//! - **Relationships**: [`ScoreOwner`] for connecting, disconnecting and
//!   replacing a player's or game's scores
//! - **Structured errors**: every failure is a [`RepositoryError`] naming the
//!   operation and, where known, the entity
//!
//! Every write runs in a single transaction. Lists go through the query
//! pipeline in [`crate::query`].

mod error;
mod games;
mod players;
mod relations;
mod scores;
mod store;
mod traits;

pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation, RepositoryResult};
pub use games::GameRepository;
pub use players::PlayerRepository;
pub use relations::{LinkPlan, Relation, SyncMode, GAME_SCORES, PLAYER_SCORES};
pub use scores::ScoreRepository;
pub use traits::{Repository, ScoreOwner};
