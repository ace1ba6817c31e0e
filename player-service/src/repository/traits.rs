//! Repository trait definitions
//!
//! Async methods are written with RPITIT (Return Position Impl Trait In
//! Traits), so no `async_trait` boxing is involved.
//!
//! - [`Repository`]: create, list, count, get, partial update, delete
//! - [`ScoreOwner`]: connect, disconnect, replace and list a parent's scores
//!
//! # Example
//!
//! ```rust,no_run
//! use player_service::models::{CreatePlayer, Player};
//! use player_service::repository::{PlayerRepository, Repository};
//!
//! # async fn demo(pool: sqlx::SqlitePool) -> player_service::repository::RepositoryResult<()> {
//! let players = PlayerRepository::new(pool);
//! let created: Player = players
//!     .create(CreatePlayer {
//!         name: Some("Alice".into()),
//!         ..CreatePlayer::default()
//!     })
//!     .await?;
//! let fetched = players.find_one(&created.id).await?;
//! assert_eq!(fetched.name.as_deref(), Some("Alice"));
//! # Ok(())
//! # }
//! ```

use sqlx::SqlitePool;
use std::future::Future;

use super::error::{RepositoryError, RepositoryOperation, RepositoryResult};
use super::relations::{self, Relation, SyncMode};
use super::store::{acquire, begin, commit};
use crate::models::Score;
use crate::query::{list, Entity, Predicate, Query};

/// CRUD over one entity type
///
/// # Type Parameters
///
/// - `E`: the stored entity
/// - `Create`: body accepted by [`Repository::create`]
/// - `Update`: partial body accepted by [`Repository::update`]
pub trait Repository<E: Entity, Create, Update>: Send + Sync {
    /// Insert a record and return it as stored
    ///
    /// # Errors
    ///
    /// `AlreadyExists` when a caller-supplied id is taken, `ValidationFailed`
    /// when a field is out of range.
    fn create(&self, data: Create) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// Filter, sort, skip, take
    fn find_many(&self, query: &Query) -> impl Future<Output = RepositoryResult<Vec<E>>> + Send;

    /// Number of records matching `predicate`
    fn count(&self, predicate: &Predicate) -> impl Future<Output = RepositoryResult<i64>> + Send;

    /// The record with this id
    ///
    /// # Errors
    ///
    /// `NotFound` when no record has this id.
    fn find_one(&self, id: &str) -> impl Future<Output = RepositoryResult<E>> + Send {
        async move {
            self.find_many(&Query::by_id(id))
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| RepositoryError::not_found(E::NAME, id))
        }
    }

    /// Apply the fields present in `data`
    ///
    /// # Errors
    ///
    /// `NotFound` when the record does not exist, `ConcurrencyConflict` when
    /// the write matched nothing although the record still exists.
    fn update(&self, id: &str, data: Update) -> impl Future<Output = RepositoryResult<()>> + Send;

    /// Delete the record with this id
    ///
    /// # Errors
    ///
    /// `NotFound` when no record has this id.
    fn delete(&self, id: &str) -> impl Future<Output = RepositoryResult<()>> + Send;
}

/// A parent entity owning scores through a foreign key on the score
pub trait ScoreOwner: Send + Sync {
    /// How scores point at this parent
    const RELATION: Relation;

    /// Pool the default methods run on
    fn pool(&self) -> &SqlitePool;

    /// Link the existing scores among `score_ids`
    ///
    /// Scores owned by another parent move. Already-linked scores are left
    /// alone. Fails with `NotFound` when the parent is missing or none of the
    /// ids exist.
    fn connect_scores(
        &self,
        id: &str,
        score_ids: &[String],
    ) -> impl Future<Output = RepositoryResult<()>> + Send {
        async move { run_sync(self.pool(), Self::RELATION, SyncMode::Connect, id, score_ids).await }
    }

    /// Unlink the scores among `score_ids` that are linked to this parent
    ///
    /// Unknown ids are ignored.
    fn disconnect_scores(
        &self,
        id: &str,
        score_ids: &[String],
    ) -> impl Future<Output = RepositoryResult<()>> + Send {
        async move {
            run_sync(self.pool(), Self::RELATION, SyncMode::Disconnect, id, score_ids).await
        }
    }

    /// Make the parent's scores exactly the existing scores among `score_ids`
    fn replace_scores(
        &self,
        id: &str,
        score_ids: &[String],
    ) -> impl Future<Output = RepositoryResult<()>> + Send {
        async move { run_sync(self.pool(), Self::RELATION, SyncMode::Replace, id, score_ids).await }
    }

    /// The parent's scores, through the query pipeline
    fn find_scores(
        &self,
        id: &str,
        query: &Query,
    ) -> impl Future<Output = RepositoryResult<Vec<Score>>> + Send {
        async move {
            let relation = Self::RELATION;
            let mut conn = acquire(self.pool(), RepositoryOperation::List).await?;

            if !relations::row_exists(&mut conn, relation.parent_table, id, RepositoryOperation::List)
                .await?
            {
                return Err(RepositoryError::not_found(relation.parent, id)
                    .with_operation(RepositoryOperation::List));
            }

            let scoped = query.clone().scoped(relation.foreign_key, id);
            list::<Score>(&mut conn, &scoped).await
        }
    }
}

async fn run_sync(
    pool: &SqlitePool,
    relation: Relation,
    mode: SyncMode,
    parent_id: &str,
    child_ids: &[String],
) -> RepositoryResult<()> {
    let operation = mode.operation();
    let mut tx = begin(pool, operation).await?;
    relations::synchronize(&mut tx, &relation, mode, parent_id, child_ids, true).await?;
    commit(tx, operation).await
}
