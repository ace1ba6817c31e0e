use chrono::Utc;
use sqlx::SqlitePool;

use super::error::{RepositoryError, RepositoryOperation, RepositoryResult};
use super::relations::resolve_ref;
use super::store::{acquire, begin, commit, delete_row, insert_error, UpdateSet};
use super::traits::Repository;
use super::{GameRepository, PlayerRepository};
use crate::ids::IdPrefix;
use crate::models::{CreateScore, Game, Player, Score, UpdateScore};
use crate::query::{self, Entity, Predicate, Query};

/// Scores on SQLite
#[derive(Debug, Clone)]
pub struct ScoreRepository {
    pool: SqlitePool,
}

impl ScoreRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The game the score belongs to
    ///
    /// # Errors
    ///
    /// `NotFound` when the score is missing, `RelationUnset` when it has no game.
    pub async fn game(&self, score_id: &str) -> RepositoryResult<Game> {
        let score = self.find_one(score_id).await?;
        let game_id = score
            .game_id
            .ok_or_else(|| RepositoryError::relation_unset(Score::NAME, score_id, "game"))?;

        GameRepository::new(self.pool.clone())
            .find_one(&game_id)
            .await
            .map_err(|e| e.with_operation(RepositoryOperation::FindRelated))
    }

    /// The player the score belongs to
    ///
    /// # Errors
    ///
    /// `NotFound` when the score is missing, `RelationUnset` when it has no player.
    pub async fn player(&self, score_id: &str) -> RepositoryResult<Player> {
        let score = self.find_one(score_id).await?;
        let player_id = score
            .player_id
            .ok_or_else(|| RepositoryError::relation_unset(Score::NAME, score_id, "player"))?;

        PlayerRepository::new(self.pool.clone())
            .find_one(&player_id)
            .await
            .map_err(|e| e.with_operation(RepositoryOperation::FindRelated))
    }
}

impl Repository<Score, CreateScore, UpdateScore> for ScoreRepository {
    async fn create(&self, data: CreateScore) -> RepositoryResult<Score> {
        let operation = RepositoryOperation::Create;
        data.validate()
            .map_err(|msg| RepositoryError::validation_failed(operation, msg))?;

        let id = data.id.unwrap_or_else(|| IdPrefix::Score.generate());
        let now = Utc::now();

        let mut tx = begin(&self.pool, operation).await?;

        let game_id = resolve_ref(&mut tx, Game::TABLE, data.game.as_ref().map(|g| g.id()), operation).await?;
        let player_id =
            resolve_ref(&mut tx, Player::TABLE, data.player.as_ref().map(|p| p.id()), operation).await?;

        sqlx::query(
            "INSERT INTO scores (id, score_value, created_at, updated_at, game_id, player_id) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(data.score_value)
        .bind(data.created_at.unwrap_or(now))
        .bind(data.updated_at.unwrap_or(now))
        .bind(game_id)
        .bind(player_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| insert_error(Score::NAME, &id, e))?;

        commit(tx, operation).await?;
        tracing::info!(score_id = %id, "Score created");

        self.find_one(&id).await
    }

    async fn find_many(&self, query: &Query) -> RepositoryResult<Vec<Score>> {
        let mut conn = acquire(&self.pool, RepositoryOperation::List).await?;
        query::list::<Score>(&mut conn, query).await
    }

    async fn count(&self, predicate: &Predicate) -> RepositoryResult<i64> {
        let mut conn = acquire(&self.pool, RepositoryOperation::Count).await?;
        query::count::<Score>(&mut conn, predicate).await
    }

    async fn update(&self, id: &str, data: UpdateScore) -> RepositoryResult<()> {
        let operation = RepositoryOperation::Update;
        data.validate()
            .map_err(|msg| RepositoryError::validation_failed(operation, msg).with_entity(Score::NAME, id))?;

        let mut tx = begin(&self.pool, operation).await?;

        let game_id = match &data.game {
            Some(game) => Some(
                resolve_ref(&mut tx, Game::TABLE, game.as_ref().map(|g| g.id()), operation).await?,
            ),
            None => None,
        };
        let player_id = match &data.player {
            Some(player) => Some(
                resolve_ref(&mut tx, Player::TABLE, player.as_ref().map(|p| p.id()), operation)
                    .await?,
            ),
            None => None,
        };

        let mut set = UpdateSet::new(Score::TABLE);
        set.set("score_value", data.score_value)
            .set("created_at", data.created_at)
            .set("updated_at", data.updated_at)
            .set("game_id", game_id)
            .set("player_id", player_id);
        set.execute(&mut tx, Score::NAME, id).await?;

        commit(tx, operation).await?;
        tracing::debug!(score_id = %id, "Score updated");
        Ok(())
    }

    async fn delete(&self, id: &str) -> RepositoryResult<()> {
        delete_row(&self.pool, Score::TABLE, Score::NAME, id).await
    }
}
