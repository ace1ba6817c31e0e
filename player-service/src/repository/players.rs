use chrono::Utc;
use sqlx::SqlitePool;

use super::error::{RepositoryOperation, RepositoryResult};
use super::relations::{self, SyncMode, PLAYER_SCORES};
use super::store::{acquire, begin, commit, delete_row, insert_error, UpdateSet};
use super::traits::{Repository, ScoreOwner};
use crate::ids::IdPrefix;
use crate::models::{ref_ids, CreatePlayer, Player, UpdatePlayer};
use crate::query::{self, Entity, Predicate, Query};

/// Players on SQLite
#[derive(Debug, Clone)]
pub struct PlayerRepository {
    pool: SqlitePool,
}

impl PlayerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl Repository<Player, CreatePlayer, UpdatePlayer> for PlayerRepository {
    async fn create(&self, data: CreatePlayer) -> RepositoryResult<Player> {
        let operation = RepositoryOperation::Create;
        let id = data.id.unwrap_or_else(|| IdPrefix::Player.generate());
        let now = Utc::now();

        let mut tx = begin(&self.pool, operation).await?;

        sqlx::query(
            "INSERT INTO players (id, name, email, phone, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(data.name)
        .bind(data.email)
        .bind(data.phone)
        .bind(data.created_at.unwrap_or(now))
        .bind(data.updated_at.unwrap_or(now))
        .execute(&mut *tx)
        .await
        .map_err(|e| insert_error(Player::NAME, &id, e))?;

        if let Some(scores) = data.scores {
            relations::synchronize(&mut tx, &PLAYER_SCORES, SyncMode::Connect, &id, &ref_ids(&scores), false)
                .await?;
        }

        commit(tx, operation).await?;
        tracing::info!(player_id = %id, "Player created");

        self.find_one(&id).await
    }

    async fn find_many(&self, query: &Query) -> RepositoryResult<Vec<Player>> {
        let mut conn = acquire(&self.pool, RepositoryOperation::List).await?;
        let mut players = query::list::<Player>(&mut conn, query).await?;

        let ids: Vec<String> = players.iter().map(|p| p.id.clone()).collect();
        let mut scores = relations::load_child_ids(&mut conn, &PLAYER_SCORES, &ids).await?;
        for player in &mut players {
            player.scores = scores.remove(&player.id).unwrap_or_default();
        }
        Ok(players)
    }

    async fn count(&self, predicate: &Predicate) -> RepositoryResult<i64> {
        let mut conn = acquire(&self.pool, RepositoryOperation::Count).await?;
        query::count::<Player>(&mut conn, predicate).await
    }

    async fn update(&self, id: &str, data: UpdatePlayer) -> RepositoryResult<()> {
        let operation = RepositoryOperation::Update;
        let mut tx = begin(&self.pool, operation).await?;

        let mut set = UpdateSet::new(Player::TABLE);
        set.set("name", data.name)
            .set("email", data.email)
            .set("phone", data.phone)
            .set("created_at", data.created_at)
            .set("updated_at", data.updated_at);
        set.execute(&mut tx, Player::NAME, id).await?;

        if let Some(scores) = data.scores {
            relations::synchronize(&mut tx, &PLAYER_SCORES, SyncMode::Replace, id, &ref_ids(&scores), false)
                .await?;
        }

        commit(tx, operation).await?;
        tracing::debug!(player_id = %id, "Player updated");
        Ok(())
    }

    async fn delete(&self, id: &str) -> RepositoryResult<()> {
        delete_row(&self.pool, Player::TABLE, Player::NAME, id).await
    }
}

impl ScoreOwner for PlayerRepository {
    const RELATION: relations::Relation = PLAYER_SCORES;

    fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
