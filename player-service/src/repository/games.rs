use chrono::Utc;
use sqlx::SqlitePool;

use super::error::{RepositoryOperation, RepositoryResult};
use super::relations::{self, SyncMode, GAME_SCORES};
use super::store::{acquire, begin, commit, delete_row, insert_error, UpdateSet};
use super::traits::{Repository, ScoreOwner};
use crate::ids::IdPrefix;
use crate::models::{ref_ids, CreateGame, Game, UpdateGame};
use crate::query::{self, Entity, Predicate, Query};

/// Games on SQLite
#[derive(Debug, Clone)]
pub struct GameRepository {
    pool: SqlitePool,
}

impl GameRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl Repository<Game, CreateGame, UpdateGame> for GameRepository {
    async fn create(&self, data: CreateGame) -> RepositoryResult<Game> {
        let operation = RepositoryOperation::Create;
        let id = data.id.unwrap_or_else(|| IdPrefix::Game.generate());
        let now = Utc::now();

        let mut tx = begin(&self.pool, operation).await?;

        sqlx::query(
            "INSERT INTO games (id, genre, title, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(data.genre)
        .bind(data.title)
        .bind(data.created_at.unwrap_or(now))
        .bind(data.updated_at.unwrap_or(now))
        .execute(&mut *tx)
        .await
        .map_err(|e| insert_error(Game::NAME, &id, e))?;

        if let Some(scores) = data.scores {
            relations::synchronize(&mut tx, &GAME_SCORES, SyncMode::Connect, &id, &ref_ids(&scores), false)
                .await?;
        }

        commit(tx, operation).await?;
        tracing::info!(game_id = %id, "Game created");

        self.find_one(&id).await
    }

    async fn find_many(&self, query: &Query) -> RepositoryResult<Vec<Game>> {
        let mut conn = acquire(&self.pool, RepositoryOperation::List).await?;
        let mut games = query::list::<Game>(&mut conn, query).await?;

        let ids: Vec<String> = games.iter().map(|g| g.id.clone()).collect();
        let mut scores = relations::load_child_ids(&mut conn, &GAME_SCORES, &ids).await?;
        for game in &mut games {
            game.scores = scores.remove(&game.id).unwrap_or_default();
        }
        Ok(games)
    }

    async fn count(&self, predicate: &Predicate) -> RepositoryResult<i64> {
        let mut conn = acquire(&self.pool, RepositoryOperation::Count).await?;
        query::count::<Game>(&mut conn, predicate).await
    }

    async fn update(&self, id: &str, data: UpdateGame) -> RepositoryResult<()> {
        let operation = RepositoryOperation::Update;
        let mut tx = begin(&self.pool, operation).await?;

        let mut set = UpdateSet::new(Game::TABLE);
        set.set("genre", data.genre)
            .set("title", data.title)
            .set("created_at", data.created_at)
            .set("updated_at", data.updated_at);
        set.execute(&mut tx, Game::NAME, id).await?;

        if let Some(scores) = data.scores {
            relations::synchronize(&mut tx, &GAME_SCORES, SyncMode::Replace, id, &ref_ids(&scores), false)
                .await?;
        }

        commit(tx, operation).await?;
        tracing::debug!(game_id = %id, "Game updated");
        Ok(())
    }

    async fn delete(&self, id: &str) -> RepositoryResult<()> {
        delete_row(&self.pool, Game::TABLE, Game::NAME, id).await
    }
}

impl ScoreOwner for GameRepository {
    const RELATION: relations::Relation = GAME_SCORES;

    fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory_pool;
    use crate::models::{CreateScore, ScoreWhere};
    use crate::query::{FindManyArgs, Sort};
    use crate::repository::{RepositoryErrorKind, ScoreRepository};

    async fn setup(score_ids: &[&str]) -> (GameRepository, ScoreRepository) {
        let pool = memory_pool().await.unwrap();
        let games = GameRepository::new(pool.clone());
        let scores = ScoreRepository::new(pool);

        for id in ["g1", "g2"] {
            games
                .create(CreateGame {
                    id: Some(id.to_string()),
                    ..CreateGame::default()
                })
                .await
                .unwrap();
        }
        for (value, id) in score_ids.iter().enumerate() {
            scores
                .create(CreateScore {
                    id: Some(id.to_string()),
                    score_value: Some(value as i32),
                    ..CreateScore::default()
                })
                .await
                .unwrap();
        }
        (games, scores)
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    async fn linked(games: &GameRepository, id: &str) -> Vec<String> {
        games.find_one(id).await.unwrap().scores
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let (games, _) = setup(&["s1", "s2"]).await;

        games.connect_scores("g1", &ids(&["s1"])).await.unwrap();
        games.connect_scores("g1", &ids(&["s1"])).await.unwrap();
        assert_eq!(linked(&games, "g1").await, ids(&["s1"]));

        games.connect_scores("g1", &ids(&["s1", "s2"])).await.unwrap();
        assert_eq!(linked(&games, "g1").await, ids(&["s1", "s2"]));
    }

    #[tokio::test]
    async fn test_connect_partial_match_links_matched_subset() {
        let (games, _) = setup(&["s1"]).await;
        games
            .connect_scores("g1", &ids(&["s1", "missing"]))
            .await
            .unwrap();
        assert_eq!(linked(&games, "g1").await, ids(&["s1"]));
    }

    #[tokio::test]
    async fn test_connect_zero_match_is_not_found_and_changes_nothing() {
        let (games, _) = setup(&["s1"]).await;
        games.connect_scores("g1", &ids(&["s1"])).await.unwrap();

        let err = games
            .connect_scores("g1", &ids(&["nope", "nada"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
        assert_eq!(err.operation, RepositoryOperation::Connect);
        assert_eq!(linked(&games, "g1").await, ids(&["s1"]));
    }

    #[tokio::test]
    async fn test_missing_parent_is_not_found() {
        let (games, _) = setup(&["s1"]).await;
        for result in [
            games.connect_scores("ghost", &ids(&["s1"])).await,
            games.disconnect_scores("ghost", &ids(&["s1"])).await,
            games.replace_scores("ghost", &ids(&["s1"])).await,
        ] {
            let err = result.unwrap_err();
            assert_eq!(err.kind, RepositoryErrorKind::NotFound);
            assert_eq!(err.entity_id.as_deref(), Some("ghost"));
        }
        let err = games.find_scores("ghost", &Query::all()).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_connect_moves_score_from_other_parent() {
        let (games, scores) = setup(&["s1"]).await;
        games.connect_scores("g1", &ids(&["s1"])).await.unwrap();
        games.connect_scores("g2", &ids(&["s1"])).await.unwrap();

        assert!(linked(&games, "g1").await.is_empty());
        assert_eq!(linked(&games, "g2").await, ids(&["s1"]));
        assert_eq!(
            scores.find_one("s1").await.unwrap().game_id.as_deref(),
            Some("g2")
        );
    }

    #[tokio::test]
    async fn test_disconnect_tolerates_unknown_ids() {
        let (games, _) = setup(&["s1", "s2"]).await;
        games.connect_scores("g1", &ids(&["s1", "s2"])).await.unwrap();

        games
            .disconnect_scores("g1", &ids(&["s1", "unknown"]))
            .await
            .unwrap();
        assert_eq!(linked(&games, "g1").await, ids(&["s2"]));

        games
            .disconnect_scores("g1", &ids(&["unknown"]))
            .await
            .unwrap();
        assert_eq!(linked(&games, "g1").await, ids(&["s2"]));
    }

    #[tokio::test]
    async fn test_disconnect_leaves_other_parents_scores() {
        let (games, scores) = setup(&["s1"]).await;
        games.connect_scores("g2", &ids(&["s1"])).await.unwrap();

        games.disconnect_scores("g1", &ids(&["s1"])).await.unwrap();
        assert_eq!(
            scores.find_one("s1").await.unwrap().game_id.as_deref(),
            Some("g2")
        );
    }

    #[tokio::test]
    async fn test_replace_is_exact() {
        let (games, _) = setup(&["s1", "s2", "s3"]).await;
        games.connect_scores("g1", &ids(&["s1", "s2"])).await.unwrap();

        games
            .replace_scores("g1", &ids(&["s2", "s3", "missing"]))
            .await
            .unwrap();
        assert_eq!(linked(&games, "g1").await, ids(&["s2", "s3"]));

        let err = games
            .replace_scores("g1", &ids(&["missing"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
        assert_eq!(linked(&games, "g1").await, ids(&["s2", "s3"]));
    }

    #[tokio::test]
    async fn test_find_scores_is_scoped_and_queryable() {
        let (games, _) = setup(&["s0", "s1", "s2", "s3"]).await;
        games
            .connect_scores("g1", &ids(&["s1", "s2", "s3"]))
            .await
            .unwrap();
        games.connect_scores("g2", &ids(&["s0"])).await.unwrap();

        let pairs = vec![
            ("where.scoreValue.gte".to_string(), "2".to_string()),
            ("sortBy".to_string(), "scoreValue:desc".to_string()),
        ];
        let query = FindManyArgs::<ScoreWhere>::from_pairs(&pairs)
            .unwrap()
            .into_query();
        let found = games.find_scores("g1", &query).await.unwrap();
        let found: Vec<_> = found.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(found, vec!["s3", "s2"]);

        let mut query = Query::all();
        query.sort = Some(Sort::asc("id"));
        assert_eq!(games.find_scores("g2", &query).await.unwrap().len(), 1);
    }
}
