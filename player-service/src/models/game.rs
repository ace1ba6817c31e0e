use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{nullable, EntityRef, ScoreWhere};
use crate::query::{
    bind_scalar, bind_string, scalar_predicates, string_predicates, Entity, Filter, Predicate,
    QueryError, RelationJoin, ScalarFilter, StringFilter,
};

/// Scores recorded for the filtered game
const SCORES: RelationJoin = RelationJoin {
    table: "scores",
    inner_column: "game_id",
    outer_column: "id",
};

/// A game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub genre: Option<String>,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Ids of scores recorded for the game
    #[sqlx(skip)]
    #[serde(default)]
    pub scores: Vec<String>,
}

impl Entity for Game {
    const NAME: &'static str = "Game";
    const TABLE: &'static str = "games";
    const COLUMNS: &'static [&'static str] = &["id", "genre", "title", "created_at", "updated_at"];

    type Filter = GameWhere;
}

/// Body of `POST /api/games`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGame {
    pub id: Option<String>,
    pub genre: Option<String>,
    pub title: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub scores: Option<Vec<EntityRef>>,
}

/// Body of `PATCH /api/games/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGame {
    #[serde(default, deserialize_with = "nullable")]
    pub genre: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub title: Option<Option<String>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub scores: Option<Vec<EntityRef>>,
}

/// Filter over games
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GameWhere {
    pub id: Vec<StringFilter>,
    pub genre: Vec<StringFilter>,
    pub title: Vec<StringFilter>,
    pub created_at: Vec<ScalarFilter<DateTime<Utc>>>,
    pub updated_at: Vec<ScalarFilter<DateTime<Utc>>>,
    pub scores: Option<Box<ScoreWhere>>,
}

impl Filter for GameWhere {
    fn bind(&mut self, key: &str, path: &[&str], raw: &str) -> Result<(), QueryError> {
        match path {
            ["id", rest @ ..] => bind_string(&mut self.id, key, rest, raw, false),
            ["genre", rest @ ..] => bind_string(&mut self.genre, key, rest, raw, true),
            ["title", rest @ ..] => bind_string(&mut self.title, key, rest, raw, true),
            ["createdAt", rest @ ..] => bind_scalar(&mut self.created_at, key, rest, raw, false),
            ["updatedAt", rest @ ..] => bind_scalar(&mut self.updated_at, key, rest, raw, false),
            ["scores", rest @ ..] if !rest.is_empty() => self
                .scores
                .get_or_insert_with(Box::default)
                .bind(key, rest, raw),
            _ => Err(QueryError::UnknownField(key.to_string())),
        }
    }

    fn sort_column(field: &str) -> Option<&'static str> {
        Some(match field {
            "id" => "id",
            "genre" => "genre",
            "title" => "title",
            "createdAt" => "created_at",
            "updatedAt" => "updated_at",
            _ => return None,
        })
    }

    fn predicate(&self) -> Predicate {
        Predicate::all_of(
            string_predicates("id", &self.id)
                .chain(string_predicates("genre", &self.genre))
                .chain(string_predicates("title", &self.title))
                .chain(scalar_predicates("created_at", &self.created_at))
                .chain(scalar_predicates("updated_at", &self.updated_at))
                .chain(
                    self.scores
                        .iter()
                        .map(|scores| Predicate::exists(SCORES, scores.predicate())),
                ),
        )
    }

    fn is_empty(&self) -> bool {
        self.id.is_empty()
            && self.genre.is_empty()
            && self.title.is_empty()
            && self.created_at.is_empty()
            && self.updated_at.is_empty()
            && self.scores.is_none()
    }

    fn with_id(id: &str) -> Self {
        Self {
            id: vec![StringFilter::Equals(id.to_string())],
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::FilterCondition;

    #[test]
    fn test_sort_columns() {
        assert_eq!(GameWhere::sort_column("createdAt"), Some("created_at"));
        assert_eq!(GameWhere::sort_column("title"), Some("title"));
        assert_eq!(GameWhere::sort_column("created_at"), None);
        assert_eq!(GameWhere::sort_column("scores"), None);
    }

    #[test]
    fn test_genre_null_check() {
        let mut filter = GameWhere::default();
        filter
            .bind("where.genre.isNull", &["genre", "isNull"], "false")
            .unwrap();
        assert_eq!(filter.predicate(), FilterCondition::is_not_null("genre").into());
    }

    #[test]
    fn test_create_accepts_mixed_score_refs() {
        let create: CreateGame = serde_json::from_str(
            r#"{"title": "Chess", "scores": ["score_1", {"id": "score_2"}]}"#,
        )
        .unwrap();
        assert_eq!(create.title.as_deref(), Some("Chess"));
        assert_eq!(create.scores.map(|s| s.len()), Some(2));
        assert!(create.created_at.is_none());
    }
}
