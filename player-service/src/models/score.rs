use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{nullable, EntityRef, GameWhere, PlayerWhere};
use crate::query::{
    bind_scalar, bind_string, scalar_predicates, string_predicates, Entity, Filter, Predicate,
    QueryError, RelationJoin, ScalarFilter, StringFilter,
};

/// Lowest accepted `scoreValue`
pub const SCORE_VALUE_MIN: i32 = -999_999_999;
/// Highest accepted `scoreValue`
pub const SCORE_VALUE_MAX: i32 = 999_999_999;

const GAME: RelationJoin = RelationJoin {
    table: "games",
    inner_column: "id",
    outer_column: "game_id",
};

const PLAYER: RelationJoin = RelationJoin {
    table: "players",
    inner_column: "id",
    outer_column: "player_id",
};

/// A score, optionally tied to one game and one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub id: String,
    pub score_value: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Owning game id
    #[serde(rename = "game")]
    pub game_id: Option<String>,
    /// Owning player id
    #[serde(rename = "player")]
    pub player_id: Option<String>,
}

impl Entity for Score {
    const NAME: &'static str = "Score";
    const TABLE: &'static str = "scores";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "score_value",
        "created_at",
        "updated_at",
        "game_id",
        "player_id",
    ];

    type Filter = ScoreWhere;
}

/// Body of `POST /api/scores`
///
/// `game` and `player` that do not exist are stored as unset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScore {
    pub id: Option<String>,
    pub score_value: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub game: Option<EntityRef>,
    pub player: Option<EntityRef>,
}

impl CreateScore {
    /// Range check on `scoreValue`
    pub fn validate(&self) -> Result<(), String> {
        check_score_value(self.score_value)
    }
}

/// Body of `PATCH /api/scores/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScore {
    #[serde(default, deserialize_with = "nullable")]
    pub score_value: Option<Option<i32>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// `null` detaches the score from its game
    #[serde(default, deserialize_with = "nullable")]
    pub game: Option<Option<EntityRef>>,
    /// `null` detaches the score from its player
    #[serde(default, deserialize_with = "nullable")]
    pub player: Option<Option<EntityRef>>,
}

impl UpdateScore {
    /// Range check on `scoreValue`
    pub fn validate(&self) -> Result<(), String> {
        check_score_value(self.score_value.flatten())
    }
}

fn check_score_value(value: Option<i32>) -> Result<(), String> {
    match value {
        Some(v) if !(SCORE_VALUE_MIN..=SCORE_VALUE_MAX).contains(&v) => Err(format!(
            "scoreValue {} is outside {}..={}",
            v, SCORE_VALUE_MIN, SCORE_VALUE_MAX
        )),
        _ => Ok(()),
    }
}

/// Filter over scores
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoreWhere {
    pub id: Vec<StringFilter>,
    pub score_value: Vec<ScalarFilter<i32>>,
    pub created_at: Vec<ScalarFilter<DateTime<Utc>>>,
    pub updated_at: Vec<ScalarFilter<DateTime<Utc>>>,
    /// The owning game matches
    pub game: Option<Box<GameWhere>>,
    /// The owning player matches
    pub player: Option<Box<PlayerWhere>>,
}

impl Filter for ScoreWhere {
    fn bind(&mut self, key: &str, path: &[&str], raw: &str) -> Result<(), QueryError> {
        match path {
            ["id", rest @ ..] => bind_string(&mut self.id, key, rest, raw, false),
            ["scoreValue", rest @ ..] => bind_scalar(&mut self.score_value, key, rest, raw, true),
            ["createdAt", rest @ ..] => bind_scalar(&mut self.created_at, key, rest, raw, false),
            ["updatedAt", rest @ ..] => bind_scalar(&mut self.updated_at, key, rest, raw, false),
            ["game", rest @ ..] if !rest.is_empty() => self
                .game
                .get_or_insert_with(Box::default)
                .bind(key, rest, raw),
            ["player", rest @ ..] if !rest.is_empty() => self
                .player
                .get_or_insert_with(Box::default)
                .bind(key, rest, raw),
            _ => Err(QueryError::UnknownField(key.to_string())),
        }
    }

    fn sort_column(field: &str) -> Option<&'static str> {
        Some(match field {
            "id" => "id",
            "scoreValue" => "score_value",
            "createdAt" => "created_at",
            "updatedAt" => "updated_at",
            _ => return None,
        })
    }

    fn predicate(&self) -> Predicate {
        Predicate::all_of(
            string_predicates("id", &self.id)
                .chain(scalar_predicates("score_value", &self.score_value))
                .chain(scalar_predicates("created_at", &self.created_at))
                .chain(scalar_predicates("updated_at", &self.updated_at))
                .chain(
                    self.game
                        .iter()
                        .map(|game| Predicate::exists(GAME, game.predicate())),
                )
                .chain(
                    self.player
                        .iter()
                        .map(|player| Predicate::exists(PLAYER, player.predicate())),
                ),
        )
    }

    fn is_empty(&self) -> bool {
        self.id.is_empty()
            && self.score_value.is_empty()
            && self.created_at.is_empty()
            && self.updated_at.is_empty()
            && self.game.is_none()
            && self.player.is_none()
    }

    fn with_id(id: &str) -> Self {
        Self {
            id: vec![StringFilter::Equals(id.to_string())],
            ..Self::default()
        }
    }
}
