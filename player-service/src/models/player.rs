use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{nullable, EntityRef, ScoreWhere};
use crate::query::{
    bind_scalar, bind_string, scalar_predicates, string_predicates, Entity, Filter, Predicate,
    QueryError, RelationJoin, ScalarFilter, StringFilter,
};

/// Scores owned by the filtered player
const SCORES: RelationJoin = RelationJoin {
    table: "scores",
    inner_column: "player_id",
    outer_column: "id",
};

/// A player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Ids of the player's scores
    #[sqlx(skip)]
    #[serde(default)]
    pub scores: Vec<String>,
}

impl Entity for Player {
    const NAME: &'static str = "Player";
    const TABLE: &'static str = "players";
    const COLUMNS: &'static [&'static str] =
        &["id", "name", "email", "phone", "created_at", "updated_at"];

    type Filter = PlayerWhere;
}

/// Body of `POST /api/players`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlayer {
    /// Generated when absent
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Existing scores to attach; unknown ids are skipped
    pub scores: Option<Vec<EntityRef>>,
}

/// Body of `PATCH /api/players/{id}`
///
/// Absent fields are left alone; `null` clears a nullable field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlayer {
    #[serde(default, deserialize_with = "nullable")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Replaces the score set with the scores that exist
    pub scores: Option<Vec<EntityRef>>,
}

/// Filter over players, bound from `where.*`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerWhere {
    pub id: Vec<StringFilter>,
    pub name: Vec<StringFilter>,
    pub email: Vec<StringFilter>,
    pub phone: Vec<StringFilter>,
    pub created_at: Vec<ScalarFilter<DateTime<Utc>>>,
    pub updated_at: Vec<ScalarFilter<DateTime<Utc>>>,
    /// Some score of the player matches
    pub scores: Option<Box<ScoreWhere>>,
}

impl Filter for PlayerWhere {
    fn bind(&mut self, key: &str, path: &[&str], raw: &str) -> Result<(), QueryError> {
        match path {
            ["id", rest @ ..] => bind_string(&mut self.id, key, rest, raw, false),
            ["name", rest @ ..] => bind_string(&mut self.name, key, rest, raw, true),
            ["email", rest @ ..] => bind_string(&mut self.email, key, rest, raw, true),
            ["phone", rest @ ..] => bind_string(&mut self.phone, key, rest, raw, true),
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
            "name" => "name",
            "email" => "email",
            "phone" => "phone",
            "createdAt" => "created_at",
            "updatedAt" => "updated_at",
            _ => return None,
        })
    }

    fn predicate(&self) -> Predicate {
        Predicate::all_of(
            string_predicates("id", &self.id)
                .chain(string_predicates("name", &self.name))
                .chain(string_predicates("email", &self.email))
                .chain(string_predicates("phone", &self.phone))
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
            && self.name.is_empty()
            && self.email.is_empty()
            && self.phone.is_empty()
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
    fn test_player_serializes_camel_case() {
        let player = Player {
            id: "player_1".into(),
            name: Some("Alice".into()),
            email: None,
            phone: None,
            created_at: DateTime::UNIX_EPOCH,
            updated_at: DateTime::UNIX_EPOCH,
            scores: vec!["score_1".into()],
        };
        let json = serde_json::to_value(&player).unwrap();
        assert_eq!(json["createdAt"], "1970-01-01T00:00:00Z");
        assert_eq!(json["scores"][0], "score_1");
        assert!(json["email"].is_null());
    }

    #[test]
    fn test_update_distinguishes_absent_and_null() {
        let update: UpdatePlayer =
            serde_json::from_str(r#"{"name": "Bob", "email": null}"#).unwrap();
        assert_eq!(update.name, Some(Some("Bob".into())));
        assert_eq!(update.email, Some(None));
        assert_eq!(update.phone, None);
        assert!(update.scores.is_none());
    }

    #[test]
    fn test_empty_filter_matches_all() {
        assert!(PlayerWhere::default().predicate().is_all());
    }

    #[test]
    fn test_fields_are_anded() {
        let mut filter = PlayerWhere::default();
        filter.bind("where.name", &["name"], "Alice").unwrap();
        filter
            .bind("where.email.endsWith", &["email", "endsWith"], "@x.io")
            .unwrap();

        assert_eq!(
            filter.predicate(),
            Predicate::And(vec![
                FilterCondition::eq("name", "Alice").into(),
                FilterCondition::ends_with("email", "@x.io").into(),
            ])
        );
    }

    #[test]
    fn test_nested_scores_filter_is_exists() {
        let mut filter = PlayerWhere::default();
        filter
            .bind("where.scores.scoreValue.gt", &["scores", "scoreValue", "gt"], "100")
            .unwrap();

        assert_eq!(
            filter.predicate(),
            Predicate::exists(SCORES, FilterCondition::gt("score_value", 100).into())
        );
    }

    #[test]
    fn test_bare_relation_key_is_unknown() {
        let mut filter = PlayerWhere::default();
        let err = filter.bind("where.scores", &["scores"], "x").unwrap_err();
        assert_eq!(err, QueryError::UnknownField("where.scores".into()));
        assert!(filter.is_empty());
    }

    #[test]
    fn test_id_is_not_nullable() {
        let mut filter = PlayerWhere::default();
        assert!(matches!(
            filter.bind("where.id.isNull", &["id", "isNull"], "true"),
            Err(QueryError::UnknownOperator { .. })
        ));
    }
}
