//! Entities, their filters, and the request bodies that create or change them

mod game;
mod player;
mod score;

pub use game::{CreateGame, Game, GameWhere, UpdateGame};
pub use player::{CreatePlayer, Player, PlayerWhere, UpdatePlayer};
pub use score::{
    CreateScore, Score, ScoreWhere, UpdateScore, SCORE_VALUE_MAX, SCORE_VALUE_MIN,
};

use serde::{Deserialize, Deserializer, Serialize};

/// Reference to another record, written either as a bare id or as `{"id": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRef {
    /// `"score_01h..."`
    Id(String),
    /// `{"id": "score_01h..."}`
    Object {
        /// Referenced id
        id: String,
    },
}

impl EntityRef {
    /// The referenced id
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) | Self::Object { id } => id,
        }
    }
}

impl From<&str> for EntityRef {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

/// Ids of a list of references, in order
pub fn ref_ids(refs: &[EntityRef]) -> Vec<String> {
    refs.iter().map(|r| r.id().to_string()).collect()
}

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`)
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ref_accepts_both_shapes() {
        let refs: Vec<EntityRef> =
            serde_json::from_str(r#"["score_1", {"id": "score_2"}]"#).unwrap();
        assert_eq!(ref_ids(&refs), vec!["score_1", "score_2"]);
    }

    #[test]
    fn test_entity_ref_rejects_other_shapes() {
        assert!(serde_json::from_str::<EntityRef>("42").is_err());
        assert!(serde_json::from_str::<EntityRef>(r#"{"key": "x"}"#).is_err());
    }
}
