//! Generated identifiers
//!
//! Server-generated ids follow the [TypeID](https://github.com/jetpack-io/typeid)
//! format, `<prefix>_<base32 uuidv7>`, so they are readable, carry their entity
//! type, and sort by creation time. Caller-supplied ids are stored verbatim and
//! never parsed.
//!
//! ```rust
//! use player_service::ids::IdPrefix;
//!
//! let id = IdPrefix::Player.generate();
//! assert!(id.starts_with("player_"));
//! ```

use http::Request;
use mti::prelude::*;
use std::fmt;
use tower_http::request_id::{MakeRequestId, RequestId as TowerRequestId};

/// Entity prefix of a generated id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdPrefix {
    /// `req_`
    Request,
    /// `player_`
    Player,
    /// `game_`
    Game,
    /// `score_`
    Score,
}

impl IdPrefix {
    /// Prefix text without the separator
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "req",
            Self::Player => "player",
            Self::Game => "game",
            Self::Score => "score",
        }
    }

    /// New time-sortable id with this prefix
    #[must_use]
    pub fn generate(&self) -> String {
        self.as_str().create_type_id::<V7>().to_string()
    }
}

impl fmt::Display for IdPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request identifier used for log correlation
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(MagicTypeId);

impl RequestId {
    /// Creates a new request ID with a UUIDv7 (time-sortable).
    #[must_use]
    pub fn new() -> Self {
        Self(IdPrefix::Request.as_str().create_type_id::<V7>())
    }

    /// Returns the request ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generates `req_` ids for `tower_http::request_id::SetRequestIdLayer`
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeTypedRequestId;

impl MakeRequestId for MakeTypedRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<TowerRequestId> {
        let id = RequestId::new();
        let header_value = http::HeaderValue::from_str(id.as_str()).ok()?;
        Some(TowerRequestId::new(header_value))
    }
}
