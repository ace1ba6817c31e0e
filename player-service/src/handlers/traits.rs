//! Generic REST handlers over the repositories
//!
//! [`Resource`] ties a collection path to its entity, request bodies and
//! repository. The handler functions are generic over it, so one set of
//! functions serves players, games and scores:
//!
//! ```rust,ignore
//! Router::new().route(Players::PATH, get(list::<Players>).post(create::<Players>))
//! ```
//!
//! [`ScoreOwnerResource`] adds the `/{id}/scores` relation handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{de::DeserializeOwned, Serialize};

use super::error::ApiError;
use super::query::{IdList, ListArgs};
use super::response::CountResponse;
use crate::models::{
    CreateGame, CreatePlayer, CreateScore, Game, Player, Score, ScoreWhere, UpdateGame,
    UpdatePlayer, UpdateScore,
};
use crate::query::Entity;
use crate::repository::{
    GameRepository, PlayerRepository, Repository, ScoreOwner, ScoreRepository,
};
use crate::state::AppState;

type FilterOf<R> = <<R as Resource>::Entity as Entity>::Filter;

/// A REST collection backed by a repository
pub trait Resource: Send + Sync + 'static {
    /// Collection path, e.g. `/api/players`
    const PATH: &'static str;

    type Entity: Entity + Serialize;
    type Create: DeserializeOwned + Send + 'static;
    type Update: DeserializeOwned + Send + 'static;
    type Repo: Repository<Self::Entity, Self::Create, Self::Update>;

    fn repository(state: &AppState) -> Self::Repo;
}

/// A collection whose records own scores
pub trait ScoreOwnerResource: Resource {
    type Owner: ScoreOwner;

    fn owner(state: &AppState) -> Self::Owner;
}

/// `/api/players`
pub struct Players;

/// `/api/games`
pub struct Games;

/// `/api/scores`
pub struct Scores;

impl Resource for Players {
    const PATH: &'static str = "/api/players";
    type Entity = Player;
    type Create = CreatePlayer;
    type Update = UpdatePlayer;
    type Repo = PlayerRepository;

    fn repository(state: &AppState) -> Self::Repo {
        state.players()
    }
}

impl ScoreOwnerResource for Players {
    type Owner = PlayerRepository;

    fn owner(state: &AppState) -> Self::Owner {
        state.players()
    }
}

impl Resource for Games {
    const PATH: &'static str = "/api/games";
    type Entity = Game;
    type Create = CreateGame;
    type Update = UpdateGame;
    type Repo = GameRepository;

    fn repository(state: &AppState) -> Self::Repo {
        state.games()
    }
}

impl ScoreOwnerResource for Games {
    type Owner = GameRepository;

    fn owner(state: &AppState) -> Self::Owner {
        state.games()
    }
}

impl Resource for Scores {
    const PATH: &'static str = "/api/scores";
    type Entity = Score;
    type Create = CreateScore;
    type Update = UpdateScore;
    type Repo = ScoreRepository;

    fn repository(state: &AppState) -> Self::Repo {
        state.scores()
    }
}

/// `POST /api/{resource}`
pub async fn create<R: Resource>(
    State(state): State<AppState>,
    Json(data): Json<R::Create>,
) -> Result<(StatusCode, Json<R::Entity>), ApiError> {
    let entity = R::repository(&state).create(data).await?;
    Ok((StatusCode::CREATED, Json(entity)))
}

/// `GET /api/{resource}`
pub async fn list<R: Resource>(
    State(state): State<AppState>,
    ListArgs(args): ListArgs<FilterOf<R>>,
) -> Result<Json<Vec<R::Entity>>, ApiError> {
    let entities = R::repository(&state).find_many(&args.into_query()).await?;
    Ok(Json(entities))
}

/// `POST /api/{resource}/meta`
///
/// Counts over the filter only; sort and window are accepted and ignored.
pub async fn count<R: Resource>(
    State(state): State<AppState>,
    ListArgs(args): ListArgs<FilterOf<R>>,
) -> Result<Json<CountResponse>, ApiError> {
    let query = args.into_query();
    let count = R::repository(&state).count(&query.predicate).await?;
    Ok(Json(CountResponse::new(count)))
}

/// `GET /api/{resource}/{id}`
pub async fn get_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<R::Entity>, ApiError> {
    Ok(Json(R::repository(&state).find_one(&id).await?))
}

/// `PATCH /api/{resource}/{id}`
pub async fn update<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<R::Update>,
) -> Result<StatusCode, ApiError> {
    R::repository(&state).update(&id, data).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/{resource}/{id}`
pub async fn delete<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    R::repository(&state).delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/{resource}/{id}/scores`
pub async fn list_scores<R: ScoreOwnerResource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ListArgs(args): ListArgs<ScoreWhere>,
) -> Result<Json<Vec<Score>>, ApiError> {
    let scores = R::owner(&state).find_scores(&id, &args.into_query()).await?;
    Ok(Json(scores))
}

/// `POST /api/{resource}/{id}/scores`
pub async fn connect_scores<R: ScoreOwnerResource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    IdList(ids): IdList,
) -> Result<StatusCode, ApiError> {
    R::owner(&state).connect_scores(&id, &ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/{resource}/{id}/scores`
pub async fn disconnect_scores<R: ScoreOwnerResource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    IdList(ids): IdList,
) -> Result<StatusCode, ApiError> {
    R::owner(&state).disconnect_scores(&id, &ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PATCH /api/{resource}/{id}/scores`
pub async fn replace_scores<R: ScoreOwnerResource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    IdList(ids): IdList,
) -> Result<StatusCode, ApiError> {
    R::owner(&state).replace_scores(&id, &ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/scores/{id}/game`
pub async fn score_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Game>, ApiError> {
    Ok(Json(state.scores().game(&id).await?))
}

/// `GET /api/scores/{id}/player`
pub async fn score_player(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Player>, ApiError> {
    Ok(Json(state.scores().player(&id).await?))
}
