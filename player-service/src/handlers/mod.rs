//! REST handlers for players, games and scores
//!
//! # Routes
//!
//! | Method | Path | |
//! |---|---|---|
//! | `POST` | `/api/{players,games,scores}` | create, 201 |
//! | `GET` | `/api/{players,games,scores}` | filtered list |
//! | `POST` | `/api/{players,games,scores}/meta` | `{"count": n}`, public |
//! | `GET` `PATCH` `DELETE` | `/api/{players,games,scores}/{id}` | get, partial update, delete |
//! | `GET` `POST` `DELETE` `PATCH` | `/api/{players,games}/{id}/scores` | list, connect, disconnect, replace |
//! | `GET` | `/api/scores/{id}/{game,player}` | related record, public |
//!
//! Everything not marked public goes through [`JwtAuth`]. `meta` is reserved:
//! `GET /api/{players,games,scores}/meta` is 405, not a lookup of id `meta`.

mod error;
mod query;
mod response;
mod traits;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::middleware::JwtAuth;
use crate::state::AppState;

pub use error::{ApiError, ApiErrorKind};
pub use query::{IdList, ListArgs};
pub use response::CountResponse;
pub use traits::{
    connect_scores, count, create, delete, disconnect_scores, get_one, list, list_scores,
    replace_scores, score_game, score_player, update, Games, Players, Resource, ScoreOwnerResource,
    Scores,
};

/// All `/api` routes, authenticated where required
pub fn api_routes(auth: JwtAuth) -> Router<AppState> {
    let protected = Router::new()
        .merge(collection::<Players>())
        .merge(collection::<Games>())
        .merge(collection::<Scores>())
        .merge(owned_scores::<Players>())
        .merge(owned_scores::<Games>())
        .route_layer(middleware::from_fn_with_state(auth, JwtAuth::middleware));

    let public = Router::new()
        .route(&format!("{}/meta", Players::PATH), post(count::<Players>))
        .route(&format!("{}/meta", Games::PATH), post(count::<Games>))
        .route(&format!("{}/meta", Scores::PATH), post(count::<Scores>))
        .route(&format!("{}/{{id}}/game", Scores::PATH), get(score_game))
        .route(&format!("{}/{{id}}/player", Scores::PATH), get(score_player));

    protected.merge(public)
}

fn collection<R: Resource>() -> Router<AppState> {
    Router::new()
        .route(R::PATH, get(list::<R>).post(create::<R>))
        .route(
            &format!("{}/{{id}}", R::PATH),
            get(get_one::<R>).patch(update::<R>).delete(delete::<R>),
        )
}

fn owned_scores<R: ScoreOwnerResource>() -> Router<AppState> {
    Router::new().route(
        &format!("{}/{{id}}/scores", R::PATH),
        get(list_scores::<R>)
            .post(connect_scores::<R>)
            .delete(disconnect_scores::<R>)
            .patch(replace_scores::<R>),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, JwtConfig};
    use crate::database::memory_pool;
    use crate::middleware::Claims;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const SECRET: &[u8] = b"router-test-secret";

    async fn app() -> Router {
        let pool = memory_pool().await.unwrap();
        let state = AppState::new(Config::default(), pool);
        let auth = JwtAuth::from_key(&JwtConfig::default(), SECRET).unwrap();
        api_routes(auth).with_state(state)
    }

    fn token(roles: &[&str]) -> String {
        let claims = Claims {
            sub: "tester".into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp: chrono::Utc::now().timestamp() + 600,
            iat: None,
            iss: None,
            aud: None,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    struct Call {
        method: Method,
        uri: String,
        body: Option<Value>,
        token: Option<String>,
    }

    fn call(method: Method, uri: &str) -> Call {
        Call {
            method,
            uri: uri.to_string(),
            body: None,
            token: Some(token(&["user"])),
        }
    }

    impl Call {
        fn json(mut self, body: Value) -> Self {
            self.body = Some(body);
            self
        }

        fn anonymous(mut self) -> Self {
            self.token = None;
            self
        }

        fn bearer(mut self, token: String) -> Self {
            self.token = Some(token);
            self
        }

        async fn send(self, app: &Router) -> Response {
            let mut builder = Request::builder().method(self.method).uri(self.uri);
            if let Some(token) = self.token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            let body = match self.body {
                Some(value) => {
                    builder = builder.header(header::CONTENT_TYPE, "application/json");
                    Body::from(value.to_string())
                }
                None => Body::empty(),
            };
            app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
        }
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create(app: &Router, path: &str, body: Value) -> Value {
        let response = call(Method::POST, path).json(body).send(app).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await
    }

    #[tokio::test]
    async fn test_auth_is_required_with_user_role() {
        let app = app().await;

        let response = call(Method::GET, "/api/players").anonymous().send(&app).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = call(Method::GET, "/api/players")
            .bearer("not-a-jwt".into())
            .send(&app)
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = call(Method::GET, "/api/players")
            .bearer(token(&["viewer"]))
            .send(&app)
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = call(Method::GET, "/api/players").send(&app).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let app = app().await;
        let player = create(
            &app,
            "/api/players",
            json!({"name": "Alice", "email": "alice@example.com"}),
        )
        .await;
        let id = player["id"].as_str().unwrap().to_string();
        assert!(id.starts_with("player_"));
        assert_eq!(player["scores"], json!([]));

        let response = call(Method::PATCH, &format!("/api/players/{}", id))
            .json(json!({"phone": "555-0100"}))
            .send(&app)
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = call(Method::GET, &format!("/api/players/{}", id)).send(&app).await;
        assert_eq!(response.status(), StatusCode::OK);
        let fetched = json_body(response).await;
        assert_eq!(fetched["name"], "Alice");
        assert_eq!(fetched["email"], "alice@example.com");
        assert_eq!(fetched["phone"], "555-0100");

        let response = call(Method::DELETE, &format!("/api/players/{}", id)).send(&app).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = call(Method::GET, &format!("/api/players/{}", id)).send(&app).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());

        let response = call(Method::DELETE, &format!("/api/players/{}", id)).send(&app).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_duplicate_id_and_validation() {
        let app = app().await;
        create(&app, "/api/games", json!({"id": "g1", "title": "Go"})).await;

        let response = call(Method::POST, "/api/games")
            .json(json!({"id": "g1"}))
            .send(&app)
            .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = call(Method::POST, "/api/scores")
            .json(json!({"scoreValue": 1_000_000_000}))
            .send(&app)
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_list_filter_sort_and_count() {
        let app = app().await;
        for (id, name) in [("p1", "Alice"), ("p2", "alfred"), ("p3", "Bob")] {
            create(&app, "/api/players", json!({"id": id, "name": name})).await;
        }

        let response = call(
            Method::GET,
            "/api/players?where.name.startsWith=al&sortBy=name:desc",
        )
        .send(&app)
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let list = json_body(response).await;
        let names: Vec<_> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names.len(), 2);

        let response = call(Method::POST, "/api/players/meta?where.name.startsWith=al")
            .anonymous()
            .send(&app)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"count": 2}));

        let response = call(Method::GET, "/api/players?where.nickname=x").send(&app).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "INVALID_QUERY");
    }

    #[tokio::test]
    async fn test_count_rejects_runaway_relation_chain() {
        let app = app().await;
        create(&app, "/api/players", json!({"id": "p1", "name": "Alice"})).await;

        let deep = format!(
            "/api/players/meta?where.{}id=p1",
            "scores.player.".repeat(600)
        );
        let response = call(Method::POST, &deep).anonymous().send(&app).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "INVALID_QUERY");

        let response = call(
            Method::POST,
            "/api/players/meta?where.scores.player.scores.player.id=p1",
        )
        .anonymous()
        .send(&app)
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"count": 0}));
    }

    #[tokio::test]
    async fn test_meta_is_count_only() {
        let app = app().await;
        let response = call(Method::GET, "/api/players/meta").send(&app).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_score_relations_over_http() {
        let app = app().await;
        create(&app, "/api/players", json!({"id": "p1", "name": "Alice"})).await;
        create(&app, "/api/scores", json!({"id": "s1", "scoreValue": 10})).await;
        create(&app, "/api/scores", json!({"id": "s2", "scoreValue": 20})).await;

        let response = call(Method::POST, "/api/players/p1/scores")
            .json(json!(["s1", {"id": "s2"}]))
            .send(&app)
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = call(Method::GET, "/api/scores/s1/player")
            .anonymous()
            .send(&app)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["id"], "p1");

        let response = call(Method::DELETE, "/api/players/p1/scores?id=s1")
            .send(&app)
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = call(Method::GET, "/api/players/p1/scores?where.scoreValue.gt=5")
            .send(&app)
            .await;
        let scores = json_body(response).await;
        assert_eq!(scores.as_array().unwrap().len(), 1);
        assert_eq!(scores[0]["id"], "s2");
        assert_eq!(scores[0]["player"], "p1");

        let response = call(Method::PATCH, "/api/players/p1/scores")
            .json(json!(["nothing-here"]))
            .send(&app)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = call(Method::GET, "/api/players/ghost/scores").send(&app).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unset_relation_is_reported() {
        let app = app().await;
        create(&app, "/api/scores", json!({"id": "s1"})).await;

        let response = call(Method::GET, "/api/scores/s1/game")
            .anonymous()
            .send(&app)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["code"], "RELATION_UNSET");

        let response = call(Method::GET, "/api/scores/missing/game")
            .anonymous()
            .send(&app)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }
}
