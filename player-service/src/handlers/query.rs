//! Request extractors for list arguments and id lists

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, Uri},
};

use super::error::{ApiError, ApiErrorKind};
use crate::models::{ref_ids, EntityRef};
use crate::query::{FindManyArgs, Filter};

/// `where.*`, `sortBy`, `skip` and `take` bound from the query string
///
/// Rejects with `INVALID_QUERY` on any unknown or malformed parameter.
#[derive(Debug, Clone)]
pub struct ListArgs<F: Filter>(pub FindManyArgs<F>);

impl<F, S> FromRequestParts<S> for ListArgs<F>
where
    F: Filter,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let pairs = query_pairs(&parts.uri)?;
        Ok(Self(FindManyArgs::from_pairs(&pairs)?))
    }
}

/// Child ids for a connect, disconnect or replace call
///
/// Read from a JSON array of ids or `{"id": ...}` objects. An empty body
/// falls back to repeated `id=` query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdList(pub Vec<String>);

impl<S> FromRequest<S> for IdList
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let uri = req.uri().clone();
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;

        if body.iter().all(u8::is_ascii_whitespace) {
            let ids = query_pairs(&uri)?
                .into_iter()
                .filter(|(key, _)| key == "id")
                .map(|(_, value)| value)
                .collect();
            return Ok(Self(ids));
        }

        let refs: Vec<EntityRef> = serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("Expected an array of ids: {}", e)))?;
        Ok(Self(ref_ids(&refs)))
    }
}

fn query_pairs(uri: &Uri) -> Result<Vec<(String, String)>, ApiError> {
    Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map(|Query(pairs)| pairs)
        .map_err(|e| ApiError::new(ApiErrorKind::InvalidQuery, e.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlayerWhere;
    use axum::body::Body;

    async fn ids(uri: &str, body: &'static str) -> Result<IdList, ApiError> {
        let req = axum::http::Request::post(uri).body(Body::from(body)).unwrap();
        IdList::from_request(req, &()).await
    }

    #[tokio::test]
    async fn test_ids_from_mixed_json_array() {
        let list = ids("/x", r#"["s1", {"id": "s2"}]"#).await.unwrap();
        assert_eq!(list.0, vec!["s1", "s2"]);
    }

    #[tokio::test]
    async fn test_ids_from_query_when_body_empty() {
        let list = ids("/x?id=s1&id=s2&other=1", "").await.unwrap();
        assert_eq!(list.0, vec!["s1", "s2"]);

        let list = ids("/x", "  ").await.unwrap();
        assert!(list.0.is_empty());
    }

    #[tokio::test]
    async fn test_ids_reject_non_array() {
        let err = ids("/x", r#"{"id": "s1"}"#).await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_list_args_from_query_string() {
        let req = axum::http::Request::get("/players?where.name.contains=al&sortBy=name:desc&take=3")
            .body(())
            .unwrap();
        let (mut parts, _) = req.into_parts();
        let ListArgs(args) = ListArgs::<PlayerWhere>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(args.pagination.take, Some(3));
        assert!(!args.filter.is_empty());
    }

    #[tokio::test]
    async fn test_list_args_reject_unknown_parameter() {
        let req = axum::http::Request::get("/players?limit=3").body(()).unwrap();
        let (mut parts, _) = req.into_parts();
        let err = ListArgs::<PlayerWhere>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::InvalidQuery);
    }
}
