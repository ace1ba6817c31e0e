//! Query pipeline: filter, sort, skip, take

use sqlx::{sqlite::SqliteRow, FromRow, SqliteConnection};

use super::filter::Filter;
use super::predicate::{FilterCondition, Pagination, Predicate, Sort};
use super::sql;
use crate::repository::{RepositoryError, RepositoryOperation, RepositoryResult};

/// A stored record type the pipeline can list and count
pub trait Entity: for<'r> FromRow<'r, SqliteRow> + Send + Unpin + 'static {
    /// Display name used in errors and logs
    const NAME: &'static str;
    /// Table name
    const TABLE: &'static str;
    /// Selected columns, matching the `FromRow` field names
    const COLUMNS: &'static [&'static str];

    /// Filter type for this entity
    type Filter: Filter;
}

/// A compiled list/count request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    /// Row filter
    pub predicate: Predicate,
    /// Optional sort key; store order otherwise
    pub sort: Option<Sort>,
    /// Window applied after sorting
    pub pagination: Pagination,
}

impl Query {
    /// Query matching every row
    pub fn all() -> Self {
        Self::default()
    }

    /// Query matching the row with this id
    pub fn by_id(id: &str) -> Self {
        Self {
            predicate: FilterCondition::eq("id", id).into(),
            ..Self::default()
        }
    }

    /// Additionally require `column = value`
    #[must_use]
    pub fn scoped(mut self, column: &'static str, value: &str) -> Self {
        self.predicate = Predicate::from(FilterCondition::eq(column, value)).and(self.predicate);
        self
    }

    /// Same filter without sort or window, for counting
    pub fn unpaged(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            sort: None,
            pagination: Pagination::default(),
        }
    }
}

/// Run `query` against `E`'s table
pub async fn list<E: Entity>(conn: &mut SqliteConnection, query: &Query) -> RepositoryResult<Vec<E>> {
    let mut qb = sql::select(E::TABLE, E::COLUMNS, query);
    tracing::debug!(entity = E::NAME, sql = qb.sql(), "list");

    qb.build_query_as::<E>()
        .fetch_all(conn)
        .await
        .map_err(|e| RepositoryError::from_sqlx(RepositoryOperation::List, e))
}

/// Count rows of `E` matching `predicate`
pub async fn count<E: Entity>(conn: &mut SqliteConnection, predicate: &Predicate) -> RepositoryResult<i64> {
    let mut qb = sql::count(E::TABLE, predicate);
    tracing::debug!(entity = E::NAME, sql = qb.sql(), "count");

    qb.build_query_scalar::<i64>()
        .fetch_one(conn)
        .await
        .map_err(|e| RepositoryError::from_sqlx(RepositoryOperation::Count, e))
}
