//! Statement helpers shared by the entity repositories

use sqlx::pool::PoolConnection;
use sqlx::{Encode, QueryBuilder, Sqlite, SqliteConnection, SqlitePool, Transaction, Type};

use super::error::{RepositoryError, RepositoryErrorKind, RepositoryOperation, RepositoryResult};
use super::relations::row_exists;

/// `UPDATE <table> SET ...` over the columns actually supplied
pub(crate) struct UpdateSet {
    table: &'static str,
    qb: QueryBuilder<'static, Sqlite>,
    columns: usize,
}

impl UpdateSet {
    pub(crate) fn new(table: &'static str) -> Self {
        Self {
            table,
            qb: QueryBuilder::new(format!("UPDATE \"{}\" SET ", table)),
            columns: 0,
        }
    }

    /// Assign `column` when `value` is present
    pub(crate) fn set<T>(&mut self, column: &'static str, value: Option<T>) -> &mut Self
    where
        T: 'static + Encode<'static, Sqlite> + Type<Sqlite>,
    {
        if let Some(value) = value {
            if self.columns > 0 {
                self.qb.push(", ");
            }
            self.qb.push(format!("\"{}\" = ", column));
            self.qb.push_bind(value);
            self.columns += 1;
        }
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.columns == 0
    }

    /// Run against the row with `id`
    ///
    /// An empty set only checks that the row exists. A write that matches no
    /// row is re-checked: a missing row is NotFound, a present one means the
    /// write lost a race.
    pub(crate) async fn execute(
        mut self,
        conn: &mut SqliteConnection,
        entity: &'static str,
        id: &str,
    ) -> RepositoryResult<()> {
        let operation = RepositoryOperation::Update;

        if !self.is_empty() {
            self.qb.push(" WHERE \"id\" = ");
            self.qb.push_bind(id.to_string());
            let affected = self
                .qb
                .build()
                .execute(&mut *conn)
                .await
                .map_err(|e| RepositoryError::from_sqlx(operation, e).with_entity(entity, id))?
                .rows_affected();
            if affected > 0 {
                return Ok(());
            }
        }

        if row_exists(conn, self.table, id, operation).await? {
            if self.is_empty() {
                return Ok(());
            }
            tracing::warn!(entity, id, "Update matched no row although the record exists");
            Err(RepositoryError::concurrency_conflict(entity, id))
        } else {
            Err(RepositoryError::not_found(entity, id).with_operation(operation))
        }
    }
}

/// Delete the row with `id`, NotFound when there is none
pub(crate) async fn delete_row(
    pool: &SqlitePool,
    table: &'static str,
    entity: &'static str,
    id: &str,
) -> RepositoryResult<()> {
    let operation = RepositoryOperation::Delete;
    let affected = sqlx::query(&format!("DELETE FROM \"{}\" WHERE \"id\" = ?", table))
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(operation, e).with_entity(entity, id))?
        .rows_affected();

    if affected == 0 {
        return Err(RepositoryError::not_found(entity, id).with_operation(operation));
    }
    tracing::debug!(entity, id, "Deleted");
    Ok(())
}

/// Classify an INSERT failure, naming the taken id on a duplicate
pub(crate) fn insert_error(entity: &'static str, id: &str, err: sqlx::Error) -> RepositoryError {
    let error = RepositoryError::from_sqlx(RepositoryOperation::Create, err);
    if error.kind == RepositoryErrorKind::AlreadyExists {
        RepositoryError::already_exists(entity, id)
    } else {
        error.with_entity(entity, id)
    }
}

/// Open a write transaction for `operation`
///
/// `BEGIN IMMEDIATE` takes the write lock at the start, so concurrent writers
/// queue on the busy timeout instead of failing a read-to-write lock upgrade.
pub(crate) async fn begin(
    pool: &SqlitePool,
    operation: RepositoryOperation,
) -> RepositoryResult<Transaction<'static, Sqlite>> {
    pool.begin_with("BEGIN IMMEDIATE")
        .await
        .map_err(|e| RepositoryError::from_sqlx(operation, e))
}

/// Commit `tx`, attributing failures to `operation`
pub(crate) async fn commit(
    tx: Transaction<'static, Sqlite>,
    operation: RepositoryOperation,
) -> RepositoryResult<()> {
    tx.commit()
        .await
        .map_err(|e| RepositoryError::from_sqlx(operation, e))
}

/// Check a connection out of the pool
pub(crate) async fn acquire(
    pool: &SqlitePool,
    operation: RepositoryOperation,
) -> RepositoryResult<PoolConnection<Sqlite>> {
    pool.acquire()
        .await
        .map_err(|e| RepositoryError::from_sqlx(operation, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_update_set_only_lists_present_columns() {
        let mut set = UpdateSet::new("players");
        set.set("name", Some("Bob".to_string()))
            .set::<Option<String>>("email", None)
            .set("phone", Some(None::<String>))
            .set("updated_at", Some(Utc::now()));
        assert!(!set.is_empty());
        assert_eq!(
            set.qb.sql(),
            "UPDATE \"players\" SET \"name\" = ?, \"phone\" = ?, \"updated_at\" = ?"
        );
    }

    #[test]
    fn test_empty_update_set() {
        let mut set = UpdateSet::new("games");
        set.set::<String>("title", None);
        assert!(set.is_empty());
    }

    #[test]
    fn test_insert_error_keeps_other_kinds() {
        let err = insert_error("Score", "score_1", sqlx::Error::PoolTimedOut);
        assert_eq!(err.kind, RepositoryErrorKind::Timeout);
        assert_eq!(err.entity_id.as_deref(), Some("score_1"));
    }
}
