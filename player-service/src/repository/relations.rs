//! One-to-many relationship synchronization
//!
//! A parent (player or game) owns children (scores) through a nullable
//! foreign key on the child. Connect, disconnect and replace all follow the
//! same shape inside one transaction:
//!
//! 1. the parent must exist
//! 2. load the parent's current children and the requested children that exist
//! 3. compute a [`LinkPlan`], a pure set difference
//! 4. write only the foreign keys that change
//!
//! Connecting a child owned by another parent moves it.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::{BTreeSet, HashMap};

use super::error::{RepositoryError, RepositoryOperation, RepositoryResult};

/// Ids bound per `IN (...)` list, well below SQLite's variable limit
pub(crate) const ID_CHUNK: usize = 500;

/// A parent-to-children link through a foreign key on the child table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    /// Parent entity name
    pub parent: &'static str,
    /// Parent table
    pub parent_table: &'static str,
    /// Child entity name
    pub child: &'static str,
    /// Child table
    pub child_table: &'static str,
    /// Foreign key column on the child table
    pub foreign_key: &'static str,
}

/// Player 1-N Score
pub const PLAYER_SCORES: Relation = Relation {
    parent: "Player",
    parent_table: "players",
    child: "Score",
    child_table: "scores",
    foreign_key: "player_id",
};

/// Game 1-N Score
pub const GAME_SCORES: Relation = Relation {
    parent: "Game",
    parent_table: "games",
    child: "Score",
    child_table: "scores",
    foreign_key: "game_id",
};

/// Association change requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Add children, keeping the existing ones
    Connect,
    /// Remove children that are currently linked
    Disconnect,
    /// Make the child set exactly the requested one
    Replace,
}

impl SyncMode {
    /// Operation reported in errors
    pub fn operation(&self) -> RepositoryOperation {
        match self {
            Self::Connect => RepositoryOperation::Connect,
            Self::Disconnect => RepositoryOperation::Disconnect,
            Self::Replace => RepositoryOperation::Replace,
        }
    }

    /// Whether a request where no child exists is an error
    pub fn requires_match(&self) -> bool {
        !matches!(self, Self::Disconnect)
    }

    /// Foreign-key writes turning `current` into the requested state
    pub fn plan(&self, current: &BTreeSet<String>, matched: &BTreeSet<String>) -> LinkPlan {
        match self {
            Self::Connect => LinkPlan {
                link: matched.difference(current).cloned().collect(),
                unlink: Vec::new(),
            },
            Self::Disconnect => LinkPlan {
                link: Vec::new(),
                unlink: matched.intersection(current).cloned().collect(),
            },
            Self::Replace => LinkPlan {
                link: matched.difference(current).cloned().collect(),
                unlink: current.difference(matched).cloned().collect(),
            },
        }
    }
}

/// Children whose foreign key must be set to the parent or cleared
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPlan {
    /// Point at the parent
    pub link: Vec<String>,
    /// Clear
    pub unlink: Vec<String>,
}

impl LinkPlan {
    /// Nothing to write
    pub fn is_empty(&self) -> bool {
        self.link.is_empty() && self.unlink.is_empty()
    }
}

/// Apply `sync` for `parent_id` on an open transaction
///
/// With `strict` set, a request matching no existing child fails with
/// NotFound before anything is written, for the modes that require a match.
pub(crate) async fn synchronize(
    conn: &mut SqliteConnection,
    relation: &Relation,
    sync: SyncMode,
    parent_id: &str,
    child_ids: &[String],
    strict: bool,
) -> RepositoryResult<LinkPlan> {
    let operation = sync.operation();

    if !row_exists(conn, relation.parent_table, parent_id, operation).await? {
        return Err(RepositoryError::not_found(relation.parent, parent_id).with_operation(operation));
    }

    let current = child_ids_of(conn, relation, parent_id, operation).await?;
    let matched = existing_ids(conn, relation.child_table, child_ids, operation).await?;

    if strict && sync.requires_match() && matched.is_empty() {
        return Err(RepositoryError::no_children_matched(operation, relation.child));
    }

    let plan = sync.plan(&current, &matched);

    for chunk in plan.link.chunks(ID_CHUNK) {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "UPDATE \"{}\" SET \"{}\" = ",
            relation.child_table, relation.foreign_key
        ));
        qb.push_bind(parent_id.to_string());
        qb.push(" WHERE \"id\" IN ");
        push_id_list(&mut qb, chunk);
        qb.build()
            .execute(&mut *conn)
            .await
            .map_err(|e| RepositoryError::from_sqlx(operation, e))?;
    }

    for chunk in plan.unlink.chunks(ID_CHUNK) {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "UPDATE \"{}\" SET \"{fk}\" = NULL WHERE \"{fk}\" = ",
            relation.child_table,
            fk = relation.foreign_key
        ));
        qb.push_bind(parent_id.to_string());
        qb.push(" AND \"id\" IN ");
        push_id_list(&mut qb, chunk);
        qb.build()
            .execute(&mut *conn)
            .await
            .map_err(|e| RepositoryError::from_sqlx(operation, e))?;
    }

    tracing::debug!(
        parent = relation.parent,
        parent_id,
        ?sync,
        linked = plan.link.len(),
        unlinked = plan.unlink.len(),
        "Synchronized relation"
    );

    Ok(plan)
}

/// Whether `table` has a row with this id
pub(crate) async fn row_exists(
    conn: &mut SqliteConnection,
    table: &str,
    id: &str,
    operation: RepositoryOperation,
) -> RepositoryResult<bool> {
    let found: Option<i64> = sqlx::query_scalar(&format!("SELECT 1 FROM \"{}\" WHERE \"id\" = ?", table))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| RepositoryError::from_sqlx(operation, e))?;
    Ok(found.is_some())
}

/// `id` if a row with it exists in `table`, otherwise `None`
pub(crate) async fn resolve_ref(
    conn: &mut SqliteConnection,
    table: &str,
    id: Option<&str>,
    operation: RepositoryOperation,
) -> RepositoryResult<Option<String>> {
    let Some(id) = id else {
        return Ok(None);
    };
    if row_exists(conn, table, id, operation).await? {
        Ok(Some(id.to_string()))
    } else {
        tracing::debug!(table, id, "Dropping reference to missing row");
        Ok(None)
    }
}

/// Child ids per parent, for parents in `parent_ids`
pub(crate) async fn load_child_ids(
    conn: &mut SqliteConnection,
    relation: &Relation,
    parent_ids: &[String],
) -> RepositoryResult<HashMap<String, Vec<String>>> {
    let mut by_parent: HashMap<String, Vec<String>> = HashMap::new();
    for chunk in parent_ids.chunks(ID_CHUNK) {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT \"id\", \"{fk}\" FROM \"{}\" WHERE \"{fk}\" IN ",
            relation.child_table,
            fk = relation.foreign_key
        ));
        push_id_list(&mut qb, chunk);
        qb.push(" ORDER BY \"id\"");

        let rows = qb
            .build_query_as::<(String, String)>()
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| RepositoryError::from_sqlx(RepositoryOperation::List, e))?;

        for (child_id, parent_id) in rows {
            by_parent.entry(parent_id).or_default().push(child_id);
        }
    }
    Ok(by_parent)
}

async fn child_ids_of(
    conn: &mut SqliteConnection,
    relation: &Relation,
    parent_id: &str,
    operation: RepositoryOperation,
) -> RepositoryResult<BTreeSet<String>> {
    let ids: Vec<String> = sqlx::query_scalar(&format!(
        "SELECT \"id\" FROM \"{}\" WHERE \"{}\" = ?",
        relation.child_table, relation.foreign_key
    ))
    .bind(parent_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| RepositoryError::from_sqlx(operation, e))?;
    Ok(ids.into_iter().collect())
}

async fn existing_ids(
    conn: &mut SqliteConnection,
    table: &str,
    ids: &[String],
    operation: RepositoryOperation,
) -> RepositoryResult<BTreeSet<String>> {
    let mut found = BTreeSet::new();
    for chunk in ids.chunks(ID_CHUNK) {
        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT \"id\" FROM \"{}\" WHERE \"id\" IN ", table));
        push_id_list(&mut qb, chunk);

        let rows = qb
            .build_query_scalar::<String>()
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| RepositoryError::from_sqlx(operation, e))?;
        found.extend(rows);
    }
    Ok(found)
}

fn push_id_list(qb: &mut QueryBuilder<'_, Sqlite>, ids: &[String]) {
    qb.push("(");
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(id.clone());
    }
    separated.push_unseparated(")");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn vec(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_connect_links_only_new_children() {
        let plan = SyncMode::Connect.plan(&set(&["s1", "s2"]), &set(&["s2", "s3"]));
        assert_eq!(plan.link, vec(&["s3"]));
        assert!(plan.unlink.is_empty());
    }

    #[test]
    fn test_connect_twice_is_a_no_op() {
        let plan = SyncMode::Connect.plan(&set(&["s1"]), &set(&["s1"]));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_disconnect_only_touches_linked_children() {
        let plan = SyncMode::Disconnect.plan(&set(&["s1", "s2"]), &set(&["s2", "s9"]));
        assert!(plan.link.is_empty());
        assert_eq!(plan.unlink, vec(&["s2"]));
    }

    #[test]
    fn test_replace_is_exact() {
        let plan = SyncMode::Replace.plan(&set(&["s1", "s2"]), &set(&["s2", "s3"]));
        assert_eq!(plan.link, vec(&["s3"]));
        assert_eq!(plan.unlink, vec(&["s1"]));
    }

    #[test]
    fn test_replace_with_nothing_unlinks_everything() {
        let plan = SyncMode::Replace.plan(&set(&["s1", "s2"]), &BTreeSet::new());
        assert!(plan.link.is_empty());
        assert_eq!(plan.unlink, vec(&["s1", "s2"]));
    }

    #[test]
    fn test_match_requirements() {
        assert!(SyncMode::Connect.requires_match());
        assert!(SyncMode::Replace.requires_match());
        assert!(!SyncMode::Disconnect.requires_match());
        assert_eq!(SyncMode::Replace.operation(), RepositoryOperation::Replace);
    }

    #[test]
    fn test_id_list_sql() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT 1 WHERE x IN ");
        push_id_list(&mut qb, &vec(&["a", "b", "c"]));
        assert_eq!(qb.sql(), "SELECT 1 WHERE x IN (?, ?, ?)");
    }
}
