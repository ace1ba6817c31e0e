//! SQL compilation for SQLite
//!
//! Identifiers come from static entity tables and are quoted; every value is
//! a bound parameter. Nested relation filters become correlated `EXISTS`
//! subqueries with their own table alias.

use sqlx::{QueryBuilder, Sqlite};

use super::pipeline::Query;
use super::predicate::{FilterCondition, FilterOperator, FilterValue, Predicate};

/// Alias of the outermost table
const ROOT_ALIAS: &str = "t0";

/// `SELECT <columns> FROM <table> WHERE ... ORDER BY ... LIMIT ... OFFSET ...`
pub(crate) fn select(table: &str, columns: &[&str], query: &Query) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new("SELECT ");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(format!("{ROOT_ALIAS}.\"{column}\" AS \"{column}\""));
    }
    qb.push(format!(" FROM \"{table}\" AS {ROOT_ALIAS}"));
    push_where(&mut qb, &query.predicate);

    if let Some(sort) = query.sort {
        qb.push(format!(
            " ORDER BY {ROOT_ALIAS}.\"{}\" {}",
            sort.column,
            sort.direction.as_sql()
        ));
    }

    let pagination = query.pagination;
    match pagination.take {
        Some(take) => {
            qb.push(" LIMIT ").push_bind(to_i64(take));
            qb.push(" OFFSET ").push_bind(to_i64(pagination.skip));
        }
        // SQLite requires a LIMIT before OFFSET; -1 means no limit
        None if pagination.skip > 0 => {
            qb.push(" LIMIT -1 OFFSET ").push_bind(to_i64(pagination.skip));
        }
        None => {}
    }

    qb
}

/// `SELECT COUNT(*) FROM <table> WHERE ...`
pub(crate) fn count(table: &str, predicate: &Predicate) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM \"{table}\" AS {ROOT_ALIAS}"));
    push_where(&mut qb, predicate);
    qb
}

fn push_where(qb: &mut QueryBuilder<'static, Sqlite>, predicate: &Predicate) {
    if predicate.is_all() {
        return;
    }
    qb.push(" WHERE ");
    let mut next_alias = 1;
    push_predicate(qb, predicate, ROOT_ALIAS, &mut next_alias);
}

fn push_predicate(
    qb: &mut QueryBuilder<'static, Sqlite>,
    predicate: &Predicate,
    alias: &str,
    next_alias: &mut usize,
) {
    match predicate {
        Predicate::All => {
            qb.push("1 = 1");
        }
        Predicate::Condition(condition) => push_condition(qb, condition, alias),
        Predicate::And(parts) => {
            qb.push("(");
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    qb.push(" AND ");
                }
                push_predicate(qb, part, alias, next_alias);
            }
            qb.push(")");
        }
        Predicate::Exists { join, predicate } => {
            let inner = format!("t{}", *next_alias);
            *next_alias += 1;
            qb.push(format!(
                "EXISTS (SELECT 1 FROM \"{}\" AS {inner} WHERE {inner}.\"{}\" = {alias}.\"{}\"",
                join.table, join.inner_column, join.outer_column
            ));
            if !predicate.is_all() {
                qb.push(" AND ");
                push_predicate(qb, predicate, &inner, next_alias);
            }
            qb.push(")");
        }
    }
}

fn push_condition(qb: &mut QueryBuilder<'static, Sqlite>, condition: &FilterCondition, alias: &str) {
    let column = format!("{alias}.\"{}\"", condition.column);

    match condition.operator {
        FilterOperator::IsNull | FilterOperator::IsNotNull => {
            qb.push(format!("{column} {}", condition.operator));
        }
        FilterOperator::In => match &condition.value {
            FilterValue::TextList(values) if !values.is_empty() => {
                push_in_list(qb, &column, values.iter().cloned().map(FilterValue::Text));
            }
            FilterValue::IntegerList(values) if !values.is_empty() => {
                push_in_list(qb, &column, values.iter().copied().map(FilterValue::Integer));
            }
            FilterValue::TimestampList(values) if !values.is_empty() => {
                push_in_list(qb, &column, values.iter().copied().map(FilterValue::Timestamp));
            }
            // Empty lists match nothing
            _ => {
                qb.push("1 = 0");
            }
        },
        FilterOperator::Like => {
            qb.push(format!("{column} LIKE "));
            push_value(qb, &condition.value);
            qb.push(" ESCAPE '\\'");
        }
        operator => {
            qb.push(format!("{column} {operator} "));
            push_value(qb, &condition.value);
        }
    }
}

fn push_in_list(
    qb: &mut QueryBuilder<'static, Sqlite>,
    column: &str,
    values: impl Iterator<Item = FilterValue>,
) {
    qb.push(format!("{column} IN ("));
    for (i, value) in values.enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_value(qb, &value);
    }
    qb.push(")");
}

fn push_value(qb: &mut QueryBuilder<'static, Sqlite>, value: &FilterValue) {
    match value {
        FilterValue::Text(v) => {
            qb.push_bind(v.clone());
        }
        FilterValue::Integer(v) => {
            qb.push_bind(*v);
        }
        FilterValue::Timestamp(v) => {
            qb.push_bind(*v);
        }
        FilterValue::TextList(_)
        | FilterValue::IntegerList(_)
        | FilterValue::TimestampList(_)
        | FilterValue::Null => {
            qb.push("NULL");
        }
    }
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Pagination, RelationJoin, Sort};

    fn query(predicate: Predicate) -> Query {
        Query {
            predicate,
            sort: None,
            pagination: Pagination::default(),
        }
    }

    #[test]
    fn test_match_all_has_no_where_clause() {
        let qb = select("players", &["id", "name"], &query(Predicate::All));
        assert_eq!(
            qb.sql(),
            "SELECT t0.\"id\" AS \"id\", t0.\"name\" AS \"name\" FROM \"players\" AS t0"
        );
    }

    #[test]
    fn test_filter_sort_then_window() {
        let q = Query {
            predicate: FilterCondition::eq("name", "Alice").into(),
            sort: Some(Sort::asc("created_at")),
            pagination: Pagination::new(1, 2),
        };
        let qb = select("players", &["id"], &q);
        assert_eq!(
            qb.sql(),
            "SELECT t0.\"id\" AS \"id\" FROM \"players\" AS t0 WHERE t0.\"name\" = ? \
             ORDER BY t0.\"created_at\" ASC LIMIT ? OFFSET ?"
        );
    }

    #[test]
    fn test_skip_without_take_uses_unbounded_limit() {
        let q = Query {
            predicate: Predicate::All,
            sort: None,
            pagination: Pagination { skip: 3, take: None },
        };
        assert!(select("games", &["id"], &q).sql().ends_with(" LIMIT -1 OFFSET ?"));
    }

    #[test]
    fn test_conjunction_and_like() {
        let predicate = Predicate::all_of([
            FilterCondition::contains("title", "chess").into(),
            FilterCondition::is_not_null("genre").into(),
        ]);
        let qb = count("games", &predicate);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM \"games\" AS t0 WHERE (t0.\"title\" LIKE ? ESCAPE '\\' \
             AND t0.\"genre\" IS NOT NULL)"
        );
    }

    #[test]
    fn test_in_lists() {
        let qb = count(
            "scores",
            &FilterCondition::in_list("id", vec!["a".to_string(), "b".to_string()]).into(),
        );
        assert!(qb.sql().ends_with("WHERE t0.\"id\" IN (?, ?)"));

        let qb = count("scores", &FilterCondition::in_list("id", Vec::<String>::new()).into());
        assert!(qb.sql().ends_with("WHERE 1 = 0"));
    }

    #[test]
    fn test_nested_exists_gets_fresh_aliases() {
        let to_player = RelationJoin {
            table: "players",
            inner_column: "id",
            outer_column: "player_id",
        };
        let to_scores = RelationJoin {
            table: "scores",
            inner_column: "player_id",
            outer_column: "id",
        };
        let predicate = Predicate::exists(
            to_player,
            Predicate::exists(to_scores, FilterCondition::gt("score_value", 10).into()),
        );
        let qb = count("scores", &predicate);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM \"scores\" AS t0 WHERE \
             EXISTS (SELECT 1 FROM \"players\" AS t1 WHERE t1.\"id\" = t0.\"player_id\" AND \
             EXISTS (SELECT 1 FROM \"scores\" AS t2 WHERE t2.\"player_id\" = t1.\"id\" AND \
             t2.\"score_value\" > ?))"
        );
    }
}
