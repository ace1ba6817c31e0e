//! Typed per-field filter clauses
//!
//! Each entity filter is a struct of optional clause lists, one per field.
//! An empty list contributes no constraint. The clause enums are the closed
//! set of operations a field of that type supports; binding a query-string
//! value produces exactly one clause or a [`QueryError`].

use chrono::{DateTime, Utc};
use std::fmt;

use super::predicate::{FilterCondition, FilterValue, Predicate};
use super::QueryError;

/// Per-entity filter
///
/// Implementations map camelCase field names to columns, bind raw
/// query-string values into typed clauses, and compile themselves into a
/// [`Predicate`]. Compilation is pure.
pub trait Filter: Default + Clone + fmt::Debug + Send + Sync + 'static {
    /// Bind one `where.` parameter. `path` is the key split on `.` with the
    /// `where` prefix removed; `key` is the full parameter name for errors.
    fn bind(&mut self, key: &str, path: &[&str], raw: &str) -> Result<(), QueryError>;

    /// Column for a sortable camelCase field name
    fn sort_column(field: &str) -> Option<&'static str>;

    /// Compile into a predicate over this entity's table
    fn predicate(&self) -> Predicate;

    /// Whether no clause is set
    fn is_empty(&self) -> bool;

    /// Filter matching exactly the record with this id
    fn with_id(id: &str) -> Self;
}

/// Clause over a text column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringFilter {
    /// Exact match
    Equals(String),
    /// Anything but this value
    Not(String),
    /// Substring match
    Contains(String),
    /// Prefix match
    StartsWith(String),
    /// Suffix match
    EndsWith(String),
    /// One of the values
    In(Vec<String>),
    /// Null (`true`) or not null (`false`)
    IsNull(bool),
}

impl StringFilter {
    /// Parse a clause for operator `op` (None means equality)
    pub fn parse(key: &str, op: Option<&str>, raw: &str, nullable: bool) -> Result<Self, QueryError> {
        Ok(match op {
            None | Some("equals") => Self::Equals(raw.to_string()),
            Some("not") => Self::Not(raw.to_string()),
            Some("contains") => Self::Contains(raw.to_string()),
            Some("startsWith") => Self::StartsWith(raw.to_string()),
            Some("endsWith") => Self::EndsWith(raw.to_string()),
            Some("in") => Self::In(split_list(raw).map(str::to_string).collect()),
            Some("isNull") if nullable => Self::IsNull(parse_bool(key, raw)?),
            Some(other) => return Err(QueryError::unknown_operator(key, other)),
        })
    }

    /// Compile into a condition on `column`
    pub fn condition(&self, column: &'static str) -> FilterCondition {
        match self {
            Self::Equals(v) => FilterCondition::eq(column, v.as_str()),
            Self::Not(v) => FilterCondition::ne(column, v.as_str()),
            Self::Contains(v) => FilterCondition::contains(column, v),
            Self::StartsWith(v) => FilterCondition::starts_with(column, v),
            Self::EndsWith(v) => FilterCondition::ends_with(column, v),
            Self::In(values) => FilterCondition::in_list(column, values.clone()),
            Self::IsNull(true) => FilterCondition::is_null(column),
            Self::IsNull(false) => FilterCondition::is_not_null(column),
        }
    }
}

/// Values usable in ordered comparisons
pub trait ScalarValue: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Name of the expected type, for error messages
    const EXPECTED: &'static str;

    /// Parse a query-string value
    fn parse_value(raw: &str) -> Option<Self>;

    /// Bindable single value
    fn to_value(&self) -> FilterValue;

    /// Bindable list value
    fn to_list(values: &[Self]) -> FilterValue;
}

impl ScalarValue for i32 {
    const EXPECTED: &'static str = "an integer";

    fn parse_value(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }

    fn to_value(&self) -> FilterValue {
        FilterValue::Integer(i64::from(*self))
    }

    fn to_list(values: &[Self]) -> FilterValue {
        FilterValue::IntegerList(values.iter().map(|v| i64::from(*v)).collect())
    }
}

impl ScalarValue for DateTime<Utc> {
    const EXPECTED: &'static str = "an RFC 3339 timestamp";

    fn parse_value(raw: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    fn to_value(&self) -> FilterValue {
        FilterValue::Timestamp(*self)
    }

    fn to_list(values: &[Self]) -> FilterValue {
        FilterValue::TimestampList(values.to_vec())
    }
}

/// Clause over an ordered column (integers, timestamps)
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarFilter<T> {
    /// Exact match
    Equals(T),
    /// Anything but this value
    Not(T),
    /// Strictly less than
    Lt(T),
    /// Less than or equal
    Lte(T),
    /// Strictly greater than
    Gt(T),
    /// Greater than or equal
    Gte(T),
    /// One of the values
    In(Vec<T>),
    /// Null (`true`) or not null (`false`)
    IsNull(bool),
}

impl<T: ScalarValue> ScalarFilter<T> {
    /// Parse a clause for operator `op` (None means equality)
    pub fn parse(key: &str, op: Option<&str>, raw: &str, nullable: bool) -> Result<Self, QueryError> {
        let value = || T::parse_value(raw).ok_or_else(|| QueryError::invalid_value(key, raw, T::EXPECTED));
        Ok(match op {
            None | Some("equals") => Self::Equals(value()?),
            Some("not") => Self::Not(value()?),
            Some("lt") => Self::Lt(value()?),
            Some("lte") => Self::Lte(value()?),
            Some("gt") => Self::Gt(value()?),
            Some("gte") => Self::Gte(value()?),
            Some("in") => Self::In(
                split_list(raw)
                    .map(|item| {
                        T::parse_value(item)
                            .ok_or_else(|| QueryError::invalid_value(key, item, T::EXPECTED))
                    })
                    .collect::<Result<_, _>>()?,
            ),
            Some("isNull") if nullable => Self::IsNull(parse_bool(key, raw)?),
            Some(other) => return Err(QueryError::unknown_operator(key, other)),
        })
    }

    /// Compile into a condition on `column`
    pub fn condition(&self, column: &'static str) -> FilterCondition {
        match self {
            Self::Equals(v) => FilterCondition::eq(column, v.to_value()),
            Self::Not(v) => FilterCondition::ne(column, v.to_value()),
            Self::Lt(v) => FilterCondition::lt(column, v.to_value()),
            Self::Lte(v) => FilterCondition::lte(column, v.to_value()),
            Self::Gt(v) => FilterCondition::gt(column, v.to_value()),
            Self::Gte(v) => FilterCondition::gte(column, v.to_value()),
            Self::In(values) => FilterCondition::in_list(column, T::to_list(values)),
            Self::IsNull(true) => FilterCondition::is_null(column),
            Self::IsNull(false) => FilterCondition::is_not_null(column),
        }
    }
}

/// Bind a text field: `rest` is empty (equality) or a single operator
pub fn bind_string(
    clauses: &mut Vec<StringFilter>,
    key: &str,
    rest: &[&str],
    raw: &str,
    nullable: bool,
) -> Result<(), QueryError> {
    let op = single_operator(key, rest)?;
    clauses.push(StringFilter::parse(key, op, raw, nullable)?);
    Ok(())
}

/// Bind an ordered field: `rest` is empty (equality) or a single operator
pub fn bind_scalar<T: ScalarValue>(
    clauses: &mut Vec<ScalarFilter<T>>,
    key: &str,
    rest: &[&str],
    raw: &str,
    nullable: bool,
) -> Result<(), QueryError> {
    let op = single_operator(key, rest)?;
    clauses.push(ScalarFilter::parse(key, op, raw, nullable)?);
    Ok(())
}

/// Predicates for every text clause on `column`
pub fn string_predicates<'a>(
    column: &'static str,
    clauses: &'a [StringFilter],
) -> impl Iterator<Item = Predicate> + 'a {
    clauses.iter().map(move |c| Predicate::Condition(c.condition(column)))
}

/// Predicates for every ordered clause on `column`
pub fn scalar_predicates<'a, T: ScalarValue>(
    column: &'static str,
    clauses: &'a [ScalarFilter<T>],
) -> impl Iterator<Item = Predicate> + 'a {
    clauses.iter().map(move |c| Predicate::Condition(c.condition(column)))
}

fn single_operator<'a>(key: &str, rest: &[&'a str]) -> Result<Option<&'a str>, QueryError> {
    match rest {
        [] => Ok(None),
        [op] => Ok(Some(*op)),
        _ => Err(QueryError::UnknownField(key.to_string())),
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, QueryError> {
    match raw.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(QueryError::invalid_value(key, raw, "a boolean")),
    }
}
