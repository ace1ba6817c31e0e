//! Predicate, ordering and pagination primitives
//!
//! A [`Predicate`] is the compiled, store-agnostic form of a filter. It is
//! built by [`Filter::predicate`](super::Filter::predicate) and consumed by the
//! SQL compiler. Column names are always `&'static str` taken from the entity
//! tables, never from request input.
//!
//! # Example
//!
//! ```rust
//! use player_service::query::{FilterCondition, Predicate};
//!
//! let predicate = Predicate::all_of([
//!     Predicate::from(FilterCondition::eq("name", "Alice")),
//!     Predicate::All,
//!     Predicate::from(FilterCondition::gte("score_value", 10)),
//! ]);
//! assert!(matches!(predicate, Predicate::And(ref parts) if parts.len() == 2));
//! ```

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Ascending order (A-Z, 0-9, oldest first)
    #[default]
    Ascending,
    /// Descending order (Z-A, 9-0, newest first)
    Descending,
}

impl OrderDirection {
    /// SQL keyword for this direction
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

impl FromStr for OrderDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            _ => Err(()),
        }
    }
}

/// A validated sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    /// Column to order by
    pub column: &'static str,
    /// Direction
    pub direction: OrderDirection,
}

impl Sort {
    /// Ascending sort on `column`
    pub const fn asc(column: &'static str) -> Self {
        Self {
            column,
            direction: OrderDirection::Ascending,
        }
    }

    /// Descending sort on `column`
    pub const fn desc(column: &'static str) -> Self {
        Self {
            column,
            direction: OrderDirection::Descending,
        }
    }
}

/// Offset/limit window applied after sorting
///
/// `take: None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    /// Number of rows to skip
    pub skip: u64,
    /// Maximum rows to return
    pub take: Option<u64>,
}

impl Pagination {
    /// Create a bounded window
    #[must_use]
    pub const fn new(skip: u64, take: u64) -> Self {
        Self {
            skip,
            take: Some(take),
        }
    }

    /// Whether the window restricts the result at all
    pub const fn is_unbounded(&self) -> bool {
        self.skip == 0 && self.take.is_none()
    }
}

/// Comparison operators available in filter conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to (=)
    Equal,
    /// Not equal to (!=)
    NotEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal to (>=)
    GreaterThanOrEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal to (<=)
    LessThanOrEqual,
    /// Pattern match with `\` as escape character
    Like,
    /// Value in list
    In,
    /// Is null check
    IsNull,
    /// Is not null check
    IsNotNull,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterThanOrEqual => write!(f, ">="),
            Self::LessThan => write!(f, "<"),
            Self::LessThanOrEqual => write!(f, "<="),
            Self::Like => write!(f, "LIKE"),
            Self::In => write!(f, "IN"),
            Self::IsNull => write!(f, "IS NULL"),
            Self::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

/// A typed value bound into a condition
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Text value
    Text(String),
    /// Integer value
    Integer(i64),
    /// Timestamp value
    Timestamp(DateTime<Utc>),
    /// List of text values
    TextList(Vec<String>),
    /// List of integer values
    IntegerList(Vec<i64>),
    /// List of timestamps
    TimestampList(Vec<DateTime<Utc>>),
    /// No value (null checks)
    Null,
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(list: Vec<String>) -> Self {
        Self::TextList(list)
    }
}

/// One column constraint
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    /// Column name
    pub column: &'static str,
    /// Comparison operator
    pub operator: FilterOperator,
    /// Bound value
    pub value: FilterValue,
}

impl FilterCondition {
    /// Create a condition
    pub fn new(column: &'static str, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            column,
            operator,
            value,
        }
    }

    /// `column = value`
    pub fn eq(column: &'static str, value: impl Into<FilterValue>) -> Self {
        Self::new(column, FilterOperator::Equal, value.into())
    }

    /// `column != value`
    pub fn ne(column: &'static str, value: impl Into<FilterValue>) -> Self {
        Self::new(column, FilterOperator::NotEqual, value.into())
    }

    /// `column > value`
    pub fn gt(column: &'static str, value: impl Into<FilterValue>) -> Self {
        Self::new(column, FilterOperator::GreaterThan, value.into())
    }

    /// `column >= value`
    pub fn gte(column: &'static str, value: impl Into<FilterValue>) -> Self {
        Self::new(column, FilterOperator::GreaterThanOrEqual, value.into())
    }

    /// `column < value`
    pub fn lt(column: &'static str, value: impl Into<FilterValue>) -> Self {
        Self::new(column, FilterOperator::LessThan, value.into())
    }

    /// `column <= value`
    pub fn lte(column: &'static str, value: impl Into<FilterValue>) -> Self {
        Self::new(column, FilterOperator::LessThanOrEqual, value.into())
    }

    /// Substring match; `needle` is matched literally
    pub fn contains(column: &'static str, needle: &str) -> Self {
        Self::like(column, format!("%{}%", escape_like(needle)))
    }

    /// Prefix match; `prefix` is matched literally
    pub fn starts_with(column: &'static str, prefix: &str) -> Self {
        Self::like(column, format!("{}%", escape_like(prefix)))
    }

    /// Suffix match; `suffix` is matched literally
    pub fn ends_with(column: &'static str, suffix: &str) -> Self {
        Self::like(column, format!("%{}", escape_like(suffix)))
    }

    /// Raw LIKE pattern (already escaped)
    pub fn like(column: &'static str, pattern: impl Into<String>) -> Self {
        Self::new(column, FilterOperator::Like, FilterValue::Text(pattern.into()))
    }

    /// `column IN (values)`
    pub fn in_list(column: &'static str, values: impl Into<FilterValue>) -> Self {
        Self::new(column, FilterOperator::In, values.into())
    }

    /// `column IS NULL`
    pub fn is_null(column: &'static str) -> Self {
        Self::new(column, FilterOperator::IsNull, FilterValue::Null)
    }

    /// `column IS NOT NULL`
    pub fn is_not_null(column: &'static str) -> Self {
        Self::new(column, FilterOperator::IsNotNull, FilterValue::Null)
    }
}

/// Escape LIKE wildcards so user text matches literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// How a related table links back to the row being filtered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationJoin {
    /// Related table
    pub table: &'static str,
    /// Column on the related table
    pub inner_column: &'static str,
    /// Column on the outer (filtered) table
    pub outer_column: &'static str,
}

/// Compiled filter
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Predicate {
    /// Matches every row
    #[default]
    All,
    /// A single column condition
    Condition(FilterCondition),
    /// At least one related row satisfies the nested predicate
    Exists {
        /// Link to the related table
        join: RelationJoin,
        /// Predicate over the related table
        predicate: Box<Predicate>,
    },
    /// Conjunction
    And(Vec<Predicate>),
}

impl Predicate {
    /// Conjunction of `parts`, flattened, with match-all parts removed
    pub fn all_of(parts: impl IntoIterator<Item = Predicate>) -> Predicate {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Predicate::All => {}
                Predicate::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Predicate::All,
            1 => flat.remove(0),
            _ => Predicate::And(flat),
        }
    }

    /// Existence constraint over a related table
    pub fn exists(join: RelationJoin, predicate: Predicate) -> Predicate {
        Predicate::Exists {
            join,
            predicate: Box::new(predicate),
        }
    }

    /// Whether this predicate matches everything
    pub fn is_all(&self) -> bool {
        matches!(self, Predicate::All)
    }

    /// Restrict this predicate with one more condition
    #[must_use]
    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::all_of([self, other])
    }
}

impl From<FilterCondition> for Predicate {
    fn from(condition: FilterCondition) -> Self {
        Predicate::Condition(condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_direction_parse() {
        assert_eq!("asc".parse(), Ok(OrderDirection::Ascending));
        assert_eq!("DESC".parse(), Ok(OrderDirection::Descending));
        assert!("sideways".parse::<OrderDirection>().is_err());
        assert_eq!(OrderDirection::Descending.as_sql(), "DESC");
        assert_eq!(OrderDirection::Descending.to_string(), "desc");
    }

    #[test]
    fn test_pagination_default_is_unbounded() {
        assert!(Pagination::default().is_unbounded());
        assert!(!Pagination::new(1, 2).is_unbounded());
    }

    #[test]
    fn test_filter_operator_display() {
        assert_eq!(FilterOperator::GreaterThanOrEqual.to_string(), ">=");
        assert_eq!(FilterOperator::IsNotNull.to_string(), "IS NOT NULL");
    }

    #[test]
    fn test_like_helpers_escape_wildcards() {
        let cond = FilterCondition::contains("name", "50%_off\\");
        assert_eq!(cond.operator, FilterOperator::Like);
        assert_eq!(cond.value, FilterValue::Text("%50\\%\\_off\\\\%".to_string()));

        let cond = FilterCondition::starts_with("name", "Al");
        assert_eq!(cond.value, FilterValue::Text("Al%".to_string()));

        let cond = FilterCondition::ends_with("name", "ce");
        assert_eq!(cond.value, FilterValue::Text("%ce".to_string()));
    }

    #[test]
    fn test_all_of_empty_matches_everything() {
        assert!(Predicate::all_of([]).is_all());
        assert!(Predicate::all_of([Predicate::All, Predicate::All]).is_all());
    }

    #[test]
    fn test_all_of_single_part_is_unwrapped() {
        let cond = FilterCondition::eq("id", "p1");
        assert_eq!(
            Predicate::all_of([Predicate::All, cond.clone().into()]),
            Predicate::Condition(cond)
        );
    }

    #[test]
    fn test_all_of_flattens_nested_conjunctions() {
        let a: Predicate = FilterCondition::eq("a", "1").into();
        let b: Predicate = FilterCondition::eq("b", "2").into();
        let c: Predicate = FilterCondition::eq("c", "3").into();
        let nested = Predicate::all_of([a.clone(), b.clone()]);
        let flat = nested.and(c.clone());
        assert_eq!(flat, Predicate::And(vec![a, b, c]));
    }
}
