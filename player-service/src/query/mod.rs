//! Dynamic query engine
//!
//! Turns a query string into a typed per-entity filter, compiles the filter
//! into a [`Predicate`], and runs it through a fixed pipeline:
//! filter, then sort, then skip, then take.
//!
//! # Query-string shape
//!
//! ```text
//! where.name=Alice                  equality
//! where.scoreValue.gte=10           operator suffix
//! where.game.title.contains=chess   nested relation filter (EXISTS)
//! sortBy=createdAt:desc             one sort key, asc by default
//! skip=10&take=5                    pagination, applied after sorting
//! ```
//!
//! # Example
//!
//! ```rust
//! use player_service::models::PlayerWhere;
//! use player_service::query::FindManyArgs;
//!
//! let pairs = vec![
//!     ("where.name.startsWith".to_string(), "Al".to_string()),
//!     ("sortBy".to_string(), "createdAt:desc".to_string()),
//!     ("take".to_string(), "10".to_string()),
//! ];
//! let args = FindManyArgs::<PlayerWhere>::from_pairs(&pairs).unwrap();
//! assert_eq!(args.pagination.take, Some(10));
//! ```

mod binder;
mod filter;
mod pipeline;
mod predicate;
mod sql;

pub use binder::{FindManyArgs, MAX_FILTER_SEGMENTS};
pub use filter::{
    bind_scalar, bind_string, scalar_predicates, string_predicates, Filter, ScalarFilter,
    ScalarValue, StringFilter,
};
pub use pipeline::{count, list, Entity, Query};
pub use predicate::{
    FilterCondition, FilterOperator, FilterValue, OrderDirection, Pagination, Predicate,
    RelationJoin, Sort,
};

/// A malformed filter, sort or pagination parameter
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The key names a field the entity does not have
    #[error("unknown filter field '{0}'")]
    UnknownField(String),

    /// The operator suffix is not supported for the field's type
    #[error("unsupported operator '{operator}' in '{key}'")]
    UnknownOperator {
        /// Full parameter name
        key: String,
        /// Offending operator
        operator: String,
    },

    /// The value does not parse as the field's type
    #[error("invalid value '{value}' for '{key}': expected {expected}")]
    InvalidValue {
        /// Full parameter name
        key: String,
        /// Offending raw value
        value: String,
        /// Expected type description
        expected: &'static str,
    },

    /// `sortBy` names a field that cannot be sorted on
    #[error("unknown sort field '{0}'")]
    UnknownSortField(String),

    /// The `where.` path chains more relations than allowed
    #[error("filter '{key}' is nested deeper than {max} segments")]
    FilterTooDeep {
        /// Full parameter name
        key: String,
        /// Segment limit
        max: usize,
    },

    /// Parameter outside `where.*`, `sortBy`, `skip`, `take`
    #[error("unknown query parameter '{0}'")]
    UnknownParameter(String),
}

impl QueryError {
    pub(crate) fn unknown_operator(key: &str, operator: &str) -> Self {
        Self::UnknownOperator {
            key: key.to_string(),
            operator: operator.to_string(),
        }
    }

    pub(crate) fn invalid_value(key: &str, value: &str, expected: &'static str) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected,
        }
    }
}
