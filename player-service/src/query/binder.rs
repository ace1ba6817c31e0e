//! Query-string binder
//!
//! Explicit mapping from `(key, value)` pairs to a typed [`FindManyArgs`].
//! Every parameter is either consumed or rejected; nothing is ignored.

use super::filter::Filter;
use super::pipeline::Query;
use super::predicate::{OrderDirection, Pagination, Sort};
use super::QueryError;

const WHERE_PREFIX: &str = "where.";

/// Most segments a `where.` path may have after the prefix
///
/// Each relation segment compiles to a nested `EXISTS`, so this bounds the
/// subquery depth at `MAX_FILTER_SEGMENTS - 1`.
pub const MAX_FILTER_SEGMENTS: usize = 6;

/// Parsed list/count arguments for one entity
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FindManyArgs<F: Filter> {
    /// Field filter
    pub filter: F,
    /// Optional sort key
    pub sort: Option<Sort>,
    /// Skip/take window
    pub pagination: Pagination,
}

impl<F: Filter> FindManyArgs<F> {
    /// Bind query-string pairs
    ///
    /// Later `sortBy`, `skip` and `take` values replace earlier ones; repeated
    /// `where.` keys add further clauses.
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, QueryError> {
        let mut args = Self::default();

        for (key, raw) in pairs {
            match key.as_str() {
                "sortBy" => args.sort = Some(parse_sort::<F>(raw)?),
                "skip" => args.pagination.skip = parse_count(key, raw)?,
                "take" => args.pagination.take = Some(parse_count(key, raw)?),
                _ => {
                    let path = key
                        .strip_prefix(WHERE_PREFIX)
                        .ok_or_else(|| QueryError::UnknownParameter(key.clone()))?;
                    let segments: Vec<&str> = path.split('.').collect();
                    if segments.len() > MAX_FILTER_SEGMENTS {
                        return Err(QueryError::FilterTooDeep {
                            key: key.clone(),
                            max: MAX_FILTER_SEGMENTS,
                        });
                    }
                    if segments.iter().any(|s| s.is_empty()) {
                        return Err(QueryError::UnknownField(key.clone()));
                    }
                    args.filter.bind(key, &segments, raw)?;
                }
            }
        }

        Ok(args)
    }

    /// Arguments selecting exactly one id
    pub fn by_id(id: &str) -> Self {
        Self {
            filter: F::with_id(id),
            sort: None,
            pagination: Pagination::default(),
        }
    }

    /// Compile the filter and carry sort and window over
    pub fn into_query(self) -> Query {
        Query {
            predicate: self.filter.predicate(),
            sort: self.sort,
            pagination: self.pagination,
        }
    }
}

fn parse_sort<F: Filter>(raw: &str) -> Result<Sort, QueryError> {
    let (field, direction) = match raw.split_once(':') {
        Some((field, dir)) => {
            let direction = dir
                .parse::<OrderDirection>()
                .map_err(|_| QueryError::invalid_value("sortBy", raw, "asc or desc"))?;
            (field, direction)
        }
        None => (raw, OrderDirection::Ascending),
    };

    let column = F::sort_column(field.trim())
        .ok_or_else(|| QueryError::UnknownSortField(field.to_string()))?;
    Ok(Sort { column, direction })
}

fn parse_count(key: &str, raw: &str) -> Result<u64, QueryError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| QueryError::invalid_value(key, raw, "a non-negative integer"))
}
