//! Response bodies that are not plain entities

use serde::{Deserialize, Serialize};

/// Body of `POST /api/{resource}/meta`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountResponse {
    /// Number of records matching the filter
    pub count: i64,
}

impl CountResponse {
    pub fn new(count: i64) -> Self {
        Self { count }
    }
}
