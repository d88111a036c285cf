//! Common types used across the platform

use serde::{Deserialize, Serialize};

use crate::validation::clamp_page;

/// Skip/limit pagination as accepted by every list endpoint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
        }
    }
}

impl Pagination {
    /// Non-negative (offset, limit) pair ready to bind into a query
    pub fn window(&self) -> (i64, i64) {
        clamp_page(self.skip, self.limit)
    }
}
