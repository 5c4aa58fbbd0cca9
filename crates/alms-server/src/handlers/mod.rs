//! HTTP request handlers

mod donations;
mod donors;
mod import;

pub use donations::{list_donations, list_flagged_donations};
pub use donors::{discard_donor, list_donors, merge_donor};
pub use import::import_csv;

#[cfg(test)]
pub(crate) use import::import_csv_core;

use serde::Deserialize;

use crate::MAX_PAGE_LIMIT;

/// Common pagination query parameters
#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    /// Clamp to sane bounds
    pub fn resolve(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(50).clamp(1, MAX_PAGE_LIMIT);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}
