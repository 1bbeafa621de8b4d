//! This modules defines the common functionality for paging data.

use serde::{Deserialize, Serialize};

use crate::Error;

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of items per page when not specified in a request.
    pub default_page_size: u64,
    /// The largest page size a client may request.
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// The 1-based page number.
    pub page: u64,
    /// The maximum number of items on the page.
    pub limit: u64,
}

impl PageRequest {
    /// Resolve the optional `page` and `limit` query parameters against `config`.
    ///
    /// # Errors
    /// Returns [Error::Validation] if `page` is zero or too large for an SQL offset, or `limit`
    /// is outside `1..=max_page_size`.
    pub fn new(
        page: Option<u64>,
        limit: Option<u64>,
        config: &PaginationConfig,
    ) -> Result<Self, Error> {
        let page = page.unwrap_or(config.default_page);
        let limit = limit.unwrap_or(config.default_page_size);

        if page == 0 {
            return Err(Error::Validation("page must be at least 1".to_owned()));
        }

        if limit == 0 || limit > config.max_page_size {
            return Err(Error::Validation(format!(
                "limit must be between 1 and {}",
                config.max_page_size
            )));
        }

        let offset_fits = (page - 1)
            .checked_mul(limit)
            .is_some_and(|offset| i64::try_from(offset).is_ok());

        if !offset_fits {
            return Err(Error::Validation(format!("page {page} is too large")));
        }

        Ok(Self { page, limit })
    }

    /// The number of rows to skip, for SQL `OFFSET`.
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

/// The `page` and `limit` query parameters accepted by list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    /// The 1-based page number.
    pub page: Option<u64>,
    /// The maximum number of items on the page.
    pub limit: Option<u64>,
}

/// Describes where a page sits in the full result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// The 1-based page number.
    pub page: u64,
    /// The maximum number of items on the page.
    pub limit: u64,
    /// The number of items across all pages.
    pub total: u64,
    /// The number of pages needed to show all items.
    pub total_pages: u64,
}

/// One page of items: `{ data: T[], pagination }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    /// The items on this page.
    pub data: Vec<T>,
    /// Where the page sits in the full result set.
    pub pagination: Pagination,
}

impl<T> Paginated<T> {
    /// Wrap a page of `data` out of `total` items.
    pub fn new(data: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            data,
            pagination: Pagination {
                page: request.page,
                limit: request.limit,
                total,
                total_pages: total.div_ceil(request.limit),
            },
        }
    }
}
