//! Page/limit resolution and pagination metadata.

use serde::Serialize;

use crate::errors::AppError;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 20;

/// A validated page request. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

/// Pagination block of the listing response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl PageRequest {
    /// Parse `page` and `limit`. Both must be positive integers; `limit` may not
    /// exceed `max_limit` when one is set, and the resulting offset must fit the
    /// store's integer range.
    pub fn from_params(
        page: Option<&str>,
        limit: Option<&str>,
        max_limit: Option<u64>,
    ) -> Result<Self, AppError> {
        let page = parse_positive("page", page, DEFAULT_PAGE)?;
        let limit = parse_positive("limit", limit, DEFAULT_LIMIT)?;

        if let Some(max_limit) = max_limit.filter(|max| limit > *max) {
            return Err(AppError::Validation(format!(
                "limit must not exceed {}",
                max_limit
            )));
        }

        let offset_fits = (page - 1)
            .checked_mul(limit)
            .is_some_and(|skip| i64::try_from(skip).is_ok());
        if !offset_fits {
            return Err(AppError::Validation("page is out of range".to_string()));
        }

        Ok(Self { page, limit })
    }

    /// Number of matches to pass over before this page starts.
    pub fn skip(&self) -> u64 {
        (self.page - 1) * self.limit
    }

    pub fn pagination(&self, total: u64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            total_pages: total_pages(total, self.limit),
        }
    }
}

/// `ceil(total / limit)`; zero matches give zero pages.
pub fn total_pages(total: u64, limit: u64) -> u64 {
    total.div_ceil(limit)
}

fn parse_positive(name: &str, value: Option<&str>, default: u64) -> Result<u64, AppError> {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return Ok(default);
    };

    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AppError::Validation(format!(
            "{} must be a positive integer, got {:?}",
            name, value
        ))),
    }
}
