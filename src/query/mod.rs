//! Resolution of raw listing parameters into typed query parts.
//!
//! Everything here is pure: no store access, only parsing and validation.

mod filter;
mod pagination;
mod sort;

pub use filter::*;
pub use pagination::*;
pub use sort::*;

use serde::Deserialize;

use crate::errors::AppError;

/// Query string of `GET /news`, kept as raw strings so parsing errors surface as
/// validation errors instead of extractor rejections.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNewsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub tags: Option<String>,
    pub author: Option<String>,
    pub search: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

/// A fully resolved listing request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRequest {
    pub filter: ArticleFilter,
    pub sort: SortSpec,
    pub page: PageRequest,
}

impl ListNewsQuery {
    /// Validate and resolve every parameter. The first invalid one is reported.
    pub fn resolve(&self, max_limit: Option<u64>) -> Result<ListingRequest, AppError> {
        let filter = ArticleFilter::from_params(&FilterParams {
            tags: self.tags.as_deref(),
            author: self.author.as_deref(),
            search: self.search.as_deref(),
            start_date: self.start_date.as_deref(),
            end_date: self.end_date.as_deref(),
        })?;
        let sort = SortSpec::from_params(self.sort_by.as_deref(), self.order.as_deref());
        let page = PageRequest::from_params(self.page.as_deref(), self.limit.as_deref(), max_limit)?;

        Ok(ListingRequest { filter, sort, page })
    }
}
