//! Filter construction from the listing's loosely-typed parameters.

use chrono::{DateTime, NaiveDate, Utc};

use crate::errors::AppError;

/// Raw filter parameters as received on the query string.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilterParams<'a> {
    pub tags: Option<&'a str>,
    pub author: Option<&'a str>,
    pub search: Option<&'a str>,
    pub start_date: Option<&'a str>,
    pub end_date: Option<&'a str>,
}

/// Inclusive bounds on `publishedAt`. A missing side is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishedRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Predicate applied to the article collection, on top of `isActive = true`
/// which every read path enforces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleFilter {
    /// Article matches when its tags intersect this list.
    pub tags_in: Option<Vec<String>>,
    /// Case-insensitive substring of the author.
    pub author_contains: Option<String>,
    /// Free-text query over title and full content.
    pub text_search: Option<String>,
    pub published_range: Option<PublishedRange>,
}

impl ArticleFilter {
    /// Build the filter. Absent or empty parameters contribute no clause.
    pub fn from_params(params: &FilterParams<'_>) -> Result<Self, AppError> {
        let tags_in = present(params.tags).map(|tags| {
            tags.split(',')
                .map(|tag| tag.trim().to_string())
                .collect::<Vec<_>>()
        });

        let from = present(params.start_date)
            .map(|value| parse_date_param("startDate", value))
            .transpose()?;
        let to = present(params.end_date)
            .map(|value| parse_date_param("endDate", value))
            .transpose()?;
        let published_range = if from.is_some() || to.is_some() {
            Some(PublishedRange { from, to })
        } else {
            None
        };

        Ok(Self {
            tags_in,
            author_contains: present(params.author).map(str::to_string),
            text_search: present(params.search).map(str::to_string),
            published_range,
        })
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Parse a date bound. Accepts RFC 3339 timestamps and plain `YYYY-MM-DD`
/// dates, the latter meaning midnight UTC.
pub fn parse_date_param(name: &str, value: &str) -> Result<DateTime<Utc>, AppError> {
    let value = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| {
            AppError::Validation(format!(
                "{} must be an RFC 3339 timestamp or a YYYY-MM-DD date, got {:?}",
                name, value
            ))
        })
}
