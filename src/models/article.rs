//! Article model matching the frontend news interface.

use std::collections::HashSet;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Author recorded when a create request does not name one.
pub const DEFAULT_AUTHOR: &str = "Admin";

/// A single news item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub full_content: String,
    pub preview: String,
    pub author: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub view_count: i64,
    pub is_active: bool,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a new article.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArticleRequest {
    /// Client-chosen id; the next free id is assigned when omitted
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    pub full_content: String,
    pub preview: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub view_count: Option<i64>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// Request body for updating an existing article. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArticleRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub full_content: Option<String>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub view_count: Option<i64>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl CreateArticleRequest {
    /// Check field constraints and apply defaults, producing the record to insert.
    ///
    /// `id` is the already-resolved article id (client-chosen or assigned by the store).
    pub fn into_article(self, id: i64, now: DateTime<Utc>) -> Result<Article, AppError> {
        let title = normalize_title(&self.title)?;
        let view_count = check_view_count(self.view_count.unwrap_or(0))?;

        Ok(Article {
            id,
            title,
            content: self.content,
            full_content: self.full_content,
            preview: self.preview.trim().to_string(),
            author: self
                .author
                .unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
            tags: dedup_tags(self.tags.unwrap_or_default()),
            image_url: self.image_url,
            view_count,
            is_active: self.is_active.unwrap_or(true),
            published_at: self.published_at.map(store_precision).unwrap_or(now),
            created_at: now,
            updated_at: now,
        })
    }
}

impl UpdateArticleRequest {
    /// Merge the supplied fields into `existing`, refreshing `updated_at`.
    pub fn apply_to(self, existing: Article, now: DateTime<Utc>) -> Result<Article, AppError> {
        let title = match self.title {
            Some(title) => normalize_title(&title)?,
            None => existing.title,
        };
        let view_count = match self.view_count {
            Some(count) => check_view_count(count)?,
            None => existing.view_count,
        };

        Ok(Article {
            id: existing.id,
            title,
            content: self.content.or(existing.content),
            full_content: self.full_content.unwrap_or(existing.full_content),
            preview: self
                .preview
                .map(|p| p.trim().to_string())
                .unwrap_or(existing.preview),
            author: self.author.unwrap_or(existing.author),
            tags: self.tags.map(dedup_tags).unwrap_or(existing.tags),
            image_url: self.image_url.or(existing.image_url),
            view_count,
            is_active: self.is_active.unwrap_or(existing.is_active),
            published_at: self
                .published_at
                .map(store_precision)
                .unwrap_or(existing.published_at),
            created_at: existing.created_at,
            updated_at: now,
        })
    }
}

/// Timestamps are stored with millisecond precision.
pub fn store_precision(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(3)
}

fn normalize_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    Ok(title.to_string())
}

fn check_view_count(count: i64) -> Result<i64, AppError> {
    if count < 0 {
        return Err(AppError::Validation(
            "viewCount must not be negative".to_string(),
        ));
    }
    Ok(count)
}

/// Drop repeated tags, keeping the first occurrence of each.
pub fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}
