//! News service: listing, aggregation views, the latest feed and the write path.
//!
//! Every store call is bounded by the configured timeout. Nothing here retries;
//! a failed call fails the whole operation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{store_precision, Article, CreateArticleRequest, UpdateArticleRequest};
use crate::query::{ListingRequest, Pagination};
use crate::search::SearchIndex;

/// Number of articles in the latest feed.
pub const LATEST_FEED_SIZE: u64 = 5;

/// One page of listing results.
#[derive(Debug, Clone)]
pub struct ArticlePage {
    pub items: Vec<Article>,
    pub pagination: Pagination,
}

/// Read and write operations over the article collection.
#[derive(Clone)]
pub struct NewsService {
    repo: Arc<Repository>,
    search: Arc<SearchIndex>,
    store_timeout: Duration,
}

impl NewsService {
    pub fn new(repo: Arc<Repository>, search: Arc<SearchIndex>, store_timeout: Duration) -> Self {
        Self {
            repo,
            search,
            store_timeout,
        }
    }

    /// One page of active articles matching the request, plus pagination metadata.
    ///
    /// The count and the page are read concurrently and independently. A write
    /// landing between them can make `total` disagree with the page contents.
    pub async fn list(&self, request: &ListingRequest) -> Result<ArticlePage, AppError> {
        let matched_ids = match &request.filter.text_search {
            Some(query) => {
                Some(with_timeout(self.store_timeout, self.search_ids(query)).await?)
            }
            None => None,
        };
        let matched_ids = matched_ids.as_deref();

        let (total, items) = tokio::try_join!(
            with_timeout(
                self.store_timeout,
                self.repo.count_articles(&request.filter, matched_ids)
            ),
            with_timeout(
                self.store_timeout,
                self.repo.find_articles(
                    &request.filter,
                    matched_ids,
                    &request.sort,
                    &request.page
                )
            ),
        )?;

        tracing::debug!(
            "Listed {} of {} articles (page {}, limit {})",
            items.len(),
            total,
            request.page.page,
            request.page.limit
        );

        Ok(ArticlePage {
            items,
            pagination: request.page.pagination(total),
        })
    }

    /// Full-text lookup on the blocking pool; tantivy searches synchronously.
    async fn search_ids(&self, query: &str) -> Result<Vec<i64>, AppError> {
        let search = Arc::clone(&self.search);
        let query = query.to_string();
        tokio::task::spawn_blocking(move || search.matching_ids(&query)).await?
    }

    /// Up to `n` active articles, newest first.
    pub async fn latest(&self, n: u64) -> Result<Vec<Article>, AppError> {
        with_timeout(self.store_timeout, self.repo.latest_articles(n)).await
    }

    /// Distinct tags of active articles, ascending.
    pub async fn distinct_tags(&self) -> Result<Vec<String>, AppError> {
        with_timeout(self.store_timeout, self.repo.distinct_tags()).await
    }

    /// Distinct authors of active articles, ascending.
    pub async fn distinct_authors(&self) -> Result<Vec<String>, AppError> {
        with_timeout(self.store_timeout, self.repo.distinct_authors()).await
    }

    /// A single active article.
    pub async fn get(&self, id: i64) -> Result<Article, AppError> {
        with_timeout(self.store_timeout, self.repo.get_article(id))
            .await?
            .filter(|article| article.is_active)
            .ok_or_else(|| AppError::NotFound(format!("Article {} not found", id)))
    }

    pub async fn create(&self, request: CreateArticleRequest) -> Result<Article, AppError> {
        let now = store_precision(Utc::now());
        let article =
            with_timeout(self.store_timeout, self.repo.create_article(request, now)).await?;

        if let Err(e) = self.search.index_article(&article).await {
            tracing::warn!("Failed to index article {}: {}", article.id, e);
        }

        tracing::info!("Created article {}", article.id);
        Ok(article)
    }

    pub async fn update(
        &self,
        id: i64,
        request: UpdateArticleRequest,
    ) -> Result<Article, AppError> {
        let now = store_precision(Utc::now());
        let article =
            with_timeout(self.store_timeout, self.repo.update_article(id, request, now)).await?;

        if let Err(e) = self.search.index_article(&article).await {
            tracing::warn!("Failed to re-index article {}: {}", article.id, e);
        }

        Ok(article)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        with_timeout(self.store_timeout, self.repo.delete_article(id)).await?;

        if let Err(e) = self.search.remove_article(id).await {
            tracing::warn!("Failed to remove article {} from index: {}", id, e);
        }

        tracing::info!("Deleted article {}", id);
        Ok(())
    }
}

/// Run a store call, failing with `AppError::Timeout` once `limit` elapses.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    tokio::time::timeout(limit, call).await?
}
