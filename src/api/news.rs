//! News API endpoints.

use axum::extract::State;

use super::{success, ApiResponse, ApiResult, AppJson, AppPath, AppQuery};
use crate::models::{Article, CreateArticleRequest, UpdateArticleRequest};
use crate::query::ListNewsQuery;
use crate::services::LATEST_FEED_SIZE;
use crate::AppState;

/// GET /news - Filtered, sorted, paginated listing of active articles.
pub async fn list_news(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<ListNewsQuery>,
) -> ApiResult<Vec<Article>> {
    let request = params.resolve(state.config.max_page_limit)?;
    let page = state.news.list(&request).await?;

    Ok(ApiResponse::paginated(page.items, page.pagination))
}

/// GET /news/latest - Most recently published active articles.
pub async fn latest_news(State(state): State<AppState>) -> ApiResult<Vec<Article>> {
    success(state.news.latest(LATEST_FEED_SIZE).await?)
}

/// GET /news/tags/all - Distinct tags of active articles.
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    success(state.news.distinct_tags().await?)
}

/// GET /news/authors/all - Distinct authors of active articles.
pub async fn list_authors(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    success(state.news.distinct_authors().await?)
}

/// GET /news/:id - Get a single active article.
pub async fn get_news(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> ApiResult<Article> {
    success(state.news.get(id).await?)
}

/// POST /news - Create a new article.
pub async fn create_news(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateArticleRequest>,
) -> ApiResult<Article> {
    success(state.news.create(request).await?)
}

/// PUT|PATCH /news/:id - Update an article. Both methods apply a partial update.
pub async fn update_news(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<UpdateArticleRequest>,
) -> ApiResult<Article> {
    success(state.news.update(id, request).await?)
}

/// DELETE /news/:id - Delete an article.
pub async fn delete_news(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> ApiResult<()> {
    state.news.delete(id).await?;
    success(())
}
