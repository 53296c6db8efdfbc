//! Database repository for article reads and writes.
//!
//! Listing filters are assembled with `QueryBuilder` so every user-supplied value
//! is bound, never spliced into SQL text.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::errors::AppError;
use crate::models::{Article, CreateArticleRequest, UpdateArticleRequest};
use crate::query::{ArticleFilter, PageRequest, SortSpec};

const ARTICLE_COLUMNS: &str = "id, title, content, full_content, preview, author, tags, image_url, view_count, is_active, published_at, created_at, updated_at";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== QUERY OPERATIONS ====================

    /// Count active articles matching `filter`.
    ///
    /// `matched_ids` restricts the result to ids returned by the full-text index;
    /// `filter.text_search` itself is not evaluated here.
    pub async fn count_articles(
        &self,
        filter: &ArticleFilter,
        matched_ids: Option<&[i64]>,
    ) -> Result<u64, AppError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM articles");
        push_filter(&mut builder, filter, matched_ids)?;

        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Fetch one sorted page of active articles matching `filter`.
    pub async fn find_articles(
        &self,
        filter: &ArticleFilter,
        matched_ids: Option<&[i64]>,
        sort: &SortSpec,
        page: &PageRequest,
    ) -> Result<Vec<Article>, AppError> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM articles", ARTICLE_COLUMNS));
        push_filter(&mut builder, filter, matched_ids)?;
        push_order(&mut builder, sort);
        push_window(&mut builder, page.limit, page.skip());

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(article_from_row).collect()
    }

    /// Up to `limit` active articles, newest first.
    pub async fn latest_articles(&self, limit: u64) -> Result<Vec<Article>, AppError> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM articles", ARTICLE_COLUMNS));
        push_filter(&mut builder, &ArticleFilter::default(), None)?;
        push_order(&mut builder, &SortSpec::newest_first());
        push_window(&mut builder, limit, 0);

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(article_from_row).collect()
    }

    /// Distinct tags across active articles, ascending.
    pub async fn distinct_tags(&self) -> Result<Vec<String>, AppError> {
        let tags = sqlx::query_scalar::<_, String>(
            r#"SELECT DISTINCT t.value AS tag
               FROM articles, json_each(articles.tags) AS t
               WHERE articles.is_active = 1
               ORDER BY tag ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    /// Distinct authors across active articles, ascending.
    pub async fn distinct_authors(&self) -> Result<Vec<String>, AppError> {
        let authors = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT author FROM articles WHERE is_active = 1 ORDER BY author ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(authors)
    }

    /// Every stored article, active or not. Used to rebuild the search index.
    pub async fn list_all_articles(&self) -> Result<Vec<Article>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM articles ORDER BY id",
            ARTICLE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(article_from_row).collect()
    }

    // ==================== WRITE OPERATIONS ====================

    /// Get an article by id regardless of its active flag.
    pub async fn get_article(&self, id: i64) -> Result<Option<Article>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM articles WHERE id = ?",
            ARTICLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(article_from_row).transpose()
    }

    /// Create a new article. Without a requested id, SQLite assigns `max(id) + 1`.
    ///
    /// A single statement, so concurrent creates serialize on the write lock.
    pub async fn create_article(
        &self,
        request: CreateArticleRequest,
        now: DateTime<Utc>,
    ) -> Result<Article, AppError> {
        let requested_id = request.id;
        let mut article = request.into_article(requested_id.unwrap_or_default(), now)?;
        let tags_json = serde_json::to_string(&article.tags)?;

        let result = sqlx::query(
            r#"INSERT INTO articles
                (id, title, content, full_content, preview, author, tags, image_url,
                 view_count, is_active, published_at, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO NOTHING"#,
        )
        .bind(requested_id)
        .bind(&article.title)
        .bind(&article.content)
        .bind(&article.full_content)
        .bind(&article.preview)
        .bind(&article.author)
        .bind(&tags_json)
        .bind(&article.image_url)
        .bind(article.view_count)
        .bind(article.is_active as i32)
        .bind(encode_timestamp(&article.published_at))
        .bind(encode_timestamp(&article.created_at))
        .bind(encode_timestamp(&article.updated_at))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Article {} already exists",
                requested_id.unwrap_or_default()
            )));
        }

        article.id = requested_id.unwrap_or_else(|| result.last_insert_rowid());
        Ok(article)
    }

    /// Apply a partial update to an existing article.
    pub async fn update_article(
        &self,
        id: i64,
        request: UpdateArticleRequest,
        now: DateTime<Utc>,
    ) -> Result<Article, AppError> {
        let existing = self
            .get_article(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Article {} not found", id)))?;

        let article = request.apply_to(existing, now)?;
        let tags_json = serde_json::to_string(&article.tags)?;

        let result = sqlx::query(
            r#"UPDATE articles SET
                title = ?, content = ?, full_content = ?, preview = ?, author = ?, tags = ?,
                image_url = ?, view_count = ?, is_active = ?, published_at = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&article.title)
        .bind(&article.content)
        .bind(&article.full_content)
        .bind(&article.preview)
        .bind(&article.author)
        .bind(&tags_json)
        .bind(&article.image_url)
        .bind(article.view_count)
        .bind(article.is_active as i32)
        .bind(encode_timestamp(&article.published_at))
        .bind(encode_timestamp(&article.updated_at))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Deleted between read and write
            return Err(AppError::NotFound(format!("Article {} not found", id)));
        }

        Ok(article)
    }

    /// Delete an article.
    pub async fn delete_article(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Article {} not found", id)));
        }

        Ok(())
    }
}

// Query assembly

fn push_filter(
    builder: &mut QueryBuilder<'_, Sqlite>,
    filter: &ArticleFilter,
    matched_ids: Option<&[i64]>,
) -> Result<(), AppError> {
    builder.push(" WHERE is_active = 1");

    if let Some(tags) = &filter.tags_in {
        builder.push(" AND EXISTS (SELECT 1 FROM json_each(articles.tags) AS t WHERE t.value IN (");
        let mut values = builder.separated(", ");
        for tag in tags {
            values.push_bind(tag.clone());
        }
        builder.push("))");
    }

    if let Some(author) = &filter.author_contains {
        builder.push(" AND author LIKE ");
        builder.push_bind(format!("%{}%", escape_like(author)));
        builder.push(" ESCAPE '\\'");
    }

    if let Some(range) = &filter.published_range {
        if let Some(from) = &range.from {
            builder.push(" AND published_at >= ");
            builder.push_bind(encode_timestamp(from));
        }
        if let Some(to) = &range.to {
            builder.push(" AND published_at <= ");
            builder.push_bind(encode_timestamp(to));
        }
    }

    if let Some(ids) = matched_ids {
        if ids.is_empty() {
            builder.push(" AND 0");
        } else {
            // One bound JSON array, however many ids the index returned.
            builder.push(" AND id IN (SELECT value FROM json_each(");
            builder.push_bind(serde_json::to_string(ids)?);
            builder.push("))");
        }
    }

    Ok(())
}

fn push_order(builder: &mut QueryBuilder<'_, Sqlite>, sort: &SortSpec) {
    // Unknown fields get no ORDER BY: the store's natural order applies.
    if let Some(column) = sort.field.column() {
        let direction = sort.direction.as_sql();
        builder.push(format!(" ORDER BY {} {}", column, direction));
        if column != "id" {
            builder.push(format!(", id {}", direction));
        }
    }
}

fn push_window(builder: &mut QueryBuilder<'_, Sqlite>, limit: u64, skip: u64) {
    builder.push(" LIMIT ");
    builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    builder.push(" OFFSET ");
    builder.push_bind(i64::try_from(skip).unwrap_or(i64::MAX));
}

/// Escape `LIKE` wildcards so the author filter is a literal substring match.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// Helper functions for row conversion

fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn decode_timestamp(value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| AppError::Database(format!("Invalid stored timestamp {:?}: {}", value, e)))
}

fn article_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Article, AppError> {
    let tags_str: String = row.try_get("tags")?;
    let is_active: i32 = row.try_get("is_active")?;
    let published_at: String = row.try_get("published_at")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Article {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        full_content: row.try_get("full_content")?,
        preview: row.try_get("preview")?,
        author: row.try_get("author")?,
        tags: parse_json_array(&tags_str),
        image_url: row.try_get("image_url")?,
        view_count: row.try_get("view_count")?,
        is_active: is_active != 0,
        published_at: decode_timestamp(&published_at)?,
        created_at: decode_timestamp(&created_at)?,
        updated_at: decode_timestamp(&updated_at)?,
    })
}

fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}
