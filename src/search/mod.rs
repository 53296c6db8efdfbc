//! Tantivy-based search index module.
//!
//! Provides the store's free-text search over article titles and full content.
//! SQLite stays authoritative; the index only answers "which ids match".

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tantivy::collector::DocSetCollector;
use tantivy::query::QueryParser;
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, INDEXED, STORED,
};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::Article;

/// Tokenizer with lowercasing and English stemming, registered by tantivy by default.
const TOKENIZER: &str = "en_stem";

/// Search index schema fields.
struct SearchFields {
    article_id: Field,
    title: Field,
    full_content: Field,
}

/// Tantivy search index for articles.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        let text = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(TOKENIZER)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );

        let mut schema_builder = Schema::builder();
        let article_id = schema_builder.add_i64_field("article_id", INDEXED | STORED);
        let title = schema_builder.add_text_field("title", text.clone());
        let full_content = schema_builder.add_text_field("full_content", text);
        let schema = schema_builder.build();

        let fields = SearchFields {
            article_id,
            title,
            full_content,
        };

        // Try to open existing index or create new one
        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema.clone()))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Rebuild the entire index from articles.
    pub async fn rebuild(&self, articles: &[Article]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_all_documents()?;
        for article in articles {
            writer.add_document(self.create_document(article))?;
        }
        writer.commit()?;

        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} articles", articles.len());
        Ok(())
    }

    /// Index a single article, replacing any earlier version of it.
    pub async fn index_article(&self, article: &Article) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_i64(self.fields.article_id, article.id));
        writer.add_document(self.create_document(article))?;
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Remove an article from the index.
    pub async fn remove_article(&self, article_id: i64) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_i64(self.fields.article_id, article_id));
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Ids of all articles whose title or full content match the query, ascending.
    ///
    /// Terms are OR-ed. Syntax errors in the query are tolerated: the parseable
    /// part is used.
    pub fn matching_ids(&self, query_str: &str) -> Result<Vec<i64>, AppError> {
        if query_str.trim().is_empty() {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();
        let query_parser = QueryParser::for_index(
            &self.index,
            vec![self.fields.title, self.fields.full_content],
        );

        let (query, errors) = query_parser.parse_query_lenient(query_str);
        if !errors.is_empty() {
            tracing::debug!("Search query {:?} parsed leniently: {:?}", query_str, errors);
        }

        let addresses = searcher
            .search(&query, &DocSetCollector)
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let mut ids = HashSet::with_capacity(addresses.len());
        for address in addresses {
            let doc: TantivyDocument = searcher.doc(address)?;
            if let Some(id) = doc.get_first(self.fields.article_id).and_then(|v| v.as_i64()) {
                ids.insert(id);
            }
        }

        let mut ids: Vec<i64> = ids.into_iter().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Create a Tantivy document from an article.
    fn create_document(&self, article: &Article) -> TantivyDocument {
        doc!(
            self.fields.article_id => article.id,
            self.fields.title => article.title.clone(),
            self.fields.full_content => article.full_content.clone()
        )
    }
}
