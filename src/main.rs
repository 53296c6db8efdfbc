//! News Backend
//!
//! A REST backend for the news site with SQLite persistence and Tantivy full-text search.

mod api;
mod config;
mod db;
mod errors;
mod models;
mod query;
mod search;
mod services;

use std::sync::Arc;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, LogFormat};
use db::Repository;
use search::SearchIndex;
use services::NewsService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub news: NewsService,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!("Starting News Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!("Store timeout: {:?}", config.store_timeout);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Initialize search index
    let search = Arc::new(SearchIndex::open(&config.index_path)?);

    // Build search index from database
    tracing::info!("Building search index...");
    let articles = repo.list_all_articles().await?;
    search.rebuild(&articles).await?;

    // Create application state
    let state = AppState {
        news: NewsService::new(repo, search, config.store_timeout),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let news_routes = Router::new()
        // Query subsystem
        .route("/news", get(api::list_news))
        .route("/news/latest", get(api::latest_news))
        .route("/news/tags/all", get(api::list_tags))
        .route("/news/authors/all", get(api::list_authors))
        // Write path
        .route("/news", post(api::create_news))
        .route("/news/{id}", get(api::get_news))
        .route("/news/{id}", put(api::update_news))
        .route("/news/{id}", patch(api::update_news))
        .route("/news/{id}", delete(api::delete_news));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(news_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
