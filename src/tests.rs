//! Integration tests for the news backend.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::{Config, LogFormat};
use crate::db::{init_database, Repository};
use crate::search::SearchIndex;
use crate::services::NewsService;
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");
        let index_path = temp_dir.path().join("index");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        // Initialize search index
        let search = Arc::new(SearchIndex::open(&index_path).expect("Failed to init search"));

        let config = Config {
            db_path,
            index_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            log_format: LogFormat::Pretty,
            store_timeout: Duration::from_secs(5),
            max_page_limit: None,
        };

        let state = AppState {
            news: NewsService::new(repo, search, config.store_timeout),
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    /// Create an article and return the response body.
    async fn create(&self, article: Value) -> Value {
        let resp = self
            .client
            .post(self.url("/news"))
            .json(&article)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        resp.json().await.unwrap()
    }
}

fn article(id: i64, published_at: &str, tags: &[&str]) -> Value {
    json!({
        "id": id,
        "title": format!("Story {}", id),
        "fullContent": format!("Full text of story {}", id),
        "preview": format!("Preview {}", id),
        "tags": tags,
        "publishedAt": published_at,
    })
}

fn ids(body: &Value) -> Vec<i64> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_list_filters_by_tag() {
    let fixture = TestFixture::new().await;
    fixture
        .create(article(1, "2024-01-02T00:00:00Z", &["x"]))
        .await;
    fixture
        .create(article(2, "2024-01-01T00:00:00Z", &["y"]))
        .await;

    let (status, body) = fixture.get("/news?tags=x").await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(ids(&body), vec![1]);
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["limit"], 20);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["pagination"]["totalPages"], 1);
}

#[tokio::test]
async fn test_list_defaults_to_newest_first() {
    let fixture = TestFixture::new().await;
    fixture.create(article(1, "2024-01-01T00:00:00Z", &[])).await;
    fixture.create(article(2, "2024-01-03T00:00:00Z", &[])).await;
    fixture.create(article(3, "2024-01-02T00:00:00Z", &[])).await;

    let (_, body) = fixture.get("/news").await;
    assert_eq!(ids(&body), vec![2, 3, 1]);

    // Anything other than the exact "asc" is descending
    let (_, body) = fixture.get("/news?order=ASC").await;
    assert_eq!(ids(&body), vec![2, 3, 1]);

    let (_, body) = fixture.get("/news?order=asc").await;
    assert_eq!(ids(&body), vec![1, 3, 2]);

    let (_, body) = fixture.get("/news?sortBy=title&order=asc").await;
    assert_eq!(ids(&body), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_list_pagination_metadata() {
    let fixture = TestFixture::new().await;
    for id in 1..=5 {
        fixture
            .create(article(id, &format!("2024-02-0{}T00:00:00Z", id), &[]))
            .await;
    }

    let (_, body) = fixture.get("/news?page=2&limit=2").await;
    assert_eq!(ids(&body), vec![3, 2]);
    assert_eq!(
        body["pagination"],
        json!({ "page": 2, "limit": 2, "total": 5, "totalPages": 3 })
    );

    let (_, body) = fixture.get("/news?page=9&limit=2").await;
    assert!(body["data"].as_array().unwrap().is_empty());
    assert_eq!(body["pagination"]["total"], 5);
}

#[tokio::test]
async fn test_list_empty_result_is_not_an_error() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/news?tags=missing").await;
    assert_eq!(status, 200);
    assert!(body["data"].as_array().unwrap().is_empty());
    assert_eq!(body["pagination"]["total"], 0);
    assert_eq!(body["pagination"]["totalPages"], 0);
}

#[tokio::test]
async fn test_list_author_search_and_dates() {
    let fixture = TestFixture::new().await;
    let mut john = article(1, "2024-03-01T00:00:00Z", &[]);
    john["author"] = json!("John");
    john["fullContent"] = json!("Parliament approved the budget");
    fixture.create(john).await;

    let mut ann = article(2, "2024-03-05T00:00:00Z", &[]);
    ann["author"] = json!("Ann");
    fixture.create(ann).await;

    let (_, body) = fixture.get("/news?author=jo").await;
    assert_eq!(ids(&body), vec![1]);

    let (_, body) = fixture.get("/news?search=budget").await;
    assert_eq!(ids(&body), vec![1]);

    let (_, body) = fixture.get("/news?startDate=2024-03-02").await;
    assert_eq!(ids(&body), vec![2]);

    let (_, body) = fixture
        .get("/news?startDate=2024-03-01&endDate=2024-03-05T00:00:00Z")
        .await;
    assert_eq!(ids(&body), vec![2, 1]);
}

#[tokio::test]
async fn test_list_rejects_invalid_parameters() {
    let fixture = TestFixture::new().await;

    for query in [
        "/news?page=0",
        "/news?page=-1",
        "/news?limit=abc",
        "/news?startDate=not-a-date",
        "/news?endDate=2024-13-40",
    ] {
        let (status, body) = fixture.get(query).await;
        assert_eq!(status, 400, "{} should be rejected", query);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["error"].is_string());
    }

    // Any positive limit is accepted when no cap is configured
    let (status, body) = fixture.get("/news?limit=1000").await;
    assert_eq!(status, 200);
    assert_eq!(body["pagination"]["limit"], 1000);
}

#[tokio::test]
async fn test_malformed_requests_use_error_envelope() {
    let fixture = TestFixture::new().await;
    fixture.create(article(1, "2024-01-01T00:00:00Z", &[])).await;

    let assert_envelope = |status: u16, body: &Value, what: &str| {
        assert_eq!(status, 400, "{} should be rejected", what);
        assert_eq!(body["success"], false, "{}", what);
        assert_eq!(body["code"], "VALIDATION_ERROR", "{}", what);
        assert!(body["error"].is_string(), "{}", what);
    };

    let (status, body) = fixture.get("/news/not-a-number").await;
    assert_envelope(status, &body, "non-integer id");

    let (status, body) = fixture.get("/news?page=1&page=2").await;
    assert_envelope(status, &body, "repeated query key");

    let resp = fixture
        .client
        .post(fixture.url("/news"))
        .header("content-type", "application/json")
        .body("{\"title\": ")
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    assert_envelope(status, &resp.json().await.unwrap(), "truncated JSON body");

    let resp = fixture
        .client
        .patch(fixture.url("/news/1"))
        .json(&json!({ "viewCount": "many" }))
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    assert_envelope(status, &resp.json().await.unwrap(), "mistyped JSON field");
}

#[tokio::test]
async fn test_inactive_articles_are_never_returned() {
    let fixture = TestFixture::new().await;
    fixture.create(article(1, "2024-01-01T00:00:00Z", &["x"])).await;
    let mut hidden = article(2, "2024-01-02T00:00:00Z", &["secret"]);
    hidden["isActive"] = json!(false);
    hidden["author"] = json!("Hidden Author");
    fixture.create(hidden).await;

    let (_, body) = fixture.get("/news").await;
    assert_eq!(ids(&body), vec![1]);

    let (_, body) = fixture.get("/news/latest").await;
    assert_eq!(ids(&body), vec![1]);

    let (_, body) = fixture.get("/news/tags/all").await;
    assert_eq!(body["data"], json!(["x"]));

    let (_, body) = fixture.get("/news/authors/all").await;
    assert_eq!(body["data"], json!(["Admin"]));

    let (status, _) = fixture.get("/news/2").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_latest_returns_top_five() {
    let fixture = TestFixture::new().await;
    for id in 1..=7 {
        fixture
            .create(article(id, &format!("2024-04-0{}T00:00:00Z", id), &[]))
            .await;
    }

    let (status, body) = fixture.get("/news/latest").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(ids(&body), vec![7, 6, 5, 4, 3]);
    assert!(body.get("pagination").is_none());
}

#[tokio::test]
async fn test_distinct_tags_and_authors() {
    let fixture = TestFixture::new().await;
    let mut first = article(1, "2024-01-01T00:00:00Z", &["x", "y"]);
    first["author"] = json!("Zed");
    fixture.create(first).await;
    let mut second = article(2, "2024-01-02T00:00:00Z", &["y", "z"]);
    second["author"] = json!("Amy");
    fixture.create(second).await;
    let mut third = article(3, "2024-01-03T00:00:00Z", &[]);
    third["author"] = json!("Zed");
    fixture.create(third).await;

    let (status, body) = fixture.get("/news/tags/all").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"], json!(["x", "y", "z"]));

    let (_, body) = fixture.get("/news/authors/all").await;
    assert_eq!(body["data"], json!(["Amy", "Zed"]));
}

#[tokio::test]
async fn test_article_crud() {
    let fixture = TestFixture::new().await;

    // Create without id: defaults applied, id assigned
    let created = fixture
        .create(json!({
            "title": "  Breaking  ",
            "fullContent": "Something happened",
            "preview": "Something",
            "tags": ["world", "world", "politics"],
        }))
        .await;
    assert_eq!(created["success"], true);
    assert_eq!(created["data"]["id"], 1);
    assert_eq!(created["data"]["title"], "Breaking");
    assert_eq!(created["data"]["author"], "Admin");
    assert_eq!(created["data"]["tags"], json!(["world", "politics"]));
    assert_eq!(created["data"]["viewCount"], 0);
    assert_eq!(created["data"]["isActive"], true);

    // Get
    let (status, body) = fixture.get("/news/1").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["title"], "Breaking");

    // Update via PATCH
    let resp = fixture
        .client
        .patch(fixture.url("/news/1"))
        .json(&json!({ "title": "Updated", "viewCount": 12 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["title"], "Updated");
    assert_eq!(body["data"]["viewCount"], 12);
    assert_eq!(body["data"]["fullContent"], "Something happened");

    // Updated text is searchable
    let (_, body) = fixture.get("/news?search=updated").await;
    assert_eq!(ids(&body), vec![1]);

    // Update via PUT with an invalid view count
    let resp = fixture
        .client
        .put(fixture.url("/news/1"))
        .json(&json!({ "viewCount": -3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Delete
    let resp = fixture
        .client
        .delete(fixture.url("/news/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let (status, body) = fixture.get("/news/1").await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "NOT_FOUND");

    let (_, body) = fixture.get("/news?search=updated").await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_validation_and_conflict() {
    let fixture = TestFixture::new().await;
    fixture.create(article(5, "2024-01-01T00:00:00Z", &[])).await;

    let resp = fixture
        .client
        .post(fixture.url("/news"))
        .json(&article(5, "2024-01-01T00:00:00Z", &[]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "CONFLICT");

    let mut blank = article(6, "2024-01-01T00:00:00Z", &[]);
    blank["title"] = json!("   ");
    let resp = fixture
        .client
        .post(fixture.url("/news"))
        .json(&blank)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}
