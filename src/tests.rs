//! Integration tests for the Oro backend.
//!
//! Each test boots the real server on an ephemeral port with a throwaway
//! SQLite database and talks to it through the crate's own API client.

use std::sync::Arc;

use sqlx::SqlitePool;
use tempfile::TempDir;

use crate::client::{ApiClient, ClientError, PromptQueries, PromptQueryParams, QueryCache};
use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::models::{CreatePromptRequest, UpdatePromptRequest};
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    api: ApiClient,
    pool: SqlitePool,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool.clone()));

        // Create config
        let config = Config {
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
        };

        let state = AppState {
            repo,
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
            api: ApiClient::new(&base_url),
            pool,
            base_url,
            _temp_dir: temp_dir,
        }
    }

    /// Insert an execution row directly; executions have no API write path.
    async fn seed_execution(
        &self,
        prompt_id: &str,
        rating: Option<i64>,
        success: bool,
        executed_at: &str,
    ) {
        sqlx::query(
            "INSERT INTO executions (prompt_id, rating, success, notes, executed_at) \
             VALUES (?, ?, ?, NULL, ?)",
        )
        .bind(prompt_id)
        .bind(rating)
        .bind(success as i32)
        .bind(executed_at)
        .execute(&self.pool)
        .await
        .expect("Failed to seed execution");
    }

    /// Pin a prompt's creation time for deterministic ordering assertions.
    async fn set_created_at(&self, prompt_id: &str, created_at: &str) {
        sqlx::query("UPDATE prompts SET created_at = ? WHERE id = ?")
            .bind(created_at)
            .bind(prompt_id)
            .execute(&self.pool)
            .await
            .expect("Failed to set created_at");
    }
}

fn create_req(name: &str, content: &str) -> CreatePromptRequest {
    CreatePromptRequest {
        name: name.to_string(),
        content: content.to_string(),
        ..Default::default()
    }
}

/// Unwrap an expected API error, asserting its status and returning the
/// server message.
fn expect_api_error<T: std::fmt::Debug>(
    result: Result<T, ClientError>,
    expected_status: u16,
) -> String {
    match result {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, expected_status, "unexpected status: {}", message);
            message
        }
        Err(other) => panic!("expected API error, got: {}", other),
        Ok(value) => panic!("expected error, got success: {:?}", value),
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = reqwest::get(format!("{}/health", fixture.base_url))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_prompt_crud() {
    let fixture = TestFixture::new().await;

    // Create
    let mut req = create_req("summarizer", "Summarize: {input}");
    req.description = Some("Summarizes text".to_string());
    let created = fixture.api.create_prompt(&req).await.unwrap();
    assert_eq!(created.name, "summarizer");
    assert_eq!(created.content, "Summarize: {input}");
    assert_eq!(created.description.as_deref(), Some("Summarizes text"));
    assert!(created.system_prompt.is_none());
    assert!(created.tags.is_empty());
    assert!(created.executions.is_empty());
    assert_eq!(created.created_at, created.updated_at);

    // Get
    let fetched = fixture.api.get_prompt(&created.id).await.unwrap();
    assert_eq!(fetched.name, "summarizer");

    // Update
    let patch = UpdatePromptRequest {
        content: Some("Summarize concisely: {input}".to_string()),
        ..Default::default()
    };
    let updated = fixture.api.update_prompt(&created.id, &patch).await.unwrap();
    assert_eq!(updated.content, "Summarize concisely: {input}");
    assert_eq!(updated.name, "summarizer");
    assert_ne!(updated.updated_at, created.updated_at);
    assert_eq!(updated.created_at, created.created_at);

    // Delete
    let deleted = fixture.api.delete_prompt(&created.id).await.unwrap();
    assert_eq!(deleted.message, "Prompt deleted successfully");

    // Verify deleted
    let err = fixture.api.get_prompt(&created.id).await;
    assert_eq!(expect_api_error(err, 404), "Prompt not found");
}

#[tokio::test]
async fn test_create_prompt_requires_name_and_content() {
    let fixture = TestFixture::new().await;

    let err = fixture.api.create_prompt(&create_req("", "body")).await;
    assert_eq!(expect_api_error(err, 400), "name and content are required");

    let err = fixture.api.create_prompt(&create_req("named", "  ")).await;
    expect_api_error(err, 400);
}

#[tokio::test]
async fn test_missing_body_fields_get_structured_400() {
    let fixture = TestFixture::new().await;
    let client = reqwest::Client::new();

    // A body omitting a required field gets the same 400 {error} answer
    // as one carrying it empty
    let resp = client
        .post(format!("{}/api/v1/prompts", fixture.base_url))
        .json(&serde_json::json!({"content": "body with no name"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "name and content are required");

    let resp = client
        .post(format!("{}/api/v1/tags", fixture.base_url))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "name is required");
}

#[tokio::test]
async fn test_duplicate_prompt_name_conflict() {
    let fixture = TestFixture::new().await;

    fixture
        .api
        .create_prompt(&create_req("X", "first"))
        .await
        .unwrap();

    let err = fixture.api.create_prompt(&create_req("X", "second")).await;
    assert_eq!(
        expect_api_error(err, 409),
        "Prompt with this name already exists"
    );

    // Exactly one prompt named "X" survives
    let list = fixture
        .api
        .list_prompts(&PromptQueryParams::default())
        .await
        .unwrap();
    assert_eq!(list.total, 1);
    assert_eq!(list.prompts[0].content, "first");
}

#[tokio::test]
async fn test_update_conflict_on_name_collision() {
    let fixture = TestFixture::new().await;

    fixture
        .api
        .create_prompt(&create_req("alpha", "a"))
        .await
        .unwrap();
    let beta = fixture
        .api
        .create_prompt(&create_req("beta", "b"))
        .await
        .unwrap();

    let patch = UpdatePromptRequest {
        name: Some("alpha".to_string()),
        ..Default::default()
    };
    let err = fixture.api.update_prompt(&beta.id, &patch).await;
    assert_eq!(
        expect_api_error(err, 409),
        "Prompt with this name already exists"
    );

    // Re-submitting the unchanged name is not a conflict
    let patch = UpdatePromptRequest {
        name: Some("beta".to_string()),
        ..Default::default()
    };
    assert!(fixture.api.update_prompt(&beta.id, &patch).await.is_ok());
}

#[tokio::test]
async fn test_partial_update_field_presence() {
    let fixture = TestFixture::new().await;

    let mut req = create_req("patchy", "original content");
    req.description = Some("original description".to_string());
    req.system_prompt = Some("be terse".to_string());
    let created = fixture.api.create_prompt(&req).await.unwrap();

    // Absent fields stay untouched
    let patch = UpdatePromptRequest {
        name: Some("patchy-2".to_string()),
        ..Default::default()
    };
    let updated = fixture.api.update_prompt(&created.id, &patch).await.unwrap();
    assert_eq!(updated.content, "original content");
    assert_eq!(updated.description.as_deref(), Some("original description"));
    assert_eq!(updated.system_prompt.as_deref(), Some("be terse"));

    // Explicit empty string overwrites a nullable text field
    let patch = UpdatePromptRequest {
        description: Some(Some(String::new())),
        ..Default::default()
    };
    let updated = fixture.api.update_prompt(&created.id, &patch).await.unwrap();
    assert_eq!(updated.description.as_deref(), Some(""));

    // Explicit null clears it
    let patch = UpdatePromptRequest {
        system_prompt: Some(None),
        ..Default::default()
    };
    let updated = fixture.api.update_prompt(&created.id, &patch).await.unwrap();
    assert!(updated.system_prompt.is_none());

    // name/content must be non-empty when present
    let patch = UpdatePromptRequest {
        content: Some(String::new()),
        ..Default::default()
    };
    let err = fixture.api.update_prompt(&created.id, &patch).await;
    assert_eq!(expect_api_error(err, 400), "content cannot be empty");
}

#[tokio::test]
async fn test_update_unknown_prompt_is_404() {
    let fixture = TestFixture::new().await;

    let patch = UpdatePromptRequest {
        name: Some("whatever".to_string()),
        ..Default::default()
    };
    let err = fixture.api.update_prompt("no-such-id", &patch).await;
    assert_eq!(expect_api_error(err, 404), "Prompt not found");

    let err = fixture.api.delete_prompt("no-such-id").await;
    expect_api_error(err, 404);
}

#[tokio::test]
async fn test_prompt_tag_associations() {
    let fixture = TestFixture::new().await;

    let python = fixture.api.create_tag("python").await.unwrap();
    let rust = fixture.api.create_tag("rust").await.unwrap();

    let mut req = create_req("tagged", "body");
    req.tag_ids = vec![python.id, rust.id];
    let created = fixture.api.create_prompt(&req).await.unwrap();
    let names: Vec<&str> = created.tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["python", "rust"]);

    // tag_ids replaces the whole association set
    let patch = UpdatePromptRequest {
        tag_ids: Some(vec![rust.id]),
        ..Default::default()
    };
    let updated = fixture.api.update_prompt(&created.id, &patch).await.unwrap();
    assert_eq!(updated.tags.len(), 1);
    assert_eq!(updated.tags[0].name, "rust");

    // Unknown tag ids are rejected up front
    let mut req = create_req("bad-tags", "body");
    req.tag_ids = vec![9999];
    let err = fixture.api.create_prompt(&req).await;
    assert_eq!(expect_api_error(err, 400), "Tag with id 9999 does not exist");
}

#[tokio::test]
async fn test_list_filters_by_tags() {
    let fixture = TestFixture::new().await;

    let a = fixture.api.create_tag("a").await.unwrap();
    let b = fixture.api.create_tag("b").await.unwrap();
    fixture.api.create_tag("c").await.unwrap();

    let mut req = create_req("has-a", "body");
    req.tag_ids = vec![a.id];
    fixture.api.create_prompt(&req).await.unwrap();

    let mut req = create_req("has-a-b", "body");
    req.tag_ids = vec![a.id, b.id];
    fixture.api.create_prompt(&req).await.unwrap();

    fixture
        .api
        .create_prompt(&create_req("untagged", "body"))
        .await
        .unwrap();

    // OR across requested tags: any one matching tag qualifies
    let params = PromptQueryParams {
        tags: vec!["a".to_string(), "b".to_string()],
        ..Default::default()
    };
    let list = fixture.api.list_prompts(&params).await.unwrap();
    assert_eq!(list.total, 2);

    let params = PromptQueryParams {
        tags: vec!["b".to_string()],
        ..Default::default()
    };
    let list = fixture.api.list_prompts(&params).await.unwrap();
    assert_eq!(list.total, 1);
    assert_eq!(list.prompts[0].name, "has-a-b");

    // Disjoint tag set excludes everything
    let params = PromptQueryParams {
        tags: vec!["c".to_string()],
        ..Default::default()
    };
    let list = fixture.api.list_prompts(&params).await.unwrap();
    assert_eq!(list.total, 0);
    assert!(list.prompts.is_empty());
}

#[tokio::test]
async fn test_list_search_and_tags_combine() {
    let fixture = TestFixture::new().await;

    let ml = fixture.api.create_tag("ml").await.unwrap();

    let mut req = create_req("classifier", "classify the input");
    req.tag_ids = vec![ml.id];
    fixture.api.create_prompt(&req).await.unwrap();

    let mut req = create_req("regressor", "predict a number");
    req.description = Some("classify nothing".to_string());
    fixture.api.create_prompt(&req).await.unwrap();

    // Search matches name, content, or description
    let params = PromptQueryParams {
        search: Some("classify".to_string()),
        ..Default::default()
    };
    let list = fixture.api.list_prompts(&params).await.unwrap();
    assert_eq!(list.total, 2);

    // Search AND tags
    let params = PromptQueryParams {
        search: Some("classify".to_string()),
        tags: vec!["ml".to_string()],
        ..Default::default()
    };
    let list = fixture.api.list_prompts(&params).await.unwrap();
    assert_eq!(list.total, 1);
    assert_eq!(list.prompts[0].name, "classifier");
}

#[tokio::test]
async fn test_search_wildcards_match_literally() {
    let fixture = TestFixture::new().await;

    fixture
        .api
        .create_prompt(&create_req("discount", "take 100% off"))
        .await
        .unwrap();
    fixture
        .api
        .create_prompt(&create_req("markup", "take 100x more"))
        .await
        .unwrap();
    fixture
        .api
        .create_prompt(&create_req("snake_case", "body"))
        .await
        .unwrap();

    // "%" in the term is a literal character, not a wildcard
    let params = PromptQueryParams {
        search: Some("100%".to_string()),
        ..Default::default()
    };
    let list = fixture.api.list_prompts(&params).await.unwrap();
    assert_eq!(list.total, 1);
    assert_eq!(list.prompts[0].name, "discount");

    // Same for "_"
    let params = PromptQueryParams {
        search: Some("snake_case".to_string()),
        ..Default::default()
    };
    let list = fixture.api.list_prompts(&params).await.unwrap();
    assert_eq!(list.total, 1);

    let params = PromptQueryParams {
        search: Some("snakeXcase".to_string()),
        ..Default::default()
    };
    let list = fixture.api.list_prompts(&params).await.unwrap();
    assert_eq!(list.total, 0);
}

#[tokio::test]
async fn test_list_pagination_and_ordering() {
    let fixture = TestFixture::new().await;

    let oldest = fixture
        .api
        .create_prompt(&create_req("oldest", "body"))
        .await
        .unwrap();
    let middle = fixture
        .api
        .create_prompt(&create_req("middle", "body"))
        .await
        .unwrap();
    let newest = fixture
        .api
        .create_prompt(&create_req("newest", "body"))
        .await
        .unwrap();

    fixture
        .set_created_at(&oldest.id, "2026-01-01T00:00:00+00:00")
        .await;
    fixture
        .set_created_at(&middle.id, "2026-02-01T00:00:00+00:00")
        .await;
    fixture
        .set_created_at(&newest.id, "2026-03-01T00:00:00+00:00")
        .await;

    // Most recent first
    let list = fixture
        .api
        .list_prompts(&PromptQueryParams::default())
        .await
        .unwrap();
    let names: Vec<&str> = list.prompts.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["newest", "middle", "oldest"]);

    // Pagination slices without affecting the total
    let params = PromptQueryParams {
        skip: 1,
        limit: 1,
        ..Default::default()
    };
    let page = fixture.api.list_prompts(&params).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.skip, 1);
    assert_eq!(page.limit, 1);
    assert_eq!(page.prompts.len(), 1);
    assert_eq!(page.prompts[0].name, "middle");

    // Out-of-range limits are clamped and echoed back
    let params = PromptQueryParams {
        limit: 5000,
        ..Default::default()
    };
    let page = fixture.api.list_prompts(&params).await.unwrap();
    assert_eq!(page.limit, 1000);
}

#[tokio::test]
async fn test_list_empty_result_shape() {
    let fixture = TestFixture::new().await;

    let params = PromptQueryParams {
        search: Some("foo".to_string()),
        tags: vec!["a".to_string(), "b".to_string()],
        ..Default::default()
    };
    let list = fixture.api.list_prompts(&params).await.unwrap();
    assert!(list.prompts.is_empty());
    assert_eq!(list.total, 0);
    assert_eq!(list.skip, 0);
    assert_eq!(list.limit, 100);
}

#[tokio::test]
async fn test_list_embeds_recent_executions() {
    let fixture = TestFixture::new().await;

    let prompt = fixture
        .api
        .create_prompt(&create_req("runner", "body"))
        .await
        .unwrap();

    for day in 1..=7 {
        fixture
            .seed_execution(
                &prompt.id,
                Some(3),
                true,
                &format!("2026-05-{:02}T00:00:00+00:00", day),
            )
            .await;
    }

    // List items carry at most the 5 most recent executions
    let list = fixture
        .api
        .list_prompts(&PromptQueryParams::default())
        .await
        .unwrap();
    let item = &list.prompts[0];
    assert_eq!(item.executions.len(), 5);
    assert_eq!(item.executions[0].executed_at, "2026-05-07T00:00:00+00:00");
    assert_eq!(item.executions[4].executed_at, "2026-05-03T00:00:00+00:00");

    // The single-prompt view carries the full history, newest first
    let detail = fixture.api.get_prompt(&prompt.id).await.unwrap();
    assert_eq!(detail.executions.len(), 7);
    assert!(detail.executions[0].success);
}

#[tokio::test]
async fn test_stats_zero_executions() {
    let fixture = TestFixture::new().await;

    let prompt = fixture
        .api
        .create_prompt(&create_req("unused", "body"))
        .await
        .unwrap();

    let stats = fixture.api.prompt_stats(&prompt.id).await.unwrap();
    assert_eq!(stats.total_executions, 0);
    assert!(stats.average_rating.is_none());
    assert_eq!(stats.success_rate, 0.0);
    assert!(stats.last_executed_at.is_none());
}

#[tokio::test]
async fn test_stats_aggregation() {
    let fixture = TestFixture::new().await;

    let prompt = fixture
        .api
        .create_prompt(&create_req("rated", "body"))
        .await
        .unwrap();

    // Ratings [4, null, 5], success flags [true, true, false]
    fixture
        .seed_execution(&prompt.id, Some(4), true, "2026-05-01T00:00:00+00:00")
        .await;
    fixture
        .seed_execution(&prompt.id, None, true, "2026-05-03T00:00:00+00:00")
        .await;
    fixture
        .seed_execution(&prompt.id, Some(5), false, "2026-05-02T00:00:00+00:00")
        .await;

    let stats = fixture.api.prompt_stats(&prompt.id).await.unwrap();
    assert_eq!(stats.total_executions, 3);
    assert_eq!(stats.average_rating, Some(4.5));
    assert_eq!(stats.success_rate, 0.67);
    // Maximum timestamp, not the last row inserted
    assert_eq!(
        stats.last_executed_at.as_deref(),
        Some("2026-05-03T00:00:00+00:00")
    );
}

#[tokio::test]
async fn test_stats_unknown_prompt_is_404() {
    let fixture = TestFixture::new().await;

    let err = fixture.api.prompt_stats("no-such-id").await;
    assert_eq!(expect_api_error(err, 404), "Prompt not found");
}

#[tokio::test]
async fn test_delete_cascades_to_tags_and_executions() {
    let fixture = TestFixture::new().await;

    let tag = fixture.api.create_tag("doomed").await.unwrap();
    let mut req = create_req("cascade", "body");
    req.tag_ids = vec![tag.id];
    let prompt = fixture.api.create_prompt(&req).await.unwrap();
    fixture
        .seed_execution(&prompt.id, Some(5), true, "2026-05-01T00:00:00+00:00")
        .await;

    fixture.api.delete_prompt(&prompt.id).await.unwrap();

    // The tag itself survives, but its count drops to zero
    let tags = fixture.api.list_tags().await.unwrap();
    let doomed = tags.iter().find(|t| t.name == "doomed").unwrap();
    assert_eq!(doomed.prompt_count, 0);

    // No orphaned rows remain
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM executions WHERE prompt_id = ?")
            .bind(&prompt.id)
            .fetch_one(&fixture.pool)
            .await
            .unwrap();
    assert_eq!(row.0, 0);
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM prompt_tags WHERE prompt_id = ?")
        .bind(&prompt.id)
        .fetch_one(&fixture.pool)
        .await
        .unwrap();
    assert_eq!(row.0, 0);
}

#[tokio::test]
async fn test_tag_create_and_duplicate() {
    let fixture = TestFixture::new().await;

    let tag = fixture.api.create_tag("x").await.unwrap();
    assert_eq!(tag.name, "x");
    assert!(tag.id > 0);

    let err = fixture.api.create_tag("x").await;
    assert_eq!(
        expect_api_error(err, 409),
        "Tag with this name already exists"
    );
}

#[tokio::test]
async fn test_tag_name_required() {
    let fixture = TestFixture::new().await;

    let err = fixture.api.create_tag("   ").await;
    assert_eq!(expect_api_error(err, 400), "name is required");
}

#[tokio::test]
async fn test_tag_list_sorted_with_counts() {
    let fixture = TestFixture::new().await;

    let zulu = fixture.api.create_tag("zulu").await.unwrap();
    let alpha = fixture.api.create_tag("alpha").await.unwrap();

    let mut req = create_req("one", "body");
    req.tag_ids = vec![zulu.id, alpha.id];
    fixture.api.create_prompt(&req).await.unwrap();

    let mut req = create_req("two", "body");
    req.tag_ids = vec![zulu.id];
    fixture.api.create_prompt(&req).await.unwrap();

    let tags = fixture.api.list_tags().await.unwrap();
    let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "zulu"]);
    assert_eq!(tags[0].prompt_count, 1);
    assert_eq!(tags[1].prompt_count, 2);
}

#[tokio::test]
async fn test_query_cache_invalidation_on_mutation() {
    let fixture = TestFixture::new().await;

    let cache = Arc::new(QueryCache::new());
    let queries = PromptQueries::new(ApiClient::new(&fixture.base_url), Arc::clone(&cache));

    let params = PromptQueryParams::default();
    let first = queries.prompts(&params).await.unwrap();
    assert_eq!(first.total, 0);
    assert_eq!(cache.len(), 1);

    // A cached read does not see server-side changes...
    fixture
        .api
        .create_prompt(&create_req("fresh", "body"))
        .await
        .unwrap();
    let stale = queries.prompts(&params).await.unwrap();
    assert_eq!(stale.total, 0);

    // ...but a mutation through the query layer invalidates and refetches
    queries
        .create_prompt(&create_req("second", "body"))
        .await
        .unwrap();
    let refreshed = queries.prompts(&params).await.unwrap();
    assert_eq!(refreshed.total, 2);
}
