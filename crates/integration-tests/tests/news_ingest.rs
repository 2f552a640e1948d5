//! Integration tests for news ingestion and tag backfill.

use std::sync::Arc;

use axum::http::StatusCode;
use corretora_core::collections;
use corretora_functions::services::NewsService;
use corretora_functions::services::news::news_id;
use corretora_functions::stores::{DocumentStore, MemoryStore};
use corretora_integration_tests::{FakeCompletion, TestApp, fields, path};
use serde_json::json;

#[tokio::test]
async fn test_upsert_without_completion_key_returns_empty_summary() {
    let app = TestApp::new();

    let response = app
        .request(
            "POST",
            "/upsert-news-with-summary",
            Some(json!({"title": "X", "url": "http://y", "source": "Z"})),
            &[],
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["ok"], json!(true));
    assert_eq!(response.body["summary"], json!(""));
    assert_eq!(response.body["id"], json!(news_id("http://y")));

    let doc = app
        .store
        .document(&collections::news(&news_id("http://y")).expect("news path"))
        .await
        .expect("document written");
    assert_eq!(doc["title"], json!("X"));
    assert_eq!(doc["summary"], json!(""));
}

#[tokio::test]
async fn test_upsert_with_completion_stores_summary() {
    let completion = Arc::new(FakeCompletion::new(["Resumo da notícia."]));
    let app = TestApp::builder().completion(completion.clone()).build();

    let response = app
        .request(
            "POST",
            "/upsert-news-with-summary",
            Some(json!({
                "title": "Seguros de saúde sobem",
                "url": "https://eco.pt/a",
                "source": "ECO",
                "region": "PT",
                "publishedAt": "2024-05-01T09:00:00Z"
            })),
            &[],
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["summary"], json!("Resumo da notícia."));
    assert_eq!(completion.calls(), 1);

    let id = response.body["id"].as_str().expect("id");
    let doc = app
        .store
        .document(&collections::news(id).expect("news path"))
        .await
        .expect("document written");
    assert_eq!(doc["publishedAt"], json!("2024-05-01T09:00:00Z"));
    assert_eq!(doc["region"], json!("PT"));
}

#[tokio::test]
async fn test_reingest_keeps_publication_time_and_region() {
    let app = TestApp::new();

    let response = app
        .request(
            "POST",
            "/upsert-news-with-summary",
            Some(json!({
                "title": "Seguros de saúde sobem",
                "url": "https://eco.pt/a",
                "source": "ECO",
                "region": "PT",
                "publishedAt": "2024-05-01T09:00:00Z"
            })),
            &[],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .request(
            "POST",
            "/upsert-news-with-summary",
            Some(json!({
                "title": "Seguros de saúde sobem 5%",
                "url": "https://eco.pt/a",
                "source": "ECO"
            })),
            &[],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let doc = app
        .store
        .document(&collections::news(&news_id("https://eco.pt/a")).expect("news path"))
        .await
        .expect("document written");
    assert_eq!(doc["title"], json!("Seguros de saúde sobem 5%"));
    assert_eq!(doc["publishedAt"], json!("2024-05-01T09:00:00Z"));
    assert_eq!(doc["region"], json!("PT"));
}

#[tokio::test]
async fn test_upsert_rejects_missing_fields() {
    let app = TestApp::new();

    let response = app
        .request(
            "POST",
            "/upsert-news-with-summary",
            Some(json!({"title": "X", "url": "  ", "source": "Z"})),
            &[],
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["ok"], json!(false));

    let response = app
        .request("POST", "/upsert-news-with-summary", None, &[])
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    assert!(app.store.list(collections::NEWS).await.is_ok_and(|d| d.is_empty()));
}

#[tokio::test]
async fn test_upsert_store_failure_is_500() {
    let app = TestApp::new();
    app.store.fail_documents(true);

    let response = app
        .request(
            "POST",
            "/upsert-news-with-summary",
            Some(json!({"title": "X", "url": "http://y", "source": "Z"})),
            &[],
        )
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
}

// =============================================================================
// Tag backfill
// =============================================================================

async fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .put_document(
            path("news/a"),
            fields(json!({"title": "Novas regras auto", "url": "http://a", "source": "S"})),
        )
        .await;
    store
        .put_document(
            path("news/b"),
            fields(json!({"title": "Futebol", "url": "http://b", "source": "S"})),
        )
        .await;
    store
}

#[tokio::test]
async fn test_backfill_drops_unlisted_tags() {
    let store = seeded_store().await;
    let completion = Arc::new(FakeCompletion::new([
        r#"["auto","vida","desporto"]"#,
        r#"["desporto","futebol"]"#,
    ]));
    let service = NewsService::new(Arc::new(store.clone()), Some(completion));

    let report = service.backfill_tags(false, None).await.expect("backfill");
    assert_eq!(report.tagged, 1);
    assert_eq!(report.skipped, 1);

    let a = store.document(&path("news/a")).await.expect("doc a");
    assert_eq!(a["tags"], json!(["auto", "vida"]));

    let b = store.document(&path("news/b")).await.expect("doc b");
    assert!(!b.contains_key("tags"), "empty tag set must not be written");
}

#[tokio::test]
async fn test_backfill_without_completion_writes_nothing() {
    let store = seeded_store().await;
    let service = NewsService::new(Arc::new(store.clone()), None);

    let report = service.backfill_tags(false, None).await.expect("backfill");
    assert_eq!(report.tagged, 0);
    assert_eq!(report.skipped, 2);

    let docs = store.list(collections::NEWS).await.expect("list");
    assert!(docs.iter().all(|d| !d.fields.contains_key("tags")));
}
