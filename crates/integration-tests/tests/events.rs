//! Integration tests for event delivery, the notifier trigger and the
//! shared HTTP behaviour of the router.

use axum::http::StatusCode;
use corretora_functions::config::EmailConfig;
use corretora_integration_tests::{TestApp, fields, path};
use serde_json::json;

// =============================================================================
// Event delivery
// =============================================================================

#[tokio::test]
async fn test_events_require_secret() {
    let app = TestApp::new();
    let event = json!({"kind": "create", "document": "admins/u1"});

    let response = app
        .request("POST", "/events", Some(event.clone()), &[])
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            "POST",
            "/events",
            Some(event),
            &[("x-events-secret", "not-the-secret")],
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    assert_eq!(app.store.claim_writes(), 0);
}

#[tokio::test]
async fn test_events_route_absent_without_secret() {
    let app = TestApp::builder()
        .config(|config| config.events_secret = None)
        .build();

    let response = app
        .request(
            "POST",
            "/events",
            Some(json!({"kind": "create", "document": "admins/u1"})),
            &[],
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unmatched_event_is_accepted_and_ignored() {
    let app = TestApp::new();

    let response = app
        .event(json!({"kind": "update", "document": "news/abc", "after": {"title": "x"}}))
        .await;

    assert_eq!(response.status, StatusCode::ACCEPTED);
    assert_eq!(response.body, json!({"ok": true, "handled": false}));
}

#[tokio::test]
async fn test_malformed_event_is_400() {
    let app = TestApp::new();

    let response = app
        .event(json!({"kind": "create", "document": "admins"}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .event(json!({"kind": "upsert", "document": "admins/u1"}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// First-contact notifier
// =============================================================================

fn notifying_app() -> TestApp {
    TestApp::builder()
        .config(|config| {
            config.email = EmailConfig {
                service_id: Some("service_corretora".to_string()),
                template_id: Some("template_novo_chat".to_string()),
                public_key: Some("pk_live_123".to_string()),
                recipient: Some("geral@corretora.pt".to_string()),
                notifications_enabled: true,
                ..EmailConfig::default()
            };
        })
        .build()
}

fn client_message() -> serde_json::Value {
    json!({
        "kind": "create",
        "document": "chats/c1/messages/m1",
        "after": {"text": "Preciso de ajuda com um sinistro", "authorRole": "client"}
    })
}

#[tokio::test]
async fn test_notifier_dormant_by_default() {
    let app = TestApp::new();

    let response = app.event(client_message()).await;

    assert_eq!(response.status, StatusCode::ACCEPTED);
    assert!(app.email.sent().is_empty());
}

#[tokio::test]
async fn test_notifier_sends_once_per_chat() {
    let app = notifying_app();
    app.store
        .put_document(
            path("chats/c1"),
            fields(json!({"name": "Joana", "email": "joana@mail.pt", "phone": "913000000"})),
        )
        .await;

    let response = app.event(client_message()).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["handler"], json!("first_chat_message"));

    let sent = app.email.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["user_id"], json!("pk_live_123"));
    assert_eq!(sent[0]["template_params"]["to_email"], json!("geral@corretora.pt"));

    let chat = app.store.document(&path("chats/c1")).await.expect("chat");
    assert_eq!(chat["firstNotified"], json!(true));

    let mut second = client_message();
    second["document"] = json!("chats/c1/messages/m2");
    app.event(second).await;
    assert_eq!(app.email.sent().len(), 1);
}

#[tokio::test]
async fn test_notifier_ignores_staff_replies() {
    let app = notifying_app();

    let mut event = client_message();
    event["after"]["authorRole"] = json!("admin");
    let response = app.event(event).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(app.email.sent().is_empty());
}

// =============================================================================
// Shared behaviour
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let response = app.request("GET", "/health", None, &[]).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text, "ok");
}

#[tokio::test]
async fn test_request_id_header() {
    let app = TestApp::new();

    let response = app.request("GET", "/health", None, &[]).await;
    assert!(response.headers.contains_key("x-request-id"));

    let response = app
        .request("GET", "/health", None, &[("x-request-id", "req-42")])
        .await;
    assert_eq!(
        response.headers.get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("req-42")
    );
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = TestApp::new();

    let response = app
        .request(
            "OPTIONS",
            "/send-contact-email",
            None,
            &[
                ("Origin", "https://www.example-corretora.pt"),
                ("Access-Control-Request-Method", "POST"),
                ("Access-Control-Request-Headers", "content-type"),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.headers.contains_key("access-control-allow-origin"));
}
