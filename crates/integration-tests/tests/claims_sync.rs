//! Integration tests for admin claim synchronization, through both the
//! document-event triggers and the on-demand HTTP endpoint.

use axum::http::StatusCode;
use corretora_core::collections;
use corretora_integration_tests::{TestApp, fields, path, uid};
use serde_json::json;

// =============================================================================
// Authorization document triggers
// =============================================================================

#[tokio::test]
async fn test_authorization_created_grants_admin() {
    let app = TestApp::new();

    let response = app
        .event(json!({"kind": "create", "document": "admins/u1", "after": {}}))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["handled"], json!(true));
    assert_eq!(response.body["handler"], json!("authorization_created"));

    let claims = app.store.claims(&uid("u1")).await.expect("claims written");
    assert_eq!(claims.get("admin"), Some(&json!(true)));
}

#[tokio::test]
async fn test_authorization_deleted_removes_key() {
    let app = TestApp::new();
    app.store
        .seed_claims(
            uid("u1"),
            serde_json::from_value(json!({"admin": true, "plan": "pro"})).expect("claims"),
        )
        .await;

    let response = app
        .event(json!({"kind": "delete", "document": "admins/u1", "before": {}}))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let claims = app.store.claims(&uid("u1")).await.expect("claims written");
    assert!(claims.get("admin").is_none(), "admin key must be removed, not set false");
    assert_eq!(claims.get("plan"), Some(&json!("pro")));
}

#[tokio::test]
async fn test_grant_twice_is_idempotent() {
    let app = TestApp::new();
    let event = json!({"kind": "create", "document": "admins/u1"});

    app.event(event.clone()).await;
    let once = app.store.claims(&uid("u1")).await;
    app.event(event).await;
    let twice = app.store.claims(&uid("u1")).await;

    assert_eq!(once, twice);
    assert_eq!(app.store.claim_writes(), 2);
}

#[tokio::test]
async fn test_claim_failure_surfaces_as_500() {
    let app = TestApp::new();
    app.store.fail_credentials(true);

    let response = app
        .event(json!({"kind": "create", "document": "admins/u1"}))
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["ok"], json!(false));
}

// =============================================================================
// Profile update trigger
// =============================================================================

#[tokio::test]
async fn test_profile_update_with_equal_flags_writes_nothing() {
    let app = TestApp::new();

    for (before, after) in [
        (json!({"isAdmin": false}), json!({"isAdmin": false, "displayName": "Ana"})),
        (json!({}), json!({"isAdmin": "yes"})),
        (json!({"isAdmin": true}), json!({"isAdmin": true, "email": "a@b.pt"})),
    ] {
        let response = app
            .event(json!({
                "kind": "update",
                "document": "users/u1",
                "before": before,
                "after": after
            }))
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }

    assert_eq!(app.store.claim_reads(), 0);
    assert_eq!(app.store.claim_writes(), 0);
}

#[tokio::test]
async fn test_profile_update_follows_flag() {
    let app = TestApp::new();

    app.event(json!({
        "kind": "update",
        "document": "users/u1",
        "before": {"isAdmin": false},
        "after": {"isAdmin": true}
    }))
    .await;
    assert_eq!(
        app.store.claims(&uid("u1")).await.and_then(|c| c.get("admin").cloned()),
        Some(json!(true))
    );

    app.event(json!({
        "kind": "update",
        "document": "users/u1",
        "before": {"isAdmin": true},
        "after": {}
    }))
    .await;
    assert!(
        app.store
            .claims(&uid("u1"))
            .await
            .is_some_and(|c| c.get("admin").is_none())
    );
}

// =============================================================================
// sync-now endpoint
// =============================================================================

#[tokio::test]
async fn test_sync_without_header_is_401_and_writes_nothing() {
    let app = TestApp::new();

    let response = app.request("GET", "/sync-admin-claims", None, &[]).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["ok"], json!(false));
    assert!(
        response.body["error"]
            .as_str()
            .is_some_and(|e| e.contains("Bearer")),
        "error should explain the expected header: {:?}",
        response.body
    );
    assert_eq!(app.store.claim_reads(), 0);
    assert_eq!(app.store.claim_writes(), 0);
}

#[tokio::test]
async fn test_sync_with_malformed_header_is_401() {
    let app = TestApp::new();

    let response = app
        .request("POST", "/sync-admin-claims", None, &[("Authorization", "Token abc")])
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.claim_writes(), 0);
}

#[tokio::test]
async fn test_sync_with_invalid_token_is_500() {
    let app = TestApp::new();

    let response = app.sync_claims("expired-token").await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.store.claim_writes(), 0);
}

#[tokio::test]
async fn test_sync_uses_or_of_both_sources() {
    let app = TestApp::new();
    app.store.register_token("tok-u1", uid("u1")).await;
    app.store
        .put_document(collections::admin(&uid("u1")), fields(json!({})))
        .await;
    app.store
        .put_document(collections::user(&uid("u1")), fields(json!({"isAdmin": false})))
        .await;

    let response = app.sync_claims("tok-u1").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({"ok": true, "uid": "u1", "isAdmin": true})
    );
    let claims = app.store.claims(&uid("u1")).await.expect("claims written");
    assert_eq!(claims.get("admin"), Some(&json!(true)));
}

#[tokio::test]
async fn test_sync_profile_flag_alone_grants() {
    let app = TestApp::new();
    app.store.register_token("tok-u2", uid("u2")).await;
    app.store
        .put_document(path("users/u2"), fields(json!({"isAdmin": true})))
        .await;

    let response = app.sync_claims("tok-u2").await;
    assert_eq!(response.body["isAdmin"], json!(true));
}

#[tokio::test]
async fn test_sync_revokes_when_neither_source_grants() {
    let app = TestApp::new();
    app.store.register_token("tok-u3", uid("u3")).await;
    app.store
        .seed_claims(
            uid("u3"),
            serde_json::from_value(json!({"admin": true})).expect("claims"),
        )
        .await;

    let response = app
        .request("GET", "/sync-admin-claims", None, &[("Authorization", "Bearer tok-u3")])
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["isAdmin"], json!(false));
    let claims = app.store.claims(&uid("u3")).await.expect("claims written");
    assert!(claims.get("admin").is_none());
}
