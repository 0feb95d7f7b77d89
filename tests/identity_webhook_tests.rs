//! Identity provider webhooks over HTTP.

mod common;

use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use common::{test_app, test_app_with, TestApp};
use serde_json::{json, Value};
use smartlodge::auth::WebhookVerifier;
use smartlodge::core::AppConfig;

fn secret() -> String {
    format!("whsec_{}", STANDARD.encode(b"identity-signing-key"))
}

fn identity_app() -> TestApp {
    let mut config = AppConfig::for_test();
    config.identity.clerk_webhook_secret = Some(secret());
    test_app_with(config, None)
}

async fn deliver(app: &TestApp, path: &str, msg_id: &str, event: &Value) -> axum_test::TestResponse {
    let body = serde_json::to_vec(event).unwrap();
    let now = Utc::now().timestamp();
    let signature = WebhookVerifier::new(&secret()).unwrap().sign(msg_id, now, &body).unwrap();
    app.server
        .post(path)
        .bytes(body.into())
        .add_header("svix-id", msg_id.to_string())
        .add_header("svix-timestamp", now.to_string())
        .add_header("svix-signature", format!("v1,{signature}"))
        .await
}

#[tokio::test]
async fn test_user_created_and_deleted() {
    let app = identity_app();
    let created = json!({
        "type": "user.created",
        "data": {
            "id": "user_remote_1",
            "email_addresses": [{ "email_address": "Remote@Example.com" }],
            "first_name": "Remote",
            "last_name": "Guest"
        }
    });

    let response = deliver(&app, "/api/webhooks/clerk", "msg_1", &created).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["message"], "Webhook processed successfully");

    let user = app
        .state
        .db
        .users
        .find_by_key("clerkId", "user_remote_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.email, "remote@example.com");
    assert!(user.is_active);

    // redelivery is harmless
    let again = deliver(&app, "/api/auth/clerk-webhook", "msg_1", &created).await;
    assert_eq!(again.status_code(), StatusCode::OK);
    assert_eq!(app.state.db.users.list().await.unwrap().len(), 1);

    let deleted = json!({ "type": "user.deleted", "data": { "id": "user_remote_1" } });
    let response = deliver(&app, "/api/auth/clerk-webhook", "msg_2", &deleted).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let user = app.state.db.users.get(&user.id).await.unwrap().unwrap();
    assert!(!user.is_active);
}

#[tokio::test]
async fn test_rejects_unsigned_and_tampered() {
    let app = identity_app();

    let unsigned = app.server.post("/api/webhooks/clerk").text("{}").await;
    assert_eq!(unsigned.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = unsigned.json();
    assert_eq!(body["message"], "Missing svix headers");

    let now = Utc::now().timestamp();
    let tampered = app
        .server
        .post("/api/webhooks/clerk")
        .text(r#"{"type":"user.created","data":{}}"#)
        .add_header("svix-id", "msg_x")
        .add_header("svix-timestamp", now.to_string())
        .add_header("svix-signature", "v1,bm90LWEtc2lnbmF0dXJl")
        .await;
    assert_eq!(tampered.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unconfigured_webhook_is_unavailable() {
    let app = test_app();
    let response = app.server.post("/api/webhooks/clerk").text("{}").await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
}
