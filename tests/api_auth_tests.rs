//! Account lifecycle over HTTP.

mod common;

use axum::http::StatusCode;
use common::{bearer, test_app, PASSWORD};
use serde_json::{json, Value};

#[tokio::test]
async fn test_register_login_profile() {
    let app = test_app();
    let account = app.register("guest@example.com").await;

    let login = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "Guest@Example.com", "password": PASSWORD }))
        .await;
    assert_eq!(login.status_code(), StatusCode::OK);
    let body: Value = login.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Login successful");
    assert!(body["data"]["refreshToken"].is_string());
    assert!(body["data"]["user"].get("password").is_none());

    let profile = app
        .server
        .get("/api/auth/profile")
        .add_header("Authorization", bearer(&account.token))
        .await;
    assert_eq!(profile.status_code(), StatusCode::OK);
    let body: Value = profile.json();
    assert_eq!(body["data"]["user"]["email"], "guest@example.com");
    assert_eq!(body["data"]["user"]["role"], "user");
    assert_eq!(body["data"]["user"]["loyaltyProgram"]["membershipLevel"], "Bronze");
}

#[tokio::test]
async fn test_duplicate_and_bad_credentials() {
    let app = test_app();
    app.register("dup@example.com").await;

    let again = app
        .server
        .post("/api/auth/register")
        .json(&json!({
            "email": "dup@example.com",
            "password": PASSWORD,
            "firstName": "Dup",
            "lastName": "User"
        }))
        .await;
    assert_eq!(again.status_code(), StatusCode::CONFLICT);
    let body: Value = again.json();
    assert_eq!(body["type"], "ConflictError");

    let wrong = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "dup@example.com", "password": "wrong123" }))
        .await;
    assert_eq!(wrong.status_code(), StatusCode::UNAUTHORIZED);

    let weak = app
        .server
        .post("/api/auth/register")
        .json(&json!({
            "email": "weak@example.com",
            "password": "abc",
            "firstName": "Weak",
            "lastName": "User"
        }))
        .await;
    assert_eq!(weak.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_protected_routes_need_token() {
    let app = test_app();

    let missing = app.server.get("/api/auth/profile").await;
    assert_eq!(missing.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = missing.json();
    assert_eq!(body["message"], "Access denied. No token provided.");

    let garbage = app
        .server
        .get("/api/auth/profile")
        .add_header("Authorization", "Bearer not-a-jwt")
        .await;
    assert_eq!(garbage.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_only_user_listing() {
    let app = test_app();
    let guest = app.register("plain@example.com").await;
    let admin = app.register_admin("boss@example.com").await;

    let denied = app
        .server
        .get("/api/auth/users")
        .add_header("Authorization", bearer(&guest.token))
        .await;
    assert_eq!(denied.status_code(), StatusCode::FORBIDDEN);

    let listed = app
        .server
        .get("/api/auth/users?limit=1")
        .add_header("Authorization", bearer(&admin.token))
        .await;
    assert_eq!(listed.status_code(), StatusCode::OK);
    let body: Value = listed.json();
    assert_eq!(body["data"]["users"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["pagination"]["total"], 2);
    assert_eq!(body["data"]["pagination"]["pages"], 2);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = test_app();
    app.register("forgetful@example.com").await;

    let forgot = app
        .server
        .post("/api/auth/forgot-password")
        .json(&json!({ "email": "forgetful@example.com" }))
        .await;
    assert_eq!(forgot.status_code(), StatusCode::OK);
    let body: Value = forgot.json();
    let token = body["data"]["token"].as_str().unwrap().to_string();

    // unknown addresses get the same answer without a token
    let unknown = app
        .server
        .post("/api/auth/forgot-password")
        .json(&json!({ "email": "nobody@example.com" }))
        .await;
    assert_eq!(unknown.status_code(), StatusCode::OK);
    let body: Value = unknown.json();
    assert!(body["data"].get("token").is_none());

    let reset = app
        .server
        .post("/api/auth/reset-password")
        .json(&json!({ "token": token, "password": "newpass456" }))
        .await;
    assert_eq!(reset.status_code(), StatusCode::OK);

    let old = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "forgetful@example.com", "password": PASSWORD }))
        .await;
    assert_eq!(old.status_code(), StatusCode::UNAUTHORIZED);
    let new = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "forgetful@example.com", "password": "newpass456" }))
        .await;
    assert_eq!(new.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_email_verification() {
    let app = test_app();
    app.register("verify@example.com").await;

    let resend = app
        .server
        .post("/api/auth/resend-verification")
        .json(&json!({ "email": "verify@example.com" }))
        .await;
    assert_eq!(resend.status_code(), StatusCode::OK);
    let body: Value = resend.json();
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let verified = app.server.get(&format!("/api/auth/verify-email/{token}")).await;
    assert_eq!(verified.status_code(), StatusCode::OK);
    let body: Value = verified.json();
    assert_eq!(body["data"]["user"]["verificationStatus"]["email"], true);

    let again = app
        .server
        .post("/api/auth/resend-verification")
        .json(&json!({ "email": "verify@example.com" }))
        .await;
    assert_eq!(again.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_change_password_and_delete_account() {
    let app = test_app();
    let account = app.register("mover@example.com").await;

    let wrong = app
        .server
        .post("/api/auth/change-password")
        .add_header("Authorization", bearer(&account.token))
        .json(&json!({ "currentPassword": "nope1234", "newPassword": "fresh789" }))
        .await;
    assert_eq!(wrong.status_code(), StatusCode::UNAUTHORIZED);

    let changed = app
        .server
        .post("/api/auth/change-password")
        .add_header("Authorization", bearer(&account.token))
        .json(&json!({ "currentPassword": PASSWORD, "newPassword": "fresh789" }))
        .await;
    assert_eq!(changed.status_code(), StatusCode::OK);

    let deleted = app
        .server
        .delete("/api/auth/account")
        .add_header("Authorization", bearer(&account.token))
        .await;
    assert_eq!(deleted.status_code(), StatusCode::OK);

    let login = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "mover@example.com", "password": "fresh789" }))
        .await;
    assert_eq!(login.status_code(), StatusCode::UNAUTHORIZED);
}
