//! Clerk identity provider over its REST API

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use super::r#trait::IdentityProvider;
use crate::auth::types::IdentityUser;
use crate::core::{AppError, AppResult};

#[derive(Debug, Deserialize)]
struct ClerkSession {
    user_id: String,
    status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClerkEmailVerification {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClerkEmailAddress {
    #[serde(default)]
    pub id: Option<String>,
    pub email_address: String,
    #[serde(default)]
    pub verification: Option<ClerkEmailVerification>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClerkPhoneNumber {
    pub phone_number: String,
}

/// User object as Clerk sends it, in API responses and webhooks alike.
#[derive(Debug, Clone, Deserialize)]
pub struct ClerkUser {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<ClerkEmailAddress>,
    #[serde(default)]
    pub primary_email_address_id: Option<String>,
    #[serde(default)]
    pub phone_numbers: Vec<ClerkPhoneNumber>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub public_metadata: serde_json::Value,
}

impl ClerkUser {
    pub fn into_identity(self) -> IdentityUser {
        let primary = self
            .primary_email_address_id
            .as_deref()
            .and_then(|pid| {
                self.email_addresses
                    .iter()
                    .find(|e| e.id.as_deref() == Some(pid))
            })
            .or_else(|| self.email_addresses.first());

        let email_verified = primary
            .and_then(|e| e.verification.as_ref())
            .and_then(|v| v.status.as_deref())
            == Some("verified");
        let is_admin = self.public_metadata.get("role").and_then(|r| r.as_str()) == Some("admin");

        IdentityUser {
            email: primary.map(|e| e.email_address.clone()),
            email_verified,
            phone: self.phone_numbers.first().map(|p| p.phone_number.clone()),
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            image_url: self.image_url.filter(|url| !url.is_empty()),
            is_admin,
        }
    }
}

pub struct ClerkProvider {
    client: reqwest::Client,
    api_url: String,
    secret_key: String,
}

impl ClerkProvider {
    pub fn new(api_url: &str, secret_key: &str) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal(format!("HTTP client init failed: {e}")))?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        })
    }
}

#[async_trait]
impl IdentityProvider for ClerkProvider {
    fn name(&self) -> &str {
        "clerk"
    }

    async fn verify_session(&self, token: &str) -> AppResult<String> {
        let url = format!("{}/v1/sessions/{}/verify", self.api_url, token);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            warn!(status = status.as_u16(), "clerk rejected session");
            return Err(AppError::Unauthorized("Invalid session token".to_string()));
        }
        if !status.is_success() {
            return Err(AppError::Upstream(format!("clerk returned {status}")));
        }

        let session: ClerkSession = response.json().await?;
        if session.status != "active" {
            return Err(AppError::Unauthorized("Session is not active".to_string()));
        }
        Ok(session.user_id)
    }

    async fn fetch_user(&self, user_id: &str) -> AppResult<IdentityUser> {
        let url = format!("{}/v1/users/{}", self.api_url, user_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::Unauthorized("User not found".to_string()));
        }
        if !status.is_success() {
            return Err(AppError::Upstream(format!("clerk returned {status}")));
        }

        let user: ClerkUser = response.json().await?;
        info!(clerk_id = %user.id, "fetched clerk user");
        Ok(user.into_identity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_verify_session_and_fetch_user() {
        let server = MockServer::start_async().await;
        let verify = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/sessions/sess_123/verify")
                    .header("authorization", "Bearer sk_test_key");
                then.status(200)
                    .json_body(json!({ "id": "sess_123", "user_id": "user_abc", "status": "active" }));
            })
            .await;
        let user = server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/users/user_abc");
                then.status(200).json_body(json!({
                    "id": "user_abc",
                    "primary_email_address_id": "em_2",
                    "email_addresses": [
                        { "id": "em_1", "email_address": "old@example.com" },
                        { "id": "em_2", "email_address": "Jane@Example.com",
                          "verification": { "status": "verified" } }
                    ],
                    "first_name": "Jane",
                    "last_name": "Doe",
                    "image_url": "https://img.example/jane.png",
                    "public_metadata": { "role": "admin" }
                }));
            })
            .await;

        let provider = ClerkProvider::new(&server.base_url(), "sk_test_key").unwrap();
        let user_id = provider.verify_session("sess_123").await.unwrap();
        assert_eq!(user_id, "user_abc");

        let identity = provider.fetch_user(&user_id).await.unwrap();
        assert_eq!(identity.email.as_deref(), Some("Jane@Example.com"));
        assert!(identity.email_verified);
        assert!(identity.is_admin);

        verify.assert_async().await;
        user.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_session_is_unauthorized() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/sessions/bad/verify");
                then.status(401).json_body(json!({ "errors": [] }));
            })
            .await;

        let provider = ClerkProvider::new(&server.base_url(), "sk_test_key").unwrap();
        let err = provider.verify_session("bad").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/users/u1");
                then.status(500);
            })
            .await;

        let provider = ClerkProvider::new(&server.base_url(), "sk_test_key").unwrap();
        assert!(matches!(provider.fetch_user("u1").await, Err(AppError::Upstream(_))));
    }
}
