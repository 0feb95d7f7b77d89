//! Identity provider seam

use async_trait::async_trait;

use crate::auth::types::IdentityUser;
use crate::core::AppResult;

/// Hosted identity service that owns user sessions.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Validate a session token; returns the provider's user id.
    async fn verify_session(&self, token: &str) -> AppResult<String>;

    async fn fetch_user(&self, user_id: &str) -> AppResult<IdentityUser>;
}
