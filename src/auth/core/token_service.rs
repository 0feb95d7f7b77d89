//! Self-issued JWTs (HS256)

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{AppError, AppResult};

const PASSWORD_RESET_TTL: u64 = 3600;
const EMAIL_VERIFICATION_TTL: u64 = 24 * 3600;
const MIN_SECRET_LEN: usize = 16;

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TokenPurpose {
    #[default]
    Access,
    Refresh,
    PasswordReset,
    EmailVerification,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Claims {
    user_id: String,
    /// Tokens without a purpose are access tokens.
    #[serde(default)]
    purpose: TokenPurpose,
    exp: usize,
    iat: usize,
}

pub struct TokenService {
    secret: zeroize::Zeroizing<String>,
    access_expiry: u64,
    refresh_expiry: u64,
}

impl TokenService {
    /// Rejects secrets too short to sign with.
    pub fn new(secret: String, access_expiry: u64, refresh_expiry: u64) -> AppResult<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(AppError::Internal(format!(
                "JWT secret must be at least {MIN_SECRET_LEN} characters"
            )));
        }
        Ok(Self {
            secret: zeroize::Zeroizing::new(secret),
            access_expiry,
            refresh_expiry,
        })
    }

    pub fn access_expiry(&self) -> u64 {
        self.access_expiry
    }

    fn ttl(&self, purpose: TokenPurpose) -> u64 {
        match purpose {
            TokenPurpose::Access => self.access_expiry,
            TokenPurpose::Refresh => self.refresh_expiry,
            TokenPurpose::PasswordReset => PASSWORD_RESET_TTL,
            TokenPurpose::EmailVerification => EMAIL_VERIFICATION_TTL,
        }
    }

    pub fn issue(&self, user_id: &str, purpose: TokenPurpose) -> AppResult<String> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            user_id: user_id.to_string(),
            purpose,
            exp: now + self.ttl(purpose) as usize,
            iat: now,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("JWT signing failed: {e}")))?;

        debug!(?purpose, "issued token");
        Ok(token)
    }

    pub fn generate_token(&self, user_id: &str) -> AppResult<String> {
        self.issue(user_id, TokenPurpose::Access)
    }

    pub fn generate_refresh_token(&self, user_id: &str) -> AppResult<String> {
        self.issue(user_id, TokenPurpose::Refresh)
    }

    /// Validate signature, expiry and purpose; returns the user id.
    pub fn verify(&self, token: &str, expected: TokenPurpose) -> AppResult<String> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )?;

        if data.claims.purpose != expected {
            return Err(AppError::InvalidToken);
        }
        Ok(data.claims.user_id)
    }

    pub fn verify_token(&self, token: &str) -> AppResult<String> {
        self.verify(token, TokenPurpose::Access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("a_sufficiently_long_test_secret".to_string(), 3600, 7200).unwrap()
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(TokenService::new("short".to_string(), 60, 60).is_err());
    }

    #[test]
    fn test_access_token_roundtrip() {
        let service = service();
        let token = service.generate_token("user-42").unwrap();
        assert_eq!(service.verify_token(&token).unwrap(), "user-42");
    }

    #[test]
    fn test_purpose_is_enforced() {
        let service = service();
        let refresh = service.generate_refresh_token("user-42").unwrap();
        assert!(matches!(service.verify_token(&refresh), Err(AppError::InvalidToken)));
        assert_eq!(service.verify(&refresh, TokenPurpose::Refresh).unwrap(), "user-42");

        let reset = service.issue("user-42", TokenPurpose::PasswordReset).unwrap();
        assert!(service.verify(&reset, TokenPurpose::EmailVerification).is_err());
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let other = TokenService::new("another_long_secret_value_here".to_string(), 60, 60).unwrap();
        let token = other.generate_token("user-1").unwrap();
        assert!(matches!(service().verify_token(&token), Err(AppError::InvalidToken)));
        assert!(service().verify_token("garbage").is_err());
    }

    #[test]
    fn test_expired_token() {
        let service = service();
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            user_id: "user-1".into(),
            purpose: TokenPurpose::Access,
            exp: now - 3600,
            iat: now - 7200,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"a_sufficiently_long_test_secret"),
        )
        .unwrap();
        assert!(matches!(service.verify_token(&token), Err(AppError::TokenExpired)));
    }
}
