//! Identity provider webhooks (Svix signing scheme)

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::core::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Accepted clock skew between the sender and us, in seconds.
pub const TOLERANCE_SECS: i64 = 5 * 60;

pub struct WebhookVerifier {
    key: Vec<u8>,
}

impl WebhookVerifier {
    /// `secret` is `whsec_` followed by the base64 signing key.
    pub fn new(secret: &str) -> AppResult<Self> {
        let encoded = secret.strip_prefix("whsec_").unwrap_or(secret);
        let key = STANDARD
            .decode(encoded)
            .map_err(|_| AppError::Internal("webhook secret is not valid base64".to_string()))?;
        Ok(Self { key })
    }

    /// Base64 HMAC-SHA256 over `id.timestamp.body`.
    pub fn sign(&self, msg_id: &str, timestamp: i64, body: &[u8]) -> AppResult<String> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| AppError::Internal(format!("invalid webhook key: {e}")))?;
        mac.update(msg_id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Check the `svix-signature` header (space separated `v1,<sig>` entries).
    pub fn verify(
        &self,
        msg_id: &str,
        timestamp: &str,
        signature_header: &str,
        body: &[u8],
        now: i64,
    ) -> AppResult<()> {
        let invalid = || AppError::BadRequest("Invalid webhook signature".to_string());

        let sent_at: i64 = timestamp.trim().parse().map_err(|_| invalid())?;
        if now.abs_diff(sent_at) > TOLERANCE_SECS as u64 {
            return Err(invalid());
        }

        let expected = self.sign(msg_id, sent_at, body)?;
        let matched = signature_header
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == "v1")
            .any(|(_, sig)| bool::from(sig.as_bytes().ct_eq(expected.as_bytes())));

        if matched {
            Ok(())
        } else {
            Err(invalid())
        }
    }
}

/// Envelope of an identity webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

    #[test]
    fn test_valid_signature_accepted() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let body = br#"{"type":"user.created","data":{"id":"user_1"}}"#;
        let sig = verifier.sign("msg_1", 1_700_000_000, body).unwrap();
        let header = format!("v1,bogus v1,{sig}");
        assert!(verifier
            .verify("msg_1", "1700000000", &header, body, 1_700_000_010)
            .is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let sig = verifier.sign("msg_1", 1_700_000_000, b"{}").unwrap();
        let header = format!("v1,{sig}");
        assert!(verifier
            .verify("msg_1", "1700000000", &header, b"{\"x\":1}", 1_700_000_000)
            .is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let sig = verifier.sign("msg_1", 1_700_000_000, b"{}").unwrap();
        let header = format!("v1,{sig}");
        let later = 1_700_000_000 + TOLERANCE_SECS + 1;
        assert!(verifier.verify("msg_1", "1700000000", &header, b"{}", later).is_err());
    }

    #[test]
    fn test_extreme_timestamps_rejected() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        for sent_at in [i64::MIN, i64::MAX] {
            let result =
                verifier.verify("msg_1", &sent_at.to_string(), "v1,AAAA", b"{}", 1_700_000_000);
            assert!(matches!(result, Err(AppError::BadRequest(_))));
        }
    }

    #[test]
    fn test_bad_secret() {
        assert!(WebhookVerifier::new("whsec_!!!").is_err());
    }
}
