//! `Stripe-Signature` header verification

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::core::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Accepted clock skew for signed payloads, in seconds.
pub const TOLERANCE_SECS: i64 = 5 * 60;

pub struct SignatureVerifier {
    secret: Vec<u8>,
}

impl SignatureVerifier {
    pub fn new(secret: &str) -> Self {
        Self { secret: secret.as_bytes().to_vec() }
    }

    /// Hex HMAC-SHA256 over `timestamp.payload`.
    pub fn sign(&self, timestamp: i64, payload: &[u8]) -> AppResult<String> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::Internal(format!("invalid webhook secret: {e}")))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Header shape: `t=<unix>,v1=<hex>[,v1=<hex>...]`.
    pub fn verify(&self, header: &str, payload: &[u8], now: i64) -> AppResult<()> {
        let invalid = |why: &str| AppError::BadRequest(format!("Webhook Error: {why}"));

        let mut timestamp = None;
        let mut signatures = Vec::new();
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
                Some(("v1", value)) => signatures.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or_else(|| invalid("missing timestamp"))?;
        if signatures.is_empty() {
            return Err(invalid("no v1 signature"));
        }
        if now.abs_diff(timestamp) > TOLERANCE_SECS as u64 {
            return Err(invalid("timestamp outside the tolerance zone"));
        }

        let expected = self.sign(timestamp, payload)?;
        let matched = signatures
            .iter()
            .any(|sig| bool::from(sig.as_bytes().ct_eq(expected.as_bytes())));
        if matched {
            Ok(())
        } else {
            Err(invalid("signature mismatch"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_stripe_secret";
    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_valid_signature() {
        let verifier = SignatureVerifier::new(SECRET);
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        let sig = verifier.sign(NOW, payload).unwrap();
        let header = format!("t={NOW},v1=deadbeef,v1={sig},v0=ignored");
        assert!(verifier.verify(&header, payload, NOW + 30).is_ok());
    }

    #[test]
    fn test_rejects_wrong_secret() {
        let payload = b"{}";
        let sig = SignatureVerifier::new("whsec_other").sign(NOW, payload).unwrap();
        let header = format!("t={NOW},v1={sig}");
        assert!(SignatureVerifier::new(SECRET).verify(&header, payload, NOW).is_err());
    }

    #[test]
    fn test_rejects_stale_and_malformed() {
        let verifier = SignatureVerifier::new(SECRET);
        let sig = verifier.sign(NOW, b"{}").unwrap();
        let header = format!("t={NOW},v1={sig}");
        assert!(verifier.verify(&header, b"{}", NOW + TOLERANCE_SECS + 1).is_err());
        assert!(verifier.verify("v1=abc", b"{}", NOW).is_err());
        assert!(verifier.verify(&format!("t={NOW}"), b"{}", NOW).is_err());
    }

    #[test]
    fn test_extreme_timestamps_rejected() {
        let verifier = SignatureVerifier::new(SECRET);
        for t in [i64::MIN, i64::MAX] {
            let header = format!("t={t},v1=00");
            assert!(verifier.verify(&header, b"{}", NOW).is_err());
        }
        let header = format!("t={NOW},v1=00");
        assert!(verifier.verify(&header, b"{}", i64::MIN).is_err());
    }
}
