//! Stripe webhook signature verification.
//!
//! Implements Stripe's signing scheme: the `Stripe-Signature` header carries
//! a unix timestamp and one or more HMAC-SHA256 signatures over
//! `"{timestamp}.{raw_body}"`:
//! <https://docs.stripe.com/webhooks/signature>
//!
//! Verification must run on the raw request bytes before the body is parsed
//! or any state is written.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

/// Maximum allowed clock skew between the signed timestamp and now (replay
/// protection window).
pub const TOLERANCE_SECS: i64 = 300;

/// Signature verification errors.
///
/// All variants are rejected with a 400-class response; the distinction only
/// feeds the response message and logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// Header is not `t=...,v1=...` shaped.
    #[error("Malformed signature header")]
    Malformed,

    /// Signed timestamp is outside the tolerance window.
    #[error("Request timestamp outside tolerance")]
    Stale,

    /// No candidate signature matched the payload.
    #[error("Signature mismatch")]
    Mismatch,

    /// HMAC computation failed.
    #[error("Signature computation failed: {0}")]
    Crypto(String),
}

/// Verifies `Stripe-Signature` headers against a shared signing secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: SecretString,
}

impl WebhookVerifier {
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Verify a signature header against the raw request body.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError`] if the header is malformed, the timestamp
    /// is outside the tolerance window, or no signature matches.
    pub fn verify(&self, payload: &[u8], header: &str) -> Result<(), SignatureError> {
        self.verify_at(payload, header, chrono::Utc::now().timestamp())
    }

    /// Verify against an explicit `now`, so tests never depend on the wall
    /// clock.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError`] if the header is malformed, the timestamp
    /// is outside the tolerance window, or no signature matches.
    pub fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<(), SignatureError> {
        let parsed = ParsedHeader::parse(header)?;

        // Check timestamp to prevent replay attacks
        if (now - parsed.timestamp).abs() > TOLERANCE_SECS {
            return Err(SignatureError::Stale);
        }

        let expected = compute_signature(
            self.secret.expose_secret().as_bytes(),
            parsed.timestamp,
            payload,
        )?;

        // Stripe sends multiple v1 entries during secret rotation; any match
        // is accepted.
        if parsed
            .signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate))
        {
            debug!("Webhook signature verified");
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }
}

/// Build a valid `Stripe-Signature` header value for a payload.
///
/// Counterpart to [`WebhookVerifier::verify_at`]; used by tests and the local
/// delivery script to produce signed requests.
///
/// # Errors
///
/// Returns [`SignatureError::Crypto`] if HMAC computation fails.
pub fn sign_header(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, SignatureError> {
    let signature = compute_signature(secret.as_bytes(), timestamp, payload)?;
    Ok(format!("t={timestamp},v1={signature}"))
}

struct ParsedHeader<'a> {
    timestamp: i64,
    signatures: Vec<&'a str>,
}

impl<'a> ParsedHeader<'a> {
    fn parse(header: &'a str) -> Result<Self, SignatureError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                return Err(SignatureError::Malformed);
            };
            match key {
                "t" => {
                    timestamp = Some(value.parse::<i64>().map_err(|_| SignatureError::Malformed)?);
                }
                "v1" => signatures.push(value),
                // Unknown schemes (v0 test-mode signatures) are ignored
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
        if signatures.is_empty() {
            return Err(SignatureError::Malformed);
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

fn compute_signature(
    secret: &[u8],
    timestamp: i64,
    payload: &[u8],
) -> Result<String, SignatureError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret)
        .map_err(|e| SignatureError::Crypto(e.to_string()))?;

    // Signed payload is "{timestamp}.{raw_body}"
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_k9Q2mX7rT4wP8nL1vB5c";
    const NOW: i64 = 1_700_000_000;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(SecretString::from(SECRET))
    }

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(constant_time_compare("", ""));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hell"));
        assert!(!constant_time_compare("hello", "helloo"));
    }

    #[test]
    fn test_verify_valid_signature() {
        let payload = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let header = sign_header(SECRET, NOW, payload).unwrap();

        assert!(verifier().verify_at(payload, &header, NOW).is_ok());
    }

    #[test]
    fn test_verify_rejects_tampered_payload() {
        let payload = br#"{"id":"evt_1","amount_total":19900}"#;
        let header = sign_header(SECRET, NOW, payload).unwrap();

        let tampered = br#"{"id":"evt_1","amount_total":1}"#;
        assert_eq!(
            verifier().verify_at(tampered, &header, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let payload = b"{}";
        let header = sign_header("whsec_some_other_secret_value", NOW, payload).unwrap();

        assert_eq!(
            verifier().verify_at(payload, &header, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_verify_rejects_stale_timestamp() {
        let payload = b"{}";
        let header = sign_header(SECRET, NOW - TOLERANCE_SECS - 1, payload).unwrap();

        assert_eq!(
            verifier().verify_at(payload, &header, NOW),
            Err(SignatureError::Stale)
        );
    }

    #[test]
    fn test_verify_accepts_timestamp_at_tolerance_boundary() {
        let payload = b"{}";
        let header = sign_header(SECRET, NOW - TOLERANCE_SECS, payload).unwrap();

        assert!(verifier().verify_at(payload, &header, NOW).is_ok());
    }

    #[test]
    fn test_verify_rejects_future_timestamp() {
        let payload = b"{}";
        let header = sign_header(SECRET, NOW + TOLERANCE_SECS + 60, payload).unwrap();

        assert_eq!(
            verifier().verify_at(payload, &header, NOW),
            Err(SignatureError::Stale)
        );
    }

    #[test]
    fn test_verify_rejects_malformed_headers() {
        let v = verifier();
        for header in [
            "",
            "garbage",
            "t=notanumber,v1=abc",
            "v1=abc",         // missing timestamp
            "t=1700000000",   // missing signature
            "t=1700000000,x", // part without '='
        ] {
            assert_eq!(
                v.verify_at(b"{}", header, NOW),
                Err(SignatureError::Malformed),
                "header {header:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_verify_accepts_any_matching_v1_during_rotation() {
        let payload = b"{}";
        let valid = sign_header(SECRET, NOW, payload).unwrap();
        // Prepend a stale-secret signature, as Stripe does during rotation
        let sig = valid.split_once(",v1=").unwrap().1;
        let header = format!("t={NOW},v1={},v1={sig}", "0".repeat(64));

        assert!(verifier().verify_at(payload, &header, NOW).is_ok());
    }

    #[test]
    fn test_verify_ignores_unknown_schemes() {
        let payload = b"{}";
        let valid = sign_header(SECRET, NOW, payload).unwrap();
        let header = format!("{valid},v0=legacy");

        assert!(verifier().verify_at(payload, &header, NOW).is_ok());
    }
}
