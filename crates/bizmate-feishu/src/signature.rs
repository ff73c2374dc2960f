// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook signature verification.
//!
//! HMAC-SHA256 over `timestamp + nonce + body`, keyed by the app secret,
//! hex-encoded. Deliveries without signature headers pass through, matching
//! the platform's behavior for apps without signing enabled; the
//! `verify_signatures` config flag controls whether verification runs at all.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Verifies a webhook delivery. Returns true when the delivery should be
/// accepted.
pub fn verify(
    secret: &str,
    timestamp: Option<&str>,
    nonce: Option<&str>,
    signature: Option<&str>,
    body: &str,
) -> bool {
    let (Some(timestamp), Some(nonce), Some(signature)) = (timestamp, nonce, signature) else {
        warn!("webhook delivery without signature headers, accepting");
        return true;
    };

    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(timestamp.as_bytes());
    mac.update(nonce.as_bytes());
    mac.update(body.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, timestamp: &str, nonce: &str, body: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}{nonce}{body}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_verifies() {
        let body = r#"{"type":"url_verification"}"#;
        let sig = sign("app-secret", "1700000000", "nonce-1", body);
        assert!(verify(
            "app-secret",
            Some("1700000000"),
            Some("nonce-1"),
            Some(&sig),
            body
        ));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let sig = sign("app-secret", "1700000000", "nonce-1", "{}");
        assert!(!verify(
            "app-secret",
            Some("1700000000"),
            Some("nonce-1"),
            Some(&sig),
            r#"{"evil":true}"#
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let sig = sign("other-secret", "1700000000", "nonce-1", "{}");
        assert!(!verify(
            "app-secret",
            Some("1700000000"),
            Some("nonce-1"),
            Some(&sig),
            "{}"
        ));
    }

    #[test]
    fn missing_headers_pass_through() {
        assert!(verify("app-secret", None, None, None, "{}"));
        assert!(verify("app-secret", Some("t"), None, Some("sig"), "{}"));
    }

    #[test]
    fn non_hex_signature_is_rejected() {
        assert!(!verify(
            "app-secret",
            Some("t"),
            Some("n"),
            Some("not hex!"),
            "{}"
        ));
    }
}
