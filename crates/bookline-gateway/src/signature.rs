// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook signature verification.
//!
//! The provider signs each delivery with a header of comma-separated
//! `key=value` pairs carrying `t` (timestamp) and `v1` (hex-encoded
//! HMAC-SHA256 over `"{t}.{raw_body}"`). Verification never panics or
//! errors; anything malformed simply fails.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Verify a webhook delivery against the shared secret.
///
/// When no secret is configured, verification is SKIPPED and every
/// delivery is accepted. This is a deliberate operational bypass for
/// environments without a configured secret -- it trades authenticity for
/// zero-config operation and is a documented security weakening, not a
/// bug. Configure `webhook.signing_secret` in production.
///
/// Returns `false` (never an error) on a missing header, missing `t`/`v1`
/// fields, or a malformed header. The signature comparison is
/// constant-time.
pub fn verify(signature_header: Option<&str>, raw_body: &[u8], secret: Option<&str>) -> bool {
    let Some(secret) = secret else {
        return true;
    };

    let Some(header) = signature_header else {
        warn!("webhook delivery without signature header rejected");
        return false;
    };

    let (mut timestamp, mut signature) = (None, None);
    for pair in header.split(',') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        match key.trim() {
            "t" if timestamp.is_none() => timestamp = Some(value.trim()),
            "v1" if signature.is_none() => signature = Some(value.trim()),
            _ => {}
        }
    }
    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        warn!("webhook signature header missing t/v1 fields");
        return false;
    };

    let Ok(signature_bytes) = hex::decode(signature) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(raw_body);

    // verify_slice is a constant-time comparison.
    mac.verify_slice(&signature_bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hex-encoded HMAC-SHA256 over `"{t}.{body}"`.
    fn sign(secret: &str, timestamp: &str, body: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.{body}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_is_accepted() {
        let sig = sign("s3cr3t", "1700000000", "{}");
        let header = format!("t=1700000000,v1={sig}");
        assert!(verify(Some(&header), b"{}", Some("s3cr3t")));
    }

    #[test]
    fn any_single_character_mutation_is_rejected() {
        let sig = sign("s3cr3t", "1700000000", "{}");
        for i in 0..sig.len() {
            let mut mutated: Vec<char> = sig.chars().collect();
            mutated[i] = if mutated[i] == '0' { '1' } else { '0' };
            let mutated: String = mutated.into_iter().collect();
            if mutated == sig {
                continue;
            }
            let header = format!("t=1700000000,v1={mutated}");
            assert!(
                !verify(Some(&header), b"{}", Some("s3cr3t")),
                "mutation at {i} accepted"
            );
        }
    }

    #[test]
    fn wrong_body_or_timestamp_is_rejected() {
        let sig = sign("s3cr3t", "1700000000", "{}");
        let header = format!("t=1700000000,v1={sig}");
        assert!(!verify(Some(&header), b"{\"a\":1}", Some("s3cr3t")));

        let header = format!("t=1700000001,v1={sig}");
        assert!(!verify(Some(&header), b"{}", Some("s3cr3t")));
    }

    #[test]
    fn missing_secret_skips_verification() {
        assert!(verify(None, b"{}", None));
        assert!(verify(Some("garbage"), b"{}", None));
    }

    #[test]
    fn missing_or_malformed_header_is_rejected() {
        assert!(!verify(None, b"{}", Some("s3cr3t")));
        assert!(!verify(Some(""), b"{}", Some("s3cr3t")));
        assert!(!verify(Some("t=1700000000"), b"{}", Some("s3cr3t")));
        assert!(!verify(Some("v1=abcd"), b"{}", Some("s3cr3t")));
        assert!(!verify(Some("no pairs here"), b"{}", Some("s3cr3t")));
        assert!(!verify(Some("t=1,v1=not-hex"), b"{}", Some("s3cr3t")));
    }

    #[test]
    fn first_t_and_v1_win() {
        let sig = sign("s3cr3t", "1700000000", "{}");
        let header = format!("t=1700000000,v1={sig},t=9999999999,v1=deadbeef");
        assert!(verify(Some(&header), b"{}", Some("s3cr3t")));
    }
}
