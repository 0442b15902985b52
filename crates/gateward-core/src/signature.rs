//! Request Signature Validation
//!
//! Time-bound HMAC-SHA256 over `"{timestamp}.{body}"`, base64url
//! encoded. Comparison goes through `Mac::verify_slice`, which is
//! constant-time, so invalid signatures leak nothing about the secret.
//! Timestamp freshness is the controller's job, not this module's.

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the signature for a timestamp + raw body. Used by tests and
/// by trusted internal callers that sign their own requests.
pub fn sign(secret: &[u8], timestamp: &str, body: &[u8]) -> String {
	let mut mac = new_mac(secret);
	mac.update(timestamp.as_bytes());
	mac.update(b".");
	mac.update(body);
	base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

/// Verify a supplied signature against the expected one.
///
/// Fails when either header is absent, the encoding is invalid, or the
/// MAC does not match. Always runs the full MAC before comparing.
pub fn verify(
	secret: &[u8],
	signature_header: Option<&str>,
	timestamp_header: Option<&str>,
	body: &[u8],
) -> bool {
	let (Some(signature), Some(timestamp)) = (signature_header, timestamp_header) else {
		return false;
	};
	let Ok(supplied) = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(signature) else {
		return false;
	};

	let mut mac = new_mac(secret);
	mac.update(timestamp.as_bytes());
	mac.update(b".");
	mac.update(body);
	mac.verify_slice(&supplied).is_ok()
}

fn new_mac(secret: &[u8]) -> HmacSha256 {
	// HMAC accepts keys of any length
	#[allow(clippy::unwrap_used)]
	let mac = HmacSha256::new_from_slice(secret).unwrap();
	mac
}

#[cfg(test)]
mod tests {
	use super::*;

	const SECRET: &[u8] = b"test-shared-secret";

	#[test]
	fn test_roundtrip() {
		let sig = sign(SECRET, "1700000000000", b"{\"a\":1}");
		assert!(verify(SECRET, Some(&sig), Some("1700000000000"), b"{\"a\":1}"));
	}

	#[test]
	fn test_missing_headers_fail() {
		let sig = sign(SECRET, "1700000000000", b"x");
		assert!(!verify(SECRET, None, Some("1700000000000"), b"x"));
		assert!(!verify(SECRET, Some(&sig), None, b"x"));
	}

	#[test]
	fn test_wrong_secret_fails() {
		let sig = sign(b"other-secret", "1700000000000", b"x");
		assert!(!verify(SECRET, Some(&sig), Some("1700000000000"), b"x"));
	}

	#[test]
	fn test_tampered_body_fails() {
		let sig = sign(SECRET, "1700000000000", b"{\"amount\":1}");
		assert!(!verify(SECRET, Some(&sig), Some("1700000000000"), b"{\"amount\":9}"));
	}

	#[test]
	fn test_shifted_timestamp_fails() {
		let sig = sign(SECRET, "1700000000000", b"x");
		assert!(!verify(SECRET, Some(&sig), Some("1700000000001"), b"x"));
	}

	#[test]
	fn test_garbage_encoding_fails() {
		assert!(!verify(SECRET, Some("!!not-base64!!"), Some("1700000000000"), b"x"));
	}
}

// vim: ts=4
