//! Request fingerprinting for anomaly correlation.
//!
//! Derives a stable hash from a fixed ordered tuple of request
//! attributes. Coarser than an identity: many callers behind one NAT or
//! one browser build share a fingerprint, which is exactly what the
//! anomaly detector correlates on. Never an authentication credential.

use base64::Engine;
use sha2::{Digest, Sha256};

/// The attribute tuple a fingerprint is derived from, in hash order.
#[derive(Debug, Default, Clone)]
pub struct FingerprintInput<'a> {
	pub user_agent: Option<&'a str>,
	pub accept_language: Option<&'a str>,
	pub accept_encoding: Option<&'a str>,
	pub client_addr: Option<&'a str>,
}

/// Derive the fingerprint for a request.
///
/// Deterministic: identical tuples always produce identical output.
/// Absent attributes hash as empty, but field boundaries are delimited
/// so `("ab", "")` and `("a", "b")` cannot collide.
pub fn fingerprint(input: &FingerprintInput<'_>) -> String {
	let mut hasher = Sha256::new();
	for part in [
		input.user_agent,
		input.accept_language,
		input.accept_encoding,
		input.client_addr,
	] {
		hasher.update(part.unwrap_or_default().as_bytes());
		hasher.update([0u8]);
	}
	let digest = hasher.finalize();
	// 128 bits is plenty for correlation keys
	base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&digest[..16])
}


// vim: ts=4
