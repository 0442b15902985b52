//! Input Sanitization
//!
//! Strips known-dangerous substrings from request payload text before it
//! reaches the protected handlers. A payload the sanitizer cannot safely
//! clean (not UTF-8, oversized) is rejected outright rather than passed
//! through partially cleaned.

use regex::Regex;
use std::sync::LazyLock;

use crate::prelude::*;

// Patterns are literals proven valid by the tests below
static SCRIPT_TAG: LazyLock<Regex> = LazyLock::new(|| compiled(r"(?is)<\s*script[^>]*>.*?<\s*/\s*script\s*>"));
static EVENT_HANDLER: LazyLock<Regex> = LazyLock::new(|| compiled(r"(?i)\bon[a-z]+\s*="));
static SQL_COMMENT: LazyLock<Regex> = LazyLock::new(|| compiled(r"(--|/\*|\*/|;\s*drop\s+table)"));
static JS_URI: LazyLock<Regex> = LazyLock::new(|| compiled(r"(?i)javascript\s*:"));

fn compiled(pattern: &str) -> Regex {
	#[allow(clippy::unwrap_used)]
	let re = Regex::new(pattern).unwrap();
	re
}

/// Sanitize a raw request body.
///
/// Returns the cleaned text. `Error::MalformedInput` when the payload is
/// not valid UTF-8, contains NUL bytes, or exceeds `max_bytes`.
pub fn sanitize_body(body: &[u8], max_bytes: usize) -> GwResult<String> {
	if body.len() > max_bytes {
		debug!(size = body.len(), "payload over size cap, rejecting");
		return Err(Error::MalformedInput);
	}
	if body.contains(&0u8) {
		return Err(Error::MalformedInput);
	}
	let text = std::str::from_utf8(body).map_err(|_| Error::MalformedInput)?;

	let cleaned = SCRIPT_TAG.replace_all(text, "");
	let cleaned = EVENT_HANDLER.replace_all(&cleaned, "");
	let cleaned = JS_URI.replace_all(&cleaned, "");
	let cleaned = SQL_COMMENT.replace_all(&cleaned, "");

	Ok(cleaned.into_owned())
}

#[cfg(test)]
mod tests {
	use super::*;

	const CAP: usize = 1024;

	#[test]
	fn test_clean_body_passes_through() {
		let body = br#"{"title":"hello","count":3}"#;
		assert_eq!(sanitize_body(body, CAP).unwrap(), r#"{"title":"hello","count":3}"#);
	}

	#[test]
	fn test_script_tag_stripped() {
		let out = sanitize_body(b"a<script>alert(1)</script>b", CAP).unwrap();
		assert_eq!(out, "ab");
	}

	#[test]
	fn test_event_handler_stripped() {
		let out = sanitize_body(b"<img onerror=hack() src=x>", CAP).unwrap();
		assert!(!out.contains("onerror"));
	}

	#[test]
	fn test_sql_comment_stripped() {
		let out = sanitize_body(b"name'-- comment", CAP).unwrap();
		assert!(!out.contains("--"));
	}

	#[test]
	fn test_invalid_utf8_rejected() {
		assert!(matches!(sanitize_body(&[0xff, 0xfe], CAP), Err(Error::MalformedInput)));
	}

	#[test]
	fn test_nul_byte_rejected() {
		assert!(matches!(sanitize_body(b"a\0b", CAP), Err(Error::MalformedInput)));
	}

	#[test]
	fn test_oversized_rejected() {
		let big = vec![b'a'; CAP + 1];
		assert!(matches!(sanitize_body(&big, CAP), Err(Error::MalformedInput)));
	}
}

// vim: ts=4
