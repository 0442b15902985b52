//! Error taxonomy for the admission layer.
//!
//! Per-request error kinds all resolve to an `AdmissionDecision` inside
//! the controller and are never surfaced past its boundary. Only
//! `Configuration` is fatal, and only at startup.

pub type GwResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	/// Malformed route metadata. Fatal at startup, never per-request.
	Configuration(String),
	/// Counter store timed out or errored. Resolved by the limiter's
	/// fail-open/fail-closed policy, never surfaced to the caller.
	StoreUnavailable,
	/// Request signature missing, stale, or failed HMAC verification.
	InvalidSignature,
	/// Fixed-window quota exhausted.
	RateExceeded,
	/// Behavioral or burst analysis flagged the caller.
	BehaviorFlagged,
	/// Caller's tenant does not own the requested resource.
	TenantMismatch,
	/// Sanitizer rejected a payload it cannot safely clean.
	MalformedInput,

	// externals
	Io(std::io::Error),
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Self::Io(err)
	}
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Error::Configuration(msg) => write!(f, "configuration error: {}", msg),
			Error::StoreUnavailable => write!(f, "counter store unavailable"),
			Error::InvalidSignature => write!(f, "invalid request signature"),
			Error::RateExceeded => write!(f, "rate limit exceeded"),
			Error::BehaviorFlagged => write!(f, "request pattern flagged"),
			Error::TenantMismatch => write!(f, "cross-tenant access denied"),
			Error::MalformedInput => write!(f, "request payload rejected"),
			Error::Io(err) => write!(f, "io error: {}", err),
		}
	}
}

impl std::error::Error for Error {}

impl Error {
	/// Stable machine-readable code, used in audit logs and HTTP bodies.
	pub fn code(&self) -> &'static str {
		match self {
			Error::Configuration(_) => "E-CONFIG",
			Error::StoreUnavailable => "E-STORE-UNAVAILABLE",
			Error::InvalidSignature => "E-SIG-INVALID",
			Error::RateExceeded => "E-RATE-LIMITED",
			Error::BehaviorFlagged => "E-BEHAVIOR-FLAGGED",
			Error::TenantMismatch => "E-TENANT-MISMATCH",
			Error::MalformedInput => "E-INPUT-MALFORMED",
			Error::Io(_) => "E-INTERNAL",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_error_codes_are_stable() {
		assert_eq!(Error::RateExceeded.code(), "E-RATE-LIMITED");
		assert_eq!(Error::TenantMismatch.code(), "E-TENANT-MISMATCH");
		assert_eq!(Error::Configuration("x".into()).code(), "E-CONFIG");
	}
}

// vim: ts=4
