//! Admission Policy Configuration
//!
//! Static route metadata plus the fixed policy constants every component
//! reads. Validated once at startup; malformed metadata is fatal there
//! and never per-request.

use std::collections::{HashMap, HashSet};

use crate::prelude::*;

/// Store-unavailable policy for a route.
///
/// Authentication endpoints fail closed: credential abuse is higher-risk
/// than a throttling false negative on general traffic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailMode {
	/// Admit when the counter store is unreachable.
	Open,
	/// Deny when the counter store is unreachable.
	Closed,
}

/// Per-route admission metadata.
#[derive(Clone, Debug)]
pub struct RouteConfig {
	/// Route name, also the limiter name in counter keys.
	pub name: String,
	/// Fixed window length in milliseconds.
	pub window_ms: i64,
	/// Base quota per identity per window.
	pub base_max: u32,
	/// Whether requests must carry a valid HMAC signature.
	pub requires_signature: bool,
	/// Whether the tenant isolation guard applies.
	pub tenant_scoped: bool,
	/// Store-unavailable policy.
	pub fail_mode: FailMode,
}

impl RouteConfig {
	/// General route: fail-open, no signature, not tenant-scoped.
	pub fn general(name: &str, window_ms: i64, base_max: u32) -> Self {
		Self {
			name: name.to_string(),
			window_ms,
			base_max,
			requires_signature: false,
			tenant_scoped: false,
			fail_mode: FailMode::Open,
		}
	}

	/// Auth route: fail-closed.
	pub fn auth(name: &str, window_ms: i64, base_max: u32) -> Self {
		Self {
			name: name.to_string(),
			window_ms,
			base_max,
			requires_signature: false,
			tenant_scoped: false,
			fail_mode: FailMode::Closed,
		}
	}

	pub fn with_signature(mut self) -> Self {
		self.requires_signature = true;
		self
	}

	pub fn tenant_scoped(mut self) -> Self {
		self.tenant_scoped = true;
		self
	}
}

/// Main admission configuration: route table + policy constants.
#[derive(Clone, Debug)]
pub struct GuardConfig {
	/// Route table, keyed by route name.
	pub routes: HashMap<String, RouteConfig>,

	/// Suspicion decay window (TTL of the violation counter).
	pub suspicion_ttl_ms: i64,
	/// Violations beyond this count trigger near-total lockout.
	pub suspicion_threshold: u32,
	/// Effective quota while locked out.
	pub lockout_max: u32,

	/// Country codes receiving the reduced quota multiplier.
	pub high_risk_countries: HashSet<String>,
	/// Quota multiplier for high-risk origins.
	pub high_risk_multiplier: f64,

	/// Mean inter-arrival floor below which a caller looks scripted.
	pub behavior_floor_ms: i64,
	/// Minimum samples before the behavioral analyzer may flag.
	pub behavior_min_samples: usize,
	/// Identities exempt from behavioral analysis (legitimate automation).
	pub behavior_allowlist: HashSet<String>,

	/// Trailing window for fingerprint burst detection.
	pub anomaly_window_ms: i64,
	/// Events within the trailing window beyond this count flag a burst.
	pub anomaly_threshold: usize,

	/// Per-key timestamp history cap (FIFO eviction past this).
	pub history_cap: usize,
	/// Maximum number of identities/fingerprints tracked in memory.
	pub max_tracked_keys: usize,

	/// Shared secret for request signatures. Required when any route
	/// sets `requires_signature`.
	pub signing_secret: Option<Vec<u8>>,
	/// Maximum age of a signed request's timestamp (replay window).
	pub signature_tolerance_ms: i64,
	/// Accepted future skew on signed timestamps (NTP drift).
	pub signature_future_skew_ms: i64,

	/// Counter store call timeout; beyond it the store counts as
	/// unreachable and the route's fail mode applies.
	pub store_timeout_ms: u64,

	/// Bodies beyond this size are rejected as malformed, not cleaned.
	pub max_body_bytes: usize,
}

impl Default for GuardConfig {
	fn default() -> Self {
		let mut routes = HashMap::new();
		// Auth: strict quota, fail-closed, to blunt credential stuffing
		routes.insert("auth".to_string(), RouteConfig::auth("auth", 60_000, 10));
		// General API browsing
		routes.insert("general".to_string(), RouteConfig::general("general", 60_000, 100));
		// Mutating endpoints: tenant-scoped. Hosts that configure a
		// signing secret typically also call `.with_signature()` here.
		routes.insert(
			"write".to_string(),
			RouteConfig::general("write", 60_000, 50).tenant_scoped(),
		);

		Self {
			routes,
			suspicion_ttl_ms: 3_600_000, // 1 hour decay
			suspicion_threshold: 5,
			lockout_max: 1,
			high_risk_countries: HashSet::new(),
			high_risk_multiplier: 0.1,
			behavior_floor_ms: 100,
			behavior_min_samples: 5,
			behavior_allowlist: HashSet::new(),
			anomaly_window_ms: 1_000,
			anomaly_threshold: 10,
			history_cap: 100,
			max_tracked_keys: 50_000,
			signing_secret: None,
			signature_tolerance_ms: 300_000, // 5 minutes
			signature_future_skew_ms: 30_000,
			store_timeout_ms: 50,
			max_body_bytes: 1_048_576, // 1 MiB
		}
	}
}

impl GuardConfig {
	/// Validate route metadata and policy constants.
	///
	/// Called once when the controller is built; any error here is fatal
	/// and prevents the admission layer from starting.
	pub fn validate(&self) -> GwResult<()> {
		if self.routes.is_empty() {
			return Err(Error::Configuration("route table is empty".into()));
		}
		for (key, route) in &self.routes {
			if key != &route.name {
				return Err(Error::Configuration(format!(
					"route key '{}' does not match route name '{}'",
					key, route.name
				)));
			}
			if route.window_ms <= 0 {
				return Err(Error::Configuration(format!(
					"route '{}': window must be positive",
					route.name
				)));
			}
			if route.base_max == 0 {
				return Err(Error::Configuration(format!(
					"route '{}': base quota must be positive",
					route.name
				)));
			}
			if route.requires_signature && self.signing_secret.is_none() {
				return Err(Error::Configuration(format!(
					"route '{}' requires signatures but no signing secret is configured",
					route.name
				)));
			}
		}
		if !(self.high_risk_multiplier > 0.0 && self.high_risk_multiplier <= 1.0) {
			return Err(Error::Configuration("high risk multiplier must be in (0, 1]".into()));
		}
		if self.lockout_max == 0 {
			return Err(Error::Configuration("lockout quota must be at least 1".into()));
		}
		if self.history_cap == 0 || self.max_tracked_keys == 0 {
			return Err(Error::Configuration("history bounds must be positive".into()));
		}
		Ok(())
	}

	pub fn route(&self, name: &str) -> Option<&RouteConfig> {
		self.routes.get(name)
	}
}


// vim: ts=4
