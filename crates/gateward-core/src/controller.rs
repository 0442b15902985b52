//! Admission Controller
//!
//! The single public entry point of the admission layer. Each request
//! walks the stages signature → rate → behavior → tenant → sanitize;
//! any stage can short-circuit to a deny, and exactly one
//! [`AdmissionDecision`] comes out. Per-request faults never escape —
//! a crash in the gate must not crash the protected service.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::anomaly::AnomalyDetector;
use crate::behavior::BehaviorAnalyzer;
use crate::config::GuardConfig;
use crate::fingerprint::{fingerprint, FingerprintInput};
use crate::geo;
use crate::limiter::WindowLimiter;
use crate::prelude::*;
use crate::sanitize::sanitize_body;
use crate::signature;
use crate::suspicion::SuspicionScorer;
use crate::tenant::TenantGuard;

/// The three possible outcomes of admission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
	Allow,
	/// Retryable: the caller should wait `retry_after_ms` and try again.
	Throttle,
	Deny,
}

/// The sole output type of the admission layer. Exactly one per request,
/// produced only by the controller.
#[derive(Clone, Debug, Serialize)]
pub struct AdmissionDecision {
	pub outcome: Outcome,
	/// Machine-readable reason code for Throttle/Deny.
	pub reason: Option<String>,
	pub retry_after_ms: Option<u64>,
	/// Cleaned body for admitted requests that carried one. The host
	/// substitutes this for the raw payload before handling.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub sanitized_body: Option<String>,
}

impl AdmissionDecision {
	fn allow(sanitized_body: Option<String>) -> Self {
		Self { outcome: Outcome::Allow, reason: None, retry_after_ms: None, sanitized_body }
	}

	fn throttle(reason: &str, retry_after_ms: u64) -> Self {
		Self {
			outcome: Outcome::Throttle,
			reason: Some(reason.to_string()),
			retry_after_ms: Some(retry_after_ms),
			sanitized_body: None,
		}
	}

	fn deny(reason: &str) -> Self {
		Self {
			outcome: Outcome::Deny,
			reason: Some(reason.to_string()),
			retry_after_ms: None,
			sanitized_body: None,
		}
	}
}

/// Everything the admission layer needs to know about a request,
/// assembled by the host framework (or by [`crate::middleware`]).
#[derive(Clone, Debug, Default)]
pub struct AdmissionRequest {
	/// Scoping key for quotas and suspicion (`ip:…`, `user:…`, composite).
	pub identity: String,
	/// Route name; must exist in the [`GuardConfig`] route table.
	pub route: String,
	/// Authenticated tenant context, when present.
	pub tenant: Option<TenantId>,
	/// Resource addressed by a tenant-scoped route.
	pub resource_id: Option<String>,
	pub resource_type: Option<String>,
	/// Origin-country signal (e.g. from a geo-IP edge header).
	pub country_code: Option<String>,
	pub user_agent: Option<String>,
	pub accept_language: Option<String>,
	pub accept_encoding: Option<String>,
	pub client_addr: Option<String>,
	pub signature: Option<String>,
	pub signature_timestamp: Option<String>,
	pub body: Option<Vec<u8>>,
}

/// Named counters for the external metrics collaborator.
#[derive(Default, Debug)]
pub struct GuardStats {
	pub evaluated: AtomicU64,
	pub allowed: AtomicU64,
	pub throttled: AtomicU64,
	pub denied_signature: AtomicU64,
	pub denied_rate: AtomicU64,
	pub denied_behavior: AtomicU64,
	pub denied_tenant: AtomicU64,
	pub denied_input: AtomicU64,
	/// Requests decided under a store outage (either fail mode).
	pub degraded: AtomicU64,
}

/// Point-in-time view of [`GuardStats`].
#[derive(Clone, Copy, Debug, Serialize)]
pub struct StatsSnapshot {
	pub evaluated: u64,
	pub allowed: u64,
	pub throttled: u64,
	pub denied_signature: u64,
	pub denied_rate: u64,
	pub denied_behavior: u64,
	pub denied_tenant: u64,
	pub denied_input: u64,
	pub degraded: u64,
	pub suspicion_elevated: u64,
}

pub struct AdmissionController {
	config: GuardConfig,
	limiter: WindowLimiter,
	scorer: Arc<SuspicionScorer>,
	behavior: BehaviorAnalyzer,
	anomaly: AnomalyDetector,
	tenant_guard: Option<TenantGuard>,
	stats: GuardStats,
}

impl std::fmt::Debug for AdmissionController {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AdmissionController")
			.field("routes", &self.config.routes.len())
			.finish_non_exhaustive()
	}
}

impl AdmissionController {
	/// Build the controller. Validates the configuration; any
	/// `Error::Configuration` here is fatal and must abort startup.
	pub fn new(
		config: GuardConfig,
		store: Arc<dyn CounterStore>,
		resolver: Option<Arc<dyn TenantResolver>>,
	) -> GwResult<Self> {
		config.validate()?;
		if resolver.is_none() && config.routes.values().any(|r| r.tenant_scoped) {
			return Err(Error::Configuration(
				"tenant-scoped routes configured without a tenant resolver".into(),
			));
		}

		let scorer = Arc::new(SuspicionScorer::new(
			store.clone(),
			config.suspicion_ttl_ms,
			config.suspicion_threshold,
			config.lockout_max,
			config.max_tracked_keys,
		));
		let limiter = WindowLimiter::new(store, scorer.clone(), config.store_timeout_ms);
		let behavior = BehaviorAnalyzer::new(
			config.max_tracked_keys,
			config.history_cap,
			config.behavior_floor_ms,
			config.behavior_min_samples,
		);
		let anomaly = AnomalyDetector::new(
			config.max_tracked_keys,
			config.history_cap,
			config.anomaly_window_ms,
			config.anomaly_threshold,
		);
		let tenant_guard = resolver.map(TenantGuard::new);

		Ok(Self {
			config,
			limiter,
			scorer,
			behavior,
			anomaly,
			tenant_guard,
			stats: GuardStats::default(),
		})
	}

	/// Evaluate one request. Always returns exactly one decision; no
	/// stage retries, no fault propagation.
	pub async fn admit(&self, req: &AdmissionRequest) -> AdmissionDecision {
		self.stats.evaluated.fetch_add(1, Ordering::Relaxed);

		let Some(route) = self.config.route(&req.route) else {
			// Route table is validated at startup; an unknown name here
			// is a wiring bug on the host side. Deny conservatively.
			warn!(route = %req.route, "admission request for unknown route");
			return self.denied(&self.stats.denied_rate, "E-UNKNOWN-ROUTE", &req.identity);
		};
		let route = route.clone();

		// Stage: Authenticated(sig)
		if route.requires_signature && !self.check_signature(req) {
			return self.denied(&self.stats.denied_signature, Error::InvalidSignature.code(), &req.identity);
		}

		// Stage: RateChecked
		let tier = geo::risk_tier(&self.config, req.country_code.as_deref());
		let check = self.limiter.check(&req.identity, &route, tier).await;
		if check.degraded {
			self.stats.degraded.fetch_add(1, Ordering::Relaxed);
		}
		if !check.allowed {
			if check.violation {
				self.scorer.record_violation(&req.identity).await;
				self.stats.throttled.fetch_add(1, Ordering::Relaxed);
				let retry_after_ms =
					u64::try_from((check.reset_at.0 - Timestamp::now().0).max(0)).unwrap_or(0);
				info!(
					identity = %req.identity,
					route = %route.name,
					retry_after_ms,
					"request throttled"
				);
				return AdmissionDecision::throttle(Error::RateExceeded.code(), retry_after_ms);
			}
			// Fail-closed denial with the store down
			return self.denied(&self.stats.denied_rate, Error::StoreUnavailable.code(), &req.identity);
		}

		// Stage: BehaviorChecked
		if !self.config.behavior_allowlist.contains(&req.identity)
			&& self.behavior.is_likely_automated(&req.identity)
		{
			return self.denied(&self.stats.denied_behavior, Error::BehaviorFlagged.code(), &req.identity);
		}
		let fp = fingerprint(&FingerprintInput {
			user_agent: req.user_agent.as_deref(),
			accept_language: req.accept_language.as_deref(),
			accept_encoding: req.accept_encoding.as_deref(),
			client_addr: req.client_addr.as_deref(),
		});
		if self.anomaly.is_bursting(&fp) {
			return self.denied(&self.stats.denied_behavior, Error::BehaviorFlagged.code(), &req.identity);
		}

		// Stage: TenantChecked (tenant-scoped routes only)
		if route.tenant_scoped && !self.check_tenant(req).await {
			return self.denied(&self.stats.denied_tenant, Error::TenantMismatch.code(), &req.identity);
		}

		// Stage: Sanitized (requests carrying a body only)
		let sanitized_body = match &req.body {
			Some(body) => match sanitize_body(body, self.config.max_body_bytes) {
				Ok(clean) => Some(clean),
				Err(_) => {
					return self.denied(
						&self.stats.denied_input,
						Error::MalformedInput.code(),
						&req.identity,
					);
				}
			},
			None => None,
		};

		self.stats.allowed.fetch_add(1, Ordering::Relaxed);
		AdmissionDecision::allow(sanitized_body)
	}

	/// Signature check plus the replay window the validator itself does
	/// not enforce.
	fn check_signature(&self, req: &AdmissionRequest) -> bool {
		let Some(secret) = self.config.signing_secret.as_deref() else {
			// validate() guarantees a secret for signed routes
			return false;
		};
		let Some(ts_header) = req.signature_timestamp.as_deref() else {
			return false;
		};
		let Ok(ts) = ts_header.parse::<i64>() else {
			return false;
		};

		// Saturating arithmetic: the header is attacker-controlled and may
		// parse to i64 extremes
		let now = Timestamp::now().0;
		if now.saturating_sub(ts) > self.config.signature_tolerance_ms
			|| ts.saturating_sub(now) > self.config.signature_future_skew_ms
		{
			debug!(identity = %req.identity, "signed timestamp outside replay window");
			return false;
		}

		signature::verify(
			secret,
			req.signature.as_deref(),
			Some(ts_header),
			req.body.as_deref().unwrap_or_default(),
		)
	}

	async fn check_tenant(&self, req: &AdmissionRequest) -> bool {
		let Some(guard) = &self.tenant_guard else {
			return false;
		};
		let (Some(tenant), Some(resource_id)) = (req.tenant, req.resource_id.as_deref()) else {
			debug!(identity = %req.identity, "tenant-scoped route without tenant context");
			return false;
		};
		let resource_type = req.resource_type.as_deref().unwrap_or("resource");
		guard.authorize(tenant, resource_id, resource_type).await
	}

	fn denied(&self, counter: &AtomicU64, reason: &str, identity: &str) -> AdmissionDecision {
		counter.fetch_add(1, Ordering::Relaxed);
		info!(identity, reason, "request denied");
		AdmissionDecision::deny(reason)
	}

	/// Stats snapshot for the external metrics collaborator.
	pub fn stats(&self) -> StatsSnapshot {
		StatsSnapshot {
			evaluated: self.stats.evaluated.load(Ordering::Relaxed),
			allowed: self.stats.allowed.load(Ordering::Relaxed),
			throttled: self.stats.throttled.load(Ordering::Relaxed),
			denied_signature: self.stats.denied_signature.load(Ordering::Relaxed),
			denied_rate: self.stats.denied_rate.load(Ordering::Relaxed),
			denied_behavior: self.stats.denied_behavior.load(Ordering::Relaxed),
			denied_tenant: self.stats.denied_tenant.load(Ordering::Relaxed),
			denied_input: self.stats.denied_input.load(Ordering::Relaxed),
			degraded: self.stats.degraded.load(Ordering::Relaxed),
			suspicion_elevated: self.scorer.elevated_count() as u64,
		}
	}

	/// Drop stale behavioral/anomaly histories. Intended for an optional
	/// periodic sweep task on the host runtime.
	pub fn evict_stale_histories(&self, max_age_ms: i64) {
		self.behavior.evict_stale(max_age_ms);
		self.anomaly.evict_stale(max_age_ms);
	}
}


// vim: ts=4
