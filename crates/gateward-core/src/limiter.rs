//! Fixed-Window Rate Limiter
//!
//! Enforces N requests per window per identity through the shared
//! counter store. Fixed-window semantics, not a true sliding log:
//! bursts up to 2x the quota across a window boundary are an accepted,
//! documented trade-off. A sliding-log or token-bucket variant can be
//! swapped in behind the same `check` contract.

use std::sync::Arc;
use std::time::Duration;

use crate::config::RouteConfig;
use crate::geo::{self, RiskTier};
use crate::prelude::*;
use crate::suspicion::SuspicionScorer;

const KEY_PREFIX: &str = "rl";

/// Result of a single window check.
#[derive(Clone, Copy, Debug)]
pub struct WindowCheck {
	pub allowed: bool,
	/// Requests left in the current window (0 when denied).
	pub remaining: u32,
	/// When the current window rolls over.
	pub reset_at: Timestamp,
	/// True when the quota was genuinely exceeded, as opposed to a
	/// fail-closed denial with the store down. Only genuine denials
	/// count as suspicion violations.
	pub violation: bool,
	/// True when the store was unreachable and the route's fail mode
	/// decided the outcome.
	pub degraded: bool,
}

pub struct WindowLimiter {
	store: Arc<dyn CounterStore>,
	scorer: Arc<SuspicionScorer>,
	store_timeout: Duration,
}

impl std::fmt::Debug for WindowLimiter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WindowLimiter")
			.field("store_timeout", &self.store_timeout)
			.finish_non_exhaustive()
	}
}

impl WindowLimiter {
	pub fn new(
		store: Arc<dyn CounterStore>,
		scorer: Arc<SuspicionScorer>,
		store_timeout_ms: u64,
	) -> Self {
		Self { store, scorer, store_timeout: Duration::from_millis(store_timeout_ms) }
	}

	/// Check one request against the route's window quota.
	///
	/// The effective quota is the route's base max scaled by the
	/// geographic risk tier, then overridden by the suspicion scorer.
	/// The boundary is inclusive: exactly `max` requests per window are
	/// admitted, the `max + 1`th is denied.
	pub async fn check(&self, identity: &str, route: &RouteConfig, tier: RiskTier) -> WindowCheck {
		let scaled = geo::scaled_quota(route.base_max, tier);
		let effective_max = self.scorer.effective_max(identity, scaled).await;

		let now = Timestamp::now();
		let window_start = now.window_start(route.window_ms);
		let reset_at = Timestamp(window_start + route.window_ms);
		let key = format!("{}:{}:{}:{}", KEY_PREFIX, route.name, identity, window_start);

		let count =
			match tokio::time::timeout(self.store_timeout, self.store.increment(&key, route.window_ms))
				.await
			{
				Ok(Ok(count)) => count,
				Ok(Err(err)) => {
					warn!(identity, route = %route.name, "counter store error: {}", err);
					return self.unavailable(route, reset_at);
				}
				Err(_) => {
					warn!(identity, route = %route.name, "counter store timed out");
					return self.unavailable(route, reset_at);
				}
			};

		let allowed = count <= u64::from(effective_max);
		WindowCheck {
			allowed,
			remaining: u32::try_from(u64::from(effective_max).saturating_sub(count))
				.unwrap_or(u32::MAX),
			reset_at,
			violation: !allowed,
			degraded: false,
		}
	}

	/// Resolve a store outage via the route's fail mode. Asymmetric by
	/// policy: auth endpoints deny, everything else admits.
	fn unavailable(&self, route: &RouteConfig, reset_at: Timestamp) -> WindowCheck {
		let allowed = route.fail_mode == crate::config::FailMode::Open;
		WindowCheck { allowed, remaining: 0, reset_at, violation: false, degraded: true }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{FailMode, GuardConfig};
	use async_trait::async_trait;
	use gateward_counter_adapter_memory::MemoryCounterStore;

	fn limiter(store: Arc<dyn CounterStore>) -> WindowLimiter {
		let scorer = Arc::new(SuspicionScorer::new(store.clone(), 3_600_000, 5, 1, 1000));
		WindowLimiter::new(store, scorer, 50)
	}

	fn route(base_max: u32) -> RouteConfig {
		RouteConfig::general("general", 60_000, base_max)
	}

	#[tokio::test]
	async fn test_boundary_inclusive() {
		let store: Arc<dyn CounterStore> = Arc::new(MemoryCounterStore::new());
		let limiter = limiter(store);
		let route = route(3);

		for _ in 0..3 {
			let check = limiter.check("ip:1.2.3.4", &route, RiskTier::DEFAULT).await;
			assert!(check.allowed);
		}
		let check = limiter.check("ip:1.2.3.4", &route, RiskTier::DEFAULT).await;
		assert!(!check.allowed);
		assert!(check.violation);
		assert!(check.reset_at > Timestamp::now());
	}

	#[tokio::test]
	async fn test_remaining_counts_down() {
		let store: Arc<dyn CounterStore> = Arc::new(MemoryCounterStore::new());
		let limiter = limiter(store);
		let route = route(3);

		let check = limiter.check("ip:1.2.3.4", &route, RiskTier::DEFAULT).await;
		assert_eq!(check.remaining, 2);
		let check = limiter.check("ip:1.2.3.4", &route, RiskTier::DEFAULT).await;
		assert_eq!(check.remaining, 1);
	}

	#[tokio::test]
	async fn test_identities_are_independent() {
		let store: Arc<dyn CounterStore> = Arc::new(MemoryCounterStore::new());
		let limiter = limiter(store);
		let route = route(1);

		assert!(limiter.check("ip:1.1.1.1", &route, RiskTier::DEFAULT).await.allowed);
		assert!(!limiter.check("ip:1.1.1.1", &route, RiskTier::DEFAULT).await.allowed);
		assert!(limiter.check("ip:2.2.2.2", &route, RiskTier::DEFAULT).await.allowed);
	}

	#[tokio::test]
	async fn test_high_risk_tier_shrinks_quota() {
		let store: Arc<dyn CounterStore> = Arc::new(MemoryCounterStore::new());
		let limiter = limiter(store);
		let route = route(20);
		let config = GuardConfig::default();
		let tier = RiskTier { quota_multiplier: config.high_risk_multiplier };

		// 20 * 0.1 = 2 allowed
		assert!(limiter.check("ip:1.2.3.4", &route, tier).await.allowed);
		assert!(limiter.check("ip:1.2.3.4", &route, tier).await.allowed);
		assert!(!limiter.check("ip:1.2.3.4", &route, tier).await.allowed);
	}

	#[derive(Debug)]
	struct DownStore;

	#[async_trait]
	impl CounterStore for DownStore {
		async fn increment(&self, _key: &str, _ttl_ms: i64) -> GwResult<u64> {
			Err(Error::StoreUnavailable)
		}
		async fn get(&self, _key: &str) -> GwResult<Option<i64>> {
			Err(Error::StoreUnavailable)
		}
		async fn set_with_ttl(&self, _key: &str, _value: i64, _ttl_ms: i64) -> GwResult<()> {
			Err(Error::StoreUnavailable)
		}
	}

	#[tokio::test]
	async fn test_fail_open_for_general_routes() {
		let store: Arc<dyn CounterStore> = Arc::new(DownStore);
		let limiter = limiter(store);
		let check = limiter.check("ip:1.2.3.4", &route(3), RiskTier::DEFAULT).await;
		assert!(check.allowed);
		assert!(check.degraded);
		assert!(!check.violation);
	}

	#[tokio::test]
	async fn test_fail_closed_for_auth_routes() {
		let store: Arc<dyn CounterStore> = Arc::new(DownStore);
		let limiter = limiter(store);
		let auth = RouteConfig::auth("auth", 60_000, 10);
		assert_eq!(auth.fail_mode, FailMode::Closed);

		let check = limiter.check("ip:1.2.3.4", &auth, RiskTier::DEFAULT).await;
		assert!(!check.allowed);
		assert!(check.degraded);
		// Not a quota violation, so no suspicion penalty accrues
		assert!(!check.violation);
	}

	#[derive(Debug)]
	struct HungStore;

	#[async_trait]
	impl CounterStore for HungStore {
		async fn increment(&self, _key: &str, _ttl_ms: i64) -> GwResult<u64> {
			tokio::time::sleep(Duration::from_secs(5)).await;
			Ok(1)
		}
		async fn get(&self, _key: &str) -> GwResult<Option<i64>> {
			Ok(None)
		}
		async fn set_with_ttl(&self, _key: &str, _value: i64, _ttl_ms: i64) -> GwResult<()> {
			Ok(())
		}
	}

	#[tokio::test]
	async fn test_slow_store_counts_as_unreachable() {
		let store: Arc<dyn CounterStore> = Arc::new(HungStore);
		let limiter = limiter(store);
		let check = limiter.check("ip:1.2.3.4", &route(3), RiskTier::DEFAULT).await;
		assert!(check.degraded);
	}
}

// vim: ts=4
