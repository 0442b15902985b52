//! Adaptive Suspicion Scoring
//!
//! Tracks rate-limit violations per identity in the counter store and
//! collapses the effective quota to a near-total lockout once the count
//! passes the threshold. The counter's TTL re-arms on every violation,
//! so an identity that behaves afterwards decays back to its base quota.

use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use crate::prelude::*;

const KEY_PREFIX: &str = "susp";

/// Store calls from the scorer share the limiter's unreachable policy:
/// past this deadline the read resolves to "no suspicion data".
const STORE_TIMEOUT: Duration = Duration::from_millis(50);

pub struct SuspicionScorer {
	store: Arc<dyn CounterStore>,
	ttl_ms: i64,
	threshold: u32,
	lockout_max: u32,
	/// Local mirror of identities currently over the threshold, with
	/// their decay deadline. Backs the `suspicion_elevated` gauge so the
	/// stats snapshot needs no store round-trip. The store stays
	/// authoritative for quota decisions.
	elevated: RwLock<LruCache<String, Timestamp>>,
}

impl std::fmt::Debug for SuspicionScorer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SuspicionScorer")
			.field("threshold", &self.threshold)
			.field("ttl_ms", &self.ttl_ms)
			.finish_non_exhaustive()
	}
}

impl SuspicionScorer {
	pub fn new(
		store: Arc<dyn CounterStore>,
		ttl_ms: i64,
		threshold: u32,
		lockout_max: u32,
		max_tracked: usize,
	) -> Self {
		const DEFAULT_CAP: NonZeroUsize = match NonZeroUsize::new(50_000) {
			Some(v) => v,
			None => unreachable!(),
		};
		Self {
			store,
			ttl_ms,
			threshold,
			lockout_max,
			elevated: RwLock::new(LruCache::new(
				NonZeroUsize::new(max_tracked).unwrap_or(DEFAULT_CAP),
			)),
		}
	}

	fn key(identity: &str) -> String {
		format!("{}:{}", KEY_PREFIX, identity)
	}

	/// Effective quota for an identity given its violation history.
	///
	/// A store failure here resolves to the base quota: missing suspicion
	/// data must not block traffic on its own, the limiter's fail policy
	/// covers store outages.
	pub async fn effective_max(&self, identity: &str, base_max: u32) -> u32 {
		let violations =
			match tokio::time::timeout(STORE_TIMEOUT, self.store.get(&Self::key(identity))).await {
				Ok(Ok(Some(count))) => count.max(0) as u32,
				Ok(Ok(None)) => 0,
				Ok(Err(err)) => {
					debug!(identity, "suspicion read failed, using base quota: {}", err);
					0
				}
				Err(_) => {
					debug!(identity, "suspicion read timed out, using base quota");
					0
				}
			};

		if violations > self.threshold {
			self.lockout_max
		} else {
			if violations == 0 {
				self.elevated.write().pop(identity);
			}
			base_max
		}
	}

	/// Record one rate-limit violation, re-arming the decay TTL.
	pub async fn record_violation(&self, identity: &str) {
		let incremented =
			tokio::time::timeout(STORE_TIMEOUT, self.store.increment(&Self::key(identity), self.ttl_ms))
				.await;
		match incremented {
			Ok(Ok(count)) => {
				debug!(identity, count, "violation recorded");
				if count > u64::from(self.threshold) {
					let deadline = Timestamp(Timestamp::now().0 + self.ttl_ms);
					self.elevated.write().put(identity.to_string(), deadline);
				}
			}
			Ok(Err(err)) => {
				// Never let a store hiccup escalate a violation record
				// into a request failure
				warn!(identity, "failed to record violation: {}", err);
			}
			Err(_) => {
				warn!(identity, "violation record timed out");
			}
		}
	}

	/// Number of identities currently over the suspicion threshold.
	pub fn elevated_count(&self) -> usize {
		let now = Timestamp::now();
		let mut elevated = self.elevated.write();
		// Drop decayed entries while counting
		let expired: Vec<String> = elevated
			.iter()
			.filter(|(_, deadline)| **deadline <= now)
			.map(|(identity, _)| identity.clone())
			.collect();
		for identity in expired {
			elevated.pop(&identity);
		}
		elevated.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use gateward_counter_adapter_memory::MemoryCounterStore;

	fn scorer(store: Arc<MemoryCounterStore>) -> SuspicionScorer {
		SuspicionScorer::new(store, 3_600_000, 5, 1, 1000)
	}

	#[tokio::test]
	async fn test_clean_identity_keeps_base_quota() {
		let store = Arc::new(MemoryCounterStore::new());
		let scorer = scorer(store);
		assert_eq!(scorer.effective_max("ip:1.2.3.4", 100).await, 100);
	}

	#[tokio::test]
	async fn test_lockout_after_threshold() {
		let store = Arc::new(MemoryCounterStore::new());
		let scorer = scorer(store);
		for _ in 0..6 {
			scorer.record_violation("ip:1.2.3.4").await;
		}
		assert_eq!(scorer.effective_max("ip:1.2.3.4", 100).await, 1);
		// Unrelated identity unaffected
		assert_eq!(scorer.effective_max("ip:9.9.9.9", 100).await, 100);
	}

	#[tokio::test]
	async fn test_at_threshold_still_base() {
		let store = Arc::new(MemoryCounterStore::new());
		let scorer = scorer(store);
		for _ in 0..5 {
			scorer.record_violation("ip:1.2.3.4").await;
		}
		// Boundary: lockout requires strictly more than the threshold
		assert_eq!(scorer.effective_max("ip:1.2.3.4", 100).await, 100);
	}

	#[tokio::test]
	async fn test_suspicion_decays_with_ttl() {
		let store = Arc::new(MemoryCounterStore::new());
		// 30ms TTL so the test can outwait the decay window
		let scorer = SuspicionScorer::new(store, 30, 5, 1, 1000);
		for _ in 0..6 {
			scorer.record_violation("ip:1.2.3.4").await;
		}
		assert_eq!(scorer.effective_max("ip:1.2.3.4", 100).await, 1);
		tokio::time::sleep(std::time::Duration::from_millis(60)).await;
		assert_eq!(scorer.effective_max("ip:1.2.3.4", 100).await, 100);
	}

	#[tokio::test]
	async fn test_elevated_gauge_tracks_lockouts() {
		let store = Arc::new(MemoryCounterStore::new());
		let scorer = scorer(store);
		assert_eq!(scorer.elevated_count(), 0);
		for _ in 0..6 {
			scorer.record_violation("ip:1.2.3.4").await;
		}
		assert_eq!(scorer.elevated_count(), 1);
	}
}

// vim: ts=4
