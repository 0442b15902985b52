//! Behavioral Pattern Analysis
//!
//! Keeps a bounded per-identity history of request timestamps and flags
//! callers whose mean inter-arrival interval is inhumanly small. Human
//! clients show irregular, larger gaps; scripts show near-constant small
//! ones. Legitimate high-frequency integrations must be allow-listed by
//! identity — the controller checks the allow-list before calling in.

use lru::LruCache;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::num::NonZeroUsize;

use crate::prelude::*;

pub struct BehaviorAnalyzer {
	/// Per-identity timestamp history, FIFO-capped. The write lock
	/// serializes appends per map; per-key FIFO stays correct.
	history: RwLock<LruCache<String, VecDeque<i64>>>,
	cap: usize,
	floor_ms: i64,
	min_samples: usize,
}

impl std::fmt::Debug for BehaviorAnalyzer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BehaviorAnalyzer")
			.field("cap", &self.cap)
			.field("floor_ms", &self.floor_ms)
			.finish_non_exhaustive()
	}
}

impl BehaviorAnalyzer {
	pub fn new(max_tracked: usize, cap: usize, floor_ms: i64, min_samples: usize) -> Self {
		const DEFAULT_TRACKED: NonZeroUsize = match NonZeroUsize::new(50_000) {
			Some(v) => v,
			None => unreachable!(),
		};
		Self {
			history: RwLock::new(LruCache::new(
				NonZeroUsize::new(max_tracked).unwrap_or(DEFAULT_TRACKED),
			)),
			cap: cap.max(2),
			floor_ms,
			min_samples: min_samples.max(2),
		}
	}

	/// Append `now` to the identity's history and report whether the
	/// retained cadence looks automated.
	pub fn is_likely_automated(&self, identity: &str) -> bool {
		self.observe_at(identity, Timestamp::now().0)
	}

	/// Same as [`is_likely_automated`](Self::is_likely_automated) with an
	/// explicit clock, so tests can drive exact cadences.
	pub fn observe_at(&self, identity: &str, now_ms: i64) -> bool {
		let mut history = self.history.write();
		let entries = history.get_or_insert_mut(identity.to_string(), VecDeque::new);
		entries.push_back(now_ms);
		while entries.len() > self.cap {
			entries.pop_front();
		}

		if entries.len() < self.min_samples {
			return false;
		}

		// Mean inter-arrival over the retained window
		let span = entries.back().copied().unwrap_or(now_ms)
			- entries.front().copied().unwrap_or(now_ms);
		let intervals = (entries.len() - 1) as i64;
		let mean = span / intervals;
		if mean < self.floor_ms {
			debug!(identity, mean_interval_ms = mean, "cadence below human floor");
			true
		} else {
			false
		}
	}

	/// Drop histories whose newest entry is older than `max_age_ms`.
	/// Intended for an optional periodic sweep; request handling never
	/// depends on it.
	pub fn evict_stale(&self, max_age_ms: i64) {
		let cutoff = Timestamp::now().0 - max_age_ms;
		let mut history = self.history.write();
		let stale: Vec<String> = history
			.iter()
			.filter(|(_, entries)| entries.back().is_none_or(|newest| *newest < cutoff))
			.map(|(key, _)| key.clone())
			.collect();
		for key in stale {
			history.pop(&key);
		}
	}
}


// vim: ts=4
