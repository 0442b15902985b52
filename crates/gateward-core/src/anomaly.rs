//! Fingerprint Burst Detection
//!
//! Bounded per-fingerprint timestamp windows flagging short bursts.
//! Operates on the device/browser fingerprint rather than the caller
//! identity, so it catches low-identity-diversity floods (many callers
//! behind one NAT or one scripted client rotating credentials) that
//! per-identity quotas miss.

use lru::LruCache;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::num::NonZeroUsize;

use crate::prelude::*;

pub struct AnomalyDetector {
	windows: RwLock<LruCache<String, VecDeque<i64>>>,
	cap: usize,
	window_ms: i64,
	threshold: usize,
}

impl std::fmt::Debug for AnomalyDetector {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AnomalyDetector")
			.field("window_ms", &self.window_ms)
			.field("threshold", &self.threshold)
			.finish_non_exhaustive()
	}
}

impl AnomalyDetector {
	pub fn new(max_tracked: usize, cap: usize, window_ms: i64, threshold: usize) -> Self {
		const DEFAULT_TRACKED: NonZeroUsize = match NonZeroUsize::new(50_000) {
			Some(v) => v,
			None => unreachable!(),
		};
		Self {
			windows: RwLock::new(LruCache::new(
				NonZeroUsize::new(max_tracked).unwrap_or(DEFAULT_TRACKED),
			)),
			cap: cap.max(1),
			window_ms,
			threshold,
		}
	}

	/// Append `now` to the fingerprint's window and report whether the
	/// trailing window holds a burst.
	pub fn is_bursting(&self, fp: &str) -> bool {
		self.observe_at(fp, Timestamp::now().0)
	}

	/// Explicit-clock variant for tests.
	pub fn observe_at(&self, fp: &str, now_ms: i64) -> bool {
		let mut windows = self.windows.write();
		let entries = windows.get_or_insert_mut(fp.to_string(), VecDeque::new);
		entries.push_back(now_ms);
		while entries.len() > self.cap {
			entries.pop_front();
		}

		let cutoff = now_ms - self.window_ms;
		let recent = entries.iter().rev().take_while(|ts| **ts > cutoff).count();
		if recent > self.threshold {
			debug!(fingerprint = fp, recent, "burst detected");
			true
		} else {
			false
		}
	}

	/// Drop windows whose newest entry is older than `max_age_ms`.
	pub fn evict_stale(&self, max_age_ms: i64) {
		let cutoff = Timestamp::now().0 - max_age_ms;
		let mut windows = self.windows.write();
		let stale: Vec<String> = windows
			.iter()
			.filter(|(_, entries)| entries.back().is_none_or(|newest| *newest < cutoff))
			.map(|(key, _)| key.clone())
			.collect();
		for key in stale {
			windows.pop(&key);
		}
	}
}


// vim: ts=4
