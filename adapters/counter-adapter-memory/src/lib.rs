//! In-process counter store adapter.
//!
//! Implements the atomic-increment contract against a locked map with
//! per-entry TTLs. Suits single-process deployments and tests; a fleet
//! coordinating through a shared cache service implements the same
//! `CounterStore` trait against that service instead.
//!
//! Expired entries are dropped lazily on access; `sweep` exists for
//! hosts that want to reclaim memory on an interval as well.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

use gateward_types::counter_store::CounterStore;
use gateward_types::error::GwResult;
use gateward_types::types::Timestamp;

#[derive(Debug, Clone, Copy)]
struct Entry {
	value: i64,
	expires_at: i64,
}

impl Entry {
	fn live(&self, now: i64) -> bool {
		self.expires_at > now
	}
}

/// Locked-map counter store with TTL expiry.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
	entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCounterStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Remove expired entries. Optional; reads already ignore them.
	pub fn sweep(&self) {
		let now = Timestamp::now().0;
		let mut entries = self.entries.lock();
		let before = entries.len();
		entries.retain(|_, entry| entry.live(now));
		let dropped = before - entries.len();
		if dropped > 0 {
			debug!(dropped, "swept expired counter entries");
		}
	}

	/// Number of live entries (test/diagnostic helper).
	pub fn len(&self) -> usize {
		let now = Timestamp::now().0;
		self.entries.lock().values().filter(|entry| entry.live(now)).count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
	async fn increment(&self, key: &str, ttl_ms: i64) -> GwResult<u64> {
		let now = Timestamp::now().0;
		let mut entries = self.entries.lock();
		let entry = entries
			.entry(key.to_string())
			.and_modify(|entry| {
				if entry.live(now) {
					entry.value += 1;
				} else {
					// Window rolled over: reset atomically with the bump
					entry.value = 1;
				}
				entry.expires_at = now + ttl_ms;
			})
			.or_insert(Entry { value: 1, expires_at: now + ttl_ms });
		Ok(entry.value.max(0) as u64)
	}

	async fn get(&self, key: &str) -> GwResult<Option<i64>> {
		let now = Timestamp::now().0;
		let mut entries = self.entries.lock();
		match entries.get(key) {
			Some(entry) if entry.live(now) => Ok(Some(entry.value)),
			Some(_) => {
				entries.remove(key);
				Ok(None)
			}
			None => Ok(None),
		}
	}

	async fn set_with_ttl(&self, key: &str, value: i64, ttl_ms: i64) -> GwResult<()> {
		let now = Timestamp::now().0;
		self.entries
			.lock()
			.insert(key.to_string(), Entry { value, expires_at: now + ttl_ms });
		Ok(())
	}
}


// vim: ts=4
