//! Adapter traits for the shared counter store and tenant resolution.
//!
//! The counter store is the only shared mutable resource in the
//! admission layer. All components reach it through atomic, single-key
//! operations — no multi-key transactions, no lock held across a call.
//! An in-memory adapter serves single-process deployments; multi-process
//! fleets implement the same contract against a shared cache service.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::GwResult;
use crate::types::TenantId;

/// Atomic shared counter store with TTL-based expiry.
#[async_trait]
pub trait CounterStore: Debug + Send + Sync {
	/// Atomically increment the counter at `key` and return the
	/// post-increment count. Every increment (re)arms the entry's TTL.
	/// Two concurrent increments of the same key must never observe the
	/// same post-increment value.
	async fn increment(&self, key: &str, ttl_ms: i64) -> GwResult<u64>;

	/// Read a value previously written by `increment` or `set_with_ttl`.
	/// Expired entries read as absent.
	async fn get(&self, key: &str) -> GwResult<Option<i64>>;

	/// Write `value` at `key`, (re)setting its TTL.
	async fn set_with_ttl(&self, key: &str, value: i64, ttl_ms: i64) -> GwResult<()>;
}

/// Resolves the owning tenant of a resource. Implemented by the host's
/// persistence layer; the admission core only ever queries it.
#[async_trait]
pub trait TenantResolver: Debug + Send + Sync {
	/// Returns the owning tenant, or `None` when the resource is unknown.
	async fn resolve_tenant_of(
		&self,
		resource_id: &str,
		resource_type: &str,
	) -> GwResult<Option<TenantId>>;
}

// vim: ts=4
