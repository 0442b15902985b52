//! Tenant Isolation Guard
//!
//! Validates that the caller's tenant context owns the resource being
//! accessed. Ownership is resolved through the host's persistence layer
//! via the `TenantResolver` adapter; the guard never stores mappings.
//!
//! Resolver failures and unknown resources both deny. The upstream
//! design failed open here; cross-tenant protection is the one place
//! where a throttling-style fail-open is not acceptable.

use std::sync::Arc;
use std::time::Duration;

use crate::prelude::*;

const RESOLVE_TIMEOUT: Duration = Duration::from_millis(50);

pub struct TenantGuard {
	resolver: Arc<dyn TenantResolver>,
}

impl std::fmt::Debug for TenantGuard {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TenantGuard").finish_non_exhaustive()
	}
}

impl TenantGuard {
	pub fn new(resolver: Arc<dyn TenantResolver>) -> Self {
		Self { resolver }
	}

	/// Check that `caller_tenant` owns `resource_id`.
	///
	/// A mismatch is logged as a cross-tenant access attempt — a
	/// distinct, higher-severity audit event from an ordinary deny.
	pub async fn authorize(
		&self,
		caller_tenant: TenantId,
		resource_id: &str,
		resource_type: &str,
	) -> bool {
		let resolved = tokio::time::timeout(
			RESOLVE_TIMEOUT,
			self.resolver.resolve_tenant_of(resource_id, resource_type),
		)
		.await;

		match resolved {
			Ok(Ok(Some(owner))) if owner == caller_tenant => true,
			Ok(Ok(Some(owner))) => {
				warn!(
					%caller_tenant,
					%owner,
					resource_id,
					resource_type,
					"cross-tenant access attempt"
				);
				false
			}
			Ok(Ok(None)) => {
				debug!(%caller_tenant, resource_id, "tenant check: unknown resource, denying");
				false
			}
			Ok(Err(err)) => {
				warn!(%caller_tenant, resource_id, "tenant resolution failed, denying: {}", err);
				false
			}
			Err(_) => {
				warn!(%caller_tenant, resource_id, "tenant resolution timed out, denying");
				false
			}
		}
	}
}


// vim: ts=4
