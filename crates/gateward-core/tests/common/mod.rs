//! Shared fixtures for the admission scenario tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use gateward_core::config::{GuardConfig, RouteConfig};
use gateward_core::controller::{AdmissionController, AdmissionRequest};
use gateward_counter_adapter_memory::MemoryCounterStore;
use gateward_types::counter_store::TenantResolver;
use gateward_types::error::GwResult;
use gateward_types::types::TenantId;

/// Tenant resolver backed by a fixed map, standing in for the host's
/// persistence layer.
#[derive(Debug, Default)]
pub struct MapResolver {
	owners: HashMap<String, TenantId>,
}

impl MapResolver {
	pub fn with(mut self, resource_id: &str, owner: TenantId) -> Self {
		self.owners.insert(resource_id.to_string(), owner);
		self
	}
}

#[async_trait]
impl TenantResolver for MapResolver {
	async fn resolve_tenant_of(
		&self,
		resource_id: &str,
		_resource_type: &str,
	) -> GwResult<Option<TenantId>> {
		Ok(self.owners.get(resource_id).copied())
	}
}

/// Scenario config: one generous route, one strict route, one
/// tenant-scoped route; behavioral analysis allow-listed for the
/// scenario identities so quota behavior can be observed in isolation.
pub fn scenario_config() -> GuardConfig {
	let mut config = GuardConfig::default();
	config.routes.clear();
	config.routes.insert("general".to_string(), RouteConfig::general("general", 60_000, 100));
	config.routes.insert("strict".to_string(), RouteConfig::general("strict", 60_000, 1));
	config.routes.insert(
		"files".to_string(),
		RouteConfig::general("files", 60_000, 100).tenant_scoped(),
	);
	config.behavior_allowlist.insert("ip:1.2.3.4".to_string());
	config
}

pub fn controller_with(config: GuardConfig, resolver: Option<Arc<MapResolver>>) -> AdmissionController {
	let store = Arc::new(MemoryCounterStore::new());
	let resolver = resolver
		.unwrap_or_else(|| Arc::new(MapResolver::default()));
	let resolver = Some(resolver as Arc<dyn TenantResolver>);
	AdmissionController::new(config, store, resolver).expect("scenario config must validate")
}

/// Request from the scenario identity, with a per-call fingerprint salt
/// so identity-level checks can be exercised without tripping the
/// fingerprint burst detector.
pub fn request(identity: &str, route: &str, salt: usize) -> AdmissionRequest {
	AdmissionRequest {
		identity: identity.to_string(),
		route: route.to_string(),
		user_agent: Some("scenario-client/1.0".to_string()),
		accept_language: Some(format!("x-salt-{salt}")),
		client_addr: Some("1.2.3.4".to_string()),
		..Default::default()
	}
}
