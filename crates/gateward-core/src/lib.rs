//! Admission control and abuse detection for API surfaces.
//!
//! One public entry point — [`AdmissionController::admit`] — decides per
//! request whether to admit, throttle, or reject it, layering fixed-window
//! quotas, adaptive suspicion scoring, geographic risk tiers, behavioral
//! timing analysis, HMAC request signing, and tenant isolation. The
//! surrounding web framework consumes the decision; [`AdmissionLayer`]
//! provides the tower middleware adapter for axum hosts.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod anomaly;
pub mod behavior;
pub mod config;
pub mod controller;
pub mod extract;
pub mod fingerprint;
pub mod geo;
pub mod limiter;
pub mod middleware;
pub mod prelude;
pub mod sanitize;
pub mod signature;
pub mod suspicion;
pub mod tenant;

// Re-export commonly used types
pub use config::{FailMode, GuardConfig, RouteConfig};
pub use controller::{
	AdmissionController, AdmissionDecision, AdmissionRequest, GuardStats, Outcome,
};
pub use extract::{extract_client_ip, ServerMode};
pub use middleware::AdmissionLayer;

// vim: ts=4
