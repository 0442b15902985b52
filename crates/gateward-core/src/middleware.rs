//! Admission Middleware
//!
//! Tower middleware layer applying the admission controller to axum
//! routes. One layer per route category; the layer assembles the
//! [`AdmissionRequest`] from the HTTP request, asks the controller, and
//! either forwards (with the sanitized body substituted) or answers with
//! the throttle/deny response itself.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::future::BoxFuture;
use http_body_util::BodyExt;
use hyper::Request;
use tower::{Layer, Service};

use crate::controller::{AdmissionController, AdmissionDecision, AdmissionRequest, Outcome};
use crate::extract::{extract_client_ip, ServerMode};
use crate::prelude::*;

/// Signature headers the middleware reads.
pub const SIGNATURE_HEADER: &str = "x-gw-signature";
pub const SIGNATURE_TS_HEADER: &str = "x-gw-timestamp";

/// Request extension naming the resource a tenant-scoped request
/// addresses. Inserted by the host's routing/auth layer.
#[derive(Clone, Debug)]
pub struct ResourceTarget {
	pub resource_id: String,
	pub resource_type: String,
}

/// Admission middleware layer for one route category.
#[derive(Clone)]
pub struct AdmissionLayer {
	controller: Arc<AdmissionController>,
	route: String,
	mode: ServerMode,
}

impl AdmissionLayer {
	pub fn new(controller: Arc<AdmissionController>, route: &str, mode: ServerMode) -> Self {
		Self { controller, route: route.to_string(), mode }
	}
}

impl<S> Layer<S> for AdmissionLayer {
	type Service = AdmissionService<S>;

	fn layer(&self, inner: S) -> Self::Service {
		AdmissionService {
			inner,
			controller: self.controller.clone(),
			route: self.route.clone(),
			mode: self.mode,
		}
	}
}

/// Admission middleware service.
#[derive(Clone)]
pub struct AdmissionService<S> {
	inner: S,
	controller: Arc<AdmissionController>,
	route: String,
	mode: ServerMode,
}

impl<S> Service<Request<Body>> for AdmissionService<S>
where
	S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
	S::Future: Send + 'static,
{
	type Response = S::Response;
	type Error = S::Error;
	type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

	fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		self.inner.poll_ready(cx)
	}

	fn call(&mut self, req: Request<Body>) -> Self::Future {
		let controller = self.controller.clone();
		let route = self.route.clone();
		let mode = self.mode;
		let mut inner = self.inner.clone();

		Box::pin(async move {
			let client_ip = extract_client_ip(&req, mode);
			let identity = match client_ip {
				Some(ip) => format!("ip:{}", ip),
				None => "ip:unknown".to_string(),
			};

			let (parts, body) = req.into_parts();
			let body_bytes = match body.collect().await {
				Ok(collected) => collected.to_bytes(),
				Err(err) => {
					debug!(%identity, "failed to read request body: {}", err);
					return Ok(bad_request());
				}
			};

			let header = |name: &str| {
				parts.headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
			};
			let target = parts.extensions.get::<ResourceTarget>().cloned();

			let admission = AdmissionRequest {
				identity,
				route,
				tenant: parts.extensions.get::<TenantId>().copied(),
				resource_id: target.as_ref().map(|t| t.resource_id.clone()),
				resource_type: target.map(|t| t.resource_type),
				country_code: header("x-country-code").or_else(|| header("cf-ipcountry")),
				user_agent: header("user-agent"),
				accept_language: header("accept-language"),
				accept_encoding: header("accept-encoding"),
				client_addr: client_ip.map(|ip| ip.to_string()),
				signature: header(SIGNATURE_HEADER),
				signature_timestamp: header(SIGNATURE_TS_HEADER),
				body: if body_bytes.is_empty() { None } else { Some(body_bytes.to_vec()) },
			};

			let decision = controller.admit(&admission).await;
			match decision.outcome {
				Outcome::Allow => {
					// Forward the cleaned body, not the raw one
					let body = match decision.sanitized_body {
						Some(clean) => Body::from(clean),
						None => Body::from(body_bytes),
					};
					inner.call(Request::from_parts(parts, body)).await
				}
				Outcome::Throttle | Outcome::Deny => Ok(decision_response(&decision)),
			}
		})
	}
}

fn bad_request() -> Response {
	let body = serde_json::json!({
		"error": {
			"code": "E-INPUT-MALFORMED",
			"message": "Request body could not be read."
		}
	});
	(StatusCode::BAD_REQUEST, Json(body)).into_response()
}

/// Map a throttle/deny decision onto an HTTP response.
pub fn decision_response(decision: &AdmissionDecision) -> Response {
	let code = decision.reason.as_deref().unwrap_or("E-DENIED");
	match decision.outcome {
		Outcome::Throttle => {
			let retry_secs = decision.retry_after_ms.unwrap_or(0).div_ceil(1000);
			let body = serde_json::json!({
				"error": {
					"code": code,
					"message": "Too many requests. Please slow down.",
					"details": { "retryAfter": retry_secs }
				}
			});
			let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
			if let Ok(val) = retry_secs.to_string().parse() {
				response.headers_mut().insert("Retry-After", val);
			}
			response
		}
		Outcome::Deny => {
			let body = serde_json::json!({
				"error": {
					"code": code,
					"message": "Request rejected."
				}
			});
			(StatusCode::FORBIDDEN, Json(body)).into_response()
		}
		Outcome::Allow => StatusCode::OK.into_response(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn throttle_decision() -> AdmissionDecision {
		AdmissionDecision {
			outcome: Outcome::Throttle,
			reason: Some("E-RATE-LIMITED".to_string()),
			retry_after_ms: Some(2_500),
			sanitized_body: None,
		}
	}

	#[test]
	fn test_throttle_maps_to_429_with_retry_after() {
		let response = decision_response(&throttle_decision());
		assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
		// 2500ms rounds up to 3s
		assert_eq!(response.headers().get("Retry-After").and_then(|v| v.to_str().ok()), Some("3"));
	}

	#[test]
	fn test_deny_maps_to_403() {
		let decision = AdmissionDecision {
			outcome: Outcome::Deny,
			reason: Some("E-TENANT-MISMATCH".to_string()),
			retry_after_ms: None,
			sanitized_body: None,
		};
		assert_eq!(decision_response(&decision).status(), StatusCode::FORBIDDEN);
	}
}

// vim: ts=4
