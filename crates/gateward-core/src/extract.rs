//! Client Address Extraction
//!
//! Resolves the calling address for identity keys and fingerprints.
//! In standalone deployments the peer address is authoritative; behind a
//! reverse proxy the forwarding headers are consulted first, since the
//! peer is then just the proxy.

use axum::extract::ConnectInfo;
use hyper::Request;
use std::net::{IpAddr, SocketAddr};

/// How the host is deployed, which decides whom to trust for the
/// client address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerMode {
	/// Direct connections; forwarding headers are attacker-controlled.
	Standalone,
	/// Behind a trusted reverse proxy that sets forwarding headers.
	ReverseProxy,
}

/// Extract the client IP for a request under the given mode.
pub fn extract_client_ip<B>(req: &Request<B>, mode: ServerMode) -> Option<IpAddr> {
	let peer = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|ci| ci.0.ip());
	match mode {
		ServerMode::Standalone => peer,
		ServerMode::ReverseProxy => {
			forwarded_for(req).or_else(|| real_ip(req)).or_else(|| rfc7239(req)).or(peer)
		}
	}
}

/// First (leftmost) address in `X-Forwarded-For`, the original client in
/// a proxy chain.
fn forwarded_for<B>(req: &Request<B>) -> Option<IpAddr> {
	let header = req.headers().get("x-forwarded-for")?.to_str().ok()?;
	header.split(',').next()?.trim().parse().ok()
}

fn real_ip<B>(req: &Request<B>) -> Option<IpAddr> {
	req.headers()
		.get("x-real-ip")
		.and_then(|h| h.to_str().ok())
		.and_then(|s| s.trim().parse().ok())
}

/// `for=` element of an RFC 7239 `Forwarded` header. Quoted IPv6
/// (`for="[2001:db8::1]"`) carries brackets that have to come off before
/// parsing; ports after the address are not expected from the proxies we
/// sit behind.
fn rfc7239<B>(req: &Request<B>) -> Option<IpAddr> {
	let header = req.headers().get("forwarded")?.to_str().ok()?;
	let value = header
		.split([';', ','])
		.map(str::trim)
		.find_map(|part| part.get(..4).filter(|p| p.eq_ignore_ascii_case("for=")).and(part.get(4..)))?;
	let value = value.trim_matches('"').trim_start_matches('[').trim_end_matches(']');
	value.parse().ok()
}


// vim: ts=4
