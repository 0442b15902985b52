//! Geographic Risk Classification
//!
//! Maps a request's origin-country signal to a quota multiplier. Pure
//! lookup against the configured high-risk set; unknown or absent codes
//! get the default tier.

use crate::config::GuardConfig;

/// Risk tier for an origin country.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RiskTier {
	/// Applied to a route's base quota before the suspicion override.
	pub quota_multiplier: f64,
}

impl RiskTier {
	pub const DEFAULT: RiskTier = RiskTier { quota_multiplier: 1.0 };
}

/// Classify an origin country code (ISO 3166-1 alpha-2, any case).
pub fn risk_tier(config: &GuardConfig, country_code: Option<&str>) -> RiskTier {
	match country_code {
		Some(code) if config.high_risk_countries.contains(&code.to_ascii_uppercase()) => {
			RiskTier { quota_multiplier: config.high_risk_multiplier }
		}
		_ => RiskTier::DEFAULT,
	}
}

/// Apply a tier to a base quota. Never reduces a positive quota to zero.
pub fn scaled_quota(base_max: u32, tier: RiskTier) -> u32 {
	let scaled = (f64::from(base_max) * tier.quota_multiplier).floor() as u32;
	scaled.max(1)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config() -> GuardConfig {
		let mut config = GuardConfig::default();
		config.high_risk_countries.insert("XX".to_string());
		config.high_risk_countries.insert("YY".to_string());
		config
	}

	#[test]
	fn test_high_risk_gets_reduced_multiplier() {
		let tier = risk_tier(&config(), Some("XX"));
		assert_eq!(tier.quota_multiplier, 0.1);
	}

	#[test]
	fn test_lookup_is_case_insensitive() {
		let tier = risk_tier(&config(), Some("yy"));
		assert_eq!(tier.quota_multiplier, 0.1);
	}

	#[test]
	fn test_unknown_and_absent_get_default() {
		assert_eq!(risk_tier(&config(), Some("DE")), RiskTier::DEFAULT);
		assert_eq!(risk_tier(&config(), None), RiskTier::DEFAULT);
	}

	#[test]
	fn test_scaled_quota_floors_but_never_zero() {
		let tier = RiskTier { quota_multiplier: 0.1 };
		assert_eq!(scaled_quota(100, tier), 10);
		assert_eq!(scaled_quota(5, tier), 1);
		assert_eq!(scaled_quota(100, RiskTier::DEFAULT), 100);
	}
}

// vim: ts=4
