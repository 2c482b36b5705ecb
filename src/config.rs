//! Gateway configuration: base endpoint, API paths, page routes, and cookie policy.
//!
//! Values are validated once by [`GatewayConfigBuilder::build`] so the request path never has to
//! re-check them.

/// Builder API for assembling gateway configuration.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, auth::CredentialPair};

/// Names and lifetime applied to the credential cookies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookiePolicy {
	/// Cookie holding the access token.
	pub token_name: String,
	/// Cookie holding the refresh token.
	pub refresh_token_name: String,
	/// Max age written on every credential cookie.
	pub max_age: Duration,
	/// Path written on every credential cookie.
	pub path: String,
}
impl CookiePolicy {
	/// Default access-token cookie name.
	pub const TOKEN_COOKIE: &'static str = "nextauth.token";
	/// Default refresh-token cookie name.
	pub const REFRESH_TOKEN_COOKIE: &'static str = "nextauth.refreshToken";
}
impl Default for CookiePolicy {
	fn default() -> Self {
		Self {
			token_name: Self::TOKEN_COOKIE.into(),
			refresh_token_name: Self::REFRESH_TOKEN_COOKIE.into(),
			max_age: CredentialPair::DEFAULT_TTL,
			path: "/".into(),
		}
	}
}

/// Immutable, validated gateway configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
	/// Base endpoint every request path is appended to.
	pub base_url: Url,
	/// Path of the refresh endpoint.
	pub refresh_path: String,
	/// Path of the sign-in endpoint.
	pub sessions_path: String,
	/// Page route unauthenticated visitors are sent to.
	pub login_route: String,
	/// Page route authenticated visitors land on.
	pub dashboard_route: String,
	/// Credential cookie policy.
	pub cookie_policy: CookiePolicy,
	/// Per-request timeout applied by the transport, refresh calls included.
	pub request_timeout: Option<std::time::Duration>,
}
impl GatewayConfig {
	/// Default local API endpoint.
	pub const LOCAL_BASE_URL: &'static str = "http://localhost:3333";

	/// Creates a new builder for the provided base endpoint.
	pub fn builder(base_url: Url) -> GatewayConfigBuilder {
		GatewayConfigBuilder::new(base_url)
	}

	/// Configuration pointing at [`Self::LOCAL_BASE_URL`] with every default.
	pub fn local() -> Result<Self, GatewayConfigError> {
		let base_url = Url::parse(Self::LOCAL_BASE_URL)
			.map_err(|e| GatewayConfigError::InvalidBaseUrl { reason: e.to_string() })?;

		Self::builder(base_url).build()
	}

	/// Appends `path` (and its query, if any) to the base endpoint.
	pub fn endpoint(&self, path: &str) -> Result<Url, crate::error::ConfigError> {
		let joined = format!(
			"{}/{}",
			self.base_url.as_str().trim_end_matches('/'),
			path.trim_start_matches('/')
		);

		Url::parse(&joined)
			.map_err(|source| crate::error::ConfigError::InvalidUrl { url: joined, source })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn endpoint_appends_to_base_path() {
		let config = GatewayConfig::builder(
			Url::parse("https://api.example.com/v1/").expect("Base URL fixture should parse."),
		)
		.build()
		.expect("Config fixture should validate.");

		assert_eq!(
			config.endpoint("/me").expect("Endpoint should join.").as_str(),
			"https://api.example.com/v1/me"
		);
		assert_eq!(
			config.endpoint("users?page=2").expect("Endpoint should join.").as_str(),
			"https://api.example.com/v1/users?page=2"
		);
	}

	#[test]
	fn local_config_uses_documented_defaults() {
		let config = GatewayConfig::local().expect("Local config should validate.");

		assert_eq!(config.base_url.as_str(), "http://localhost:3333/");
		assert_eq!(config.refresh_path, "/refresh");
		assert_eq!(config.login_route, "/");
		assert_eq!(config.dashboard_route, "/dashboard");
		assert_eq!(config.cookie_policy.max_age, Duration::days(30));
		assert_eq!(config.cookie_policy.path, "/");
	}
}
