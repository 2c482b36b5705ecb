// self
use crate::{
	_prelude::*,
	config::{CookiePolicy, GatewayConfig},
};

/// Errors raised while constructing or validating gateway configuration.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum GatewayConfigError {
	/// Base endpoint is unusable.
	#[error("Base URL is invalid: {reason}.")]
	InvalidBaseUrl {
		/// Why the URL was rejected.
		reason: String,
	},
	/// Paths and routes must be absolute.
	#[error("The {field} value must start with '/': {value}.")]
	RelativePath {
		/// Which field failed validation.
		field: &'static str,
		/// Value that failed validation.
		value: String,
	},
	/// Cookie names must be non-empty and distinct.
	#[error("Cookie names must be non-empty and distinct.")]
	InvalidCookieNames,
	/// Cookie max age must be positive.
	#[error("Cookie max age must be positive.")]
	NonPositiveMaxAge,
}

/// Builder for [`GatewayConfig`] values.
#[derive(Debug)]
pub struct GatewayConfigBuilder {
	/// Base endpoint for the configuration being constructed.
	pub base_url: Url,
	/// Path of the refresh endpoint.
	pub refresh_path: String,
	/// Path of the sign-in endpoint.
	pub sessions_path: String,
	/// Login page route.
	pub login_route: String,
	/// Dashboard page route.
	pub dashboard_route: String,
	/// Credential cookie policy.
	pub cookie_policy: CookiePolicy,
	/// Optional transport timeout.
	pub request_timeout: Option<std::time::Duration>,
}
impl GatewayConfigBuilder {
	/// Creates a new builder seeded with defaults for everything except the base endpoint.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			refresh_path: "/refresh".into(),
			sessions_path: "/sessions".into(),
			login_route: "/".into(),
			dashboard_route: "/dashboard".into(),
			cookie_policy: CookiePolicy::default(),
			request_timeout: None,
		}
	}

	/// Sets the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Sets the sign-in endpoint path.
	pub fn sessions_path(mut self, path: impl Into<String>) -> Self {
		self.sessions_path = path.into();

		self
	}

	/// Sets the login page route.
	pub fn login_route(mut self, route: impl Into<String>) -> Self {
		self.login_route = route.into();

		self
	}

	/// Sets the dashboard page route.
	pub fn dashboard_route(mut self, route: impl Into<String>) -> Self {
		self.dashboard_route = route.into();

		self
	}

	/// Overrides the cookie policy.
	pub fn cookie_policy(mut self, policy: CookiePolicy) -> Self {
		self.cookie_policy = policy;

		self
	}

	/// Sets the transport timeout.
	pub fn request_timeout(mut self, timeout: std::time::Duration) -> Self {
		self.request_timeout = Some(timeout);

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<GatewayConfig, GatewayConfigError> {
		let config = GatewayConfig {
			base_url: self.base_url,
			refresh_path: self.refresh_path,
			sessions_path: self.sessions_path,
			login_route: self.login_route,
			dashboard_route: self.dashboard_route,
			cookie_policy: self.cookie_policy,
			request_timeout: self.request_timeout,
		};

		config.validate()?;

		Ok(config)
	}
}

impl GatewayConfig {
	fn validate(&self) -> Result<(), GatewayConfigError> {
		validate_base_url(&self.base_url)?;
		validate_path("refresh_path", &self.refresh_path)?;
		validate_path("sessions_path", &self.sessions_path)?;
		validate_path("login_route", &self.login_route)?;
		validate_path("dashboard_route", &self.dashboard_route)?;
		validate_path("cookie path", &self.cookie_policy.path)?;

		let policy = &self.cookie_policy;

		if policy.token_name.is_empty()
			|| policy.refresh_token_name.is_empty()
			|| policy.token_name == policy.refresh_token_name
		{
			return Err(GatewayConfigError::InvalidCookieNames);
		}
		if !policy.max_age.is_positive() {
			return Err(GatewayConfigError::NonPositiveMaxAge);
		}

		Ok(())
	}
}

fn validate_base_url(url: &Url) -> Result<(), GatewayConfigError> {
	if !matches!(url.scheme(), "http" | "https") {
		return Err(GatewayConfigError::InvalidBaseUrl {
			reason: format!("unsupported scheme `{}`", url.scheme()),
		});
	}
	if url.query().is_some() || url.fragment().is_some() {
		return Err(GatewayConfigError::InvalidBaseUrl {
			reason: "query strings and fragments are not allowed".into(),
		});
	}

	Ok(())
}

fn validate_path(field: &'static str, value: &str) -> Result<(), GatewayConfigError> {
	if value.starts_with('/') {
		Ok(())
	} else {
		Err(GatewayConfigError::RelativePath { field, value: value.into() })
	}
}
