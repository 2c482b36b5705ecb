//! Unverified access-token claims used for page-level permission checks.
//!
//! The gateway never validates signatures; the upstream API remains the authority. Claims are
//! only read to decide whether a server-rendered page should render or redirect.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::_prelude::*;

/// Errors raised while decoding an access token payload.
#[derive(Debug, ThisError)]
pub enum ClaimsError {
	/// Token does not have three dot-separated segments.
	#[error("Access token is not a JWT.")]
	Malformed,
	/// Payload segment is not base64url.
	#[error("Access token payload is not valid base64url.")]
	Base64(#[from] base64::DecodeError),
	/// Payload segment is not the expected JSON object.
	#[error("Access token payload is not valid JSON.")]
	Json(#[from] serde_json::Error),
}

/// Claims read from the access token payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
	/// Subject, usually the user's email or identifier.
	#[serde(default)]
	pub sub: Option<String>,
	/// Fine-grained permissions granted to the user.
	#[serde(default)]
	pub permissions: Vec<String>,
	/// Roles granted to the user.
	#[serde(default)]
	pub roles: Vec<String>,
	/// Expiry as seconds since the Unix epoch.
	#[serde(default)]
	pub exp: Option<i64>,
}
impl UserClaims {
	/// Decodes the payload segment of `token`.
	pub fn decode(token: &str) -> Result<Self, ClaimsError> {
		let mut segments = token.split('.');
		let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
			(Some(_), Some(payload), Some(_), None) => payload,
			_ => return Err(ClaimsError::Malformed),
		};
		let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;

		Ok(serde_json::from_slice(&bytes)?)
	}

	/// Returns the expiry instant, when the token declares one.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.exp.and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
	}
}

/// Permissions and roles a page requires.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequirements {
	/// Every listed permission must be granted.
	#[serde(default)]
	pub permissions: Vec<String>,
	/// At least one listed role must be granted, when any are listed.
	#[serde(default)]
	pub roles: Vec<String>,
}
impl AccessRequirements {
	/// Creates an empty requirement set that any signed-in user satisfies.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds required permissions.
	pub fn permissions<I, S>(mut self, permissions: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.permissions.extend(permissions.into_iter().map(Into::into));

		self
	}

	/// Adds accepted roles.
	pub fn roles<I, S>(mut self, roles: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.roles.extend(roles.into_iter().map(Into::into));

		self
	}
}

/// Checks `claims` against `requirements`.
pub fn validate_user_permissions(claims: &UserClaims, requirements: &AccessRequirements) -> bool {
	let has_permissions =
		requirements.permissions.iter().all(|required| claims.permissions.contains(required));
	let has_role = requirements.roles.is_empty()
		|| requirements.roles.iter().any(|accepted| claims.roles.contains(accepted));

	has_permissions && has_role
}
