//! Classification of `401 Unauthorized` payloads.

// self
use crate::_prelude::*;

/// Reason code the upstream API uses for an expired access token.
pub const TOKEN_EXPIRED_CODE: &str = "token.expired";

/// Why the upstream rejected a credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnauthorizedReason {
	/// Access token expired; recoverable through a refresh.
	TokenExpired,
	/// Any other rejection; not recoverable.
	Other {
		/// Reason code from the payload, when one was present.
		code: Option<String>,
	},
}
impl UnauthorizedReason {
	/// Classifies a `401` body shaped like `{ "code": string }`.
	///
	/// Bodies that are not JSON, or carry no code, count as [`UnauthorizedReason::Other`].
	pub fn classify(body: &[u8]) -> Self {
		match error_code(body) {
			Some(code) if code == TOKEN_EXPIRED_CODE => Self::TokenExpired,
			code => Self::Other { code },
		}
	}
}

#[derive(Deserialize)]
struct ErrorPayload {
	#[serde(default)]
	code: Option<String>,
}

/// Extracts the `code` field of an error payload.
pub fn error_code(body: &[u8]) -> Option<String> {
	serde_json::from_slice::<ErrorPayload>(body).ok().and_then(|payload| payload.code)
}
