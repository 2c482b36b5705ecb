//! Gateway-level error types shared across requests, refresh episodes, guards, and stores.

// self
use crate::{_prelude::*, http::ApiResponse};

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Upstream answered with a non-success status that the gateway does not recover from.
	///
	/// The response is handed back untouched so callers can inspect status, headers, and body.
	#[error("Request failed with HTTP status {}.", .0.status)]
	Status(ApiResponse),
	/// The shared refresh failed; every request queued behind it receives a copy.
	#[error("Credential refresh failed.")]
	Refresh(#[from] RefreshError),
	/// Credential cannot be used or recovered while rendering on the server.
	#[error("Authentication token is invalid.")]
	AuthTokenInvalid {
		/// Refresh failure that invalidated the credential, if one was attempted.
		#[source]
		refresh: Option<RefreshError>,
	},
	/// Credential was rejected and the interactive session has been signed out.
	#[error("Session was signed out after an unauthorized response.")]
	SignedOut,
	/// Response body could not be decoded into the requested type.
	#[error("Response body could not be decoded.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the decoded response.
		status: u16,
	},
	/// Request body could not be encoded as JSON.
	#[error("Request body could not be encoded.")]
	Encode(#[source] serde_json::Error),
}
impl Error {
	/// Returns the refresh failure carried by this error, if any.
	pub fn refresh_error(&self) -> Option<&RefreshError> {
		match self {
			Self::Refresh(err) => Some(err),
			Self::AuthTokenInvalid { refresh } => refresh.as_ref(),
			_ => None,
		}
	}

	/// Returns `true` when the error means the stored credential can no longer be used.
	pub fn is_auth_failure(&self) -> bool {
		matches!(self, Self::Refresh(_) | Self::AuthTokenInvalid { .. } | Self::SignedOut)
	}
}
impl From<crate::config::GatewayConfigError> for Error {
	fn from(e: crate::config::GatewayConfigError) -> Self {
		Self::Config(e.into())
	}
}

/// Failure of a refresh episode.
///
/// The value is cloned into every queued continuation, so variants only carry owned summaries.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshError {
	/// No refresh token cookie is stored.
	#[error("No refresh token is stored.")]
	MissingRefreshToken,
	/// Refresh endpoint answered with a non-success status.
	#[error("Refresh endpoint rejected the refresh token with HTTP status {status}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Reason code from the error payload, when present.
		code: Option<String>,
	},
	/// Refresh call never produced a response.
	#[error("Refresh call failed: {message}.")]
	Transport {
		/// Summary of the transport failure.
		message: String,
	},
	/// Refresh endpoint answered with a body that is not `{ token, refreshToken }`.
	#[error("Refresh endpoint returned a malformed body: {message}.")]
	MalformedResponse {
		/// Summary of the parsing failure.
		message: String,
	},
	/// The rotated credential could not be persisted.
	#[error("Rotated credential could not be stored: {message}.")]
	Storage {
		/// Summary of the storage failure.
		message: String,
	},
	/// The task driving the refresh was dropped before it settled.
	#[error("Refresh was abandoned before it completed.")]
	Abandoned,
}

/// Configuration and request-construction failures raised by the gateway.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Request path cannot be joined onto the base URL.
	#[error("Request URL `{url}` is invalid.")]
	InvalidUrl {
		/// URL that failed to parse.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Gateway configuration failed validation.
	#[error(transparent)]
	Gateway(#[from] crate::config::GatewayConfigError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the upstream API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the upstream API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn refresh_error_is_reachable_from_both_auth_variants() {
		let rejected = RefreshError::Rejected { status: 401, code: Some("token.invalid".into()) };
		let interactive = Error::from(rejected.clone());
		let server = Error::AuthTokenInvalid { refresh: Some(rejected.clone()) };

		assert_eq!(interactive.refresh_error(), Some(&rejected));
		assert_eq!(server.refresh_error(), Some(&rejected));
		assert!(interactive.is_auth_failure());
		assert!(server.is_auth_failure());
		assert!(Error::SignedOut.is_auth_failure());
		assert!(Error::AuthTokenInvalid { refresh: None }.refresh_error().is_none());
	}

	#[test]
	fn status_error_reports_code_and_keeps_response() {
		let err = Error::Status(ApiResponse::new(503, b"busy".to_vec()));

		assert_eq!(err.to_string(), "Request failed with HTTP status 503.");
		assert!(!err.is_auth_failure());

		match err {
			Error::Status(response) => assert_eq!(response.body, b"busy"),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn server_auth_error_exposes_refresh_source() {
		let err = Error::AuthTokenInvalid { refresh: Some(RefreshError::Abandoned) };
		let source = StdError::source(&err).expect("Refresh failure should be the error source.");

		assert_eq!(source.to_string(), RefreshError::Abandoned.to_string());
	}
}
