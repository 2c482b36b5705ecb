//! Access/refresh credential pair and its lifetime policy.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access and refresh tokens issued together by sign-in or a refresh cycle.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
	/// Bearer credential attached to outbound requests.
	pub access_token: TokenSecret,
	/// Longer-lived secret exchanged for a new pair.
	pub refresh_token: TokenSecret,
	/// Instant the pair was persisted.
	pub issued_at: OffsetDateTime,
	/// Instant after which the stored pair is discarded.
	pub expires_at: OffsetDateTime,
}
impl CredentialPair {
	/// Wall-clock lifetime applied to stored credentials.
	pub const DEFAULT_TTL: Duration = Duration::days(30);

	/// Issues a pair that stays stored for `ttl` after `issued_at`.
	pub fn issue(
		access_token: impl Into<TokenSecret>,
		refresh_token: impl Into<TokenSecret>,
		issued_at: OffsetDateTime,
		ttl: Duration,
	) -> Self {
		Self {
			access_token: access_token.into(),
			refresh_token: refresh_token.into(),
			issued_at,
			expires_at: issued_at + ttl,
		}
	}

	/// Issues a pair at the current instant with [`Self::DEFAULT_TTL`].
	pub fn issue_now(
		access_token: impl Into<TokenSecret>,
		refresh_token: impl Into<TokenSecret>,
	) -> Self {
		Self::issue(access_token, refresh_token, OffsetDateTime::now_utc(), Self::DEFAULT_TTL)
	}

	/// Returns `true` if the stored pair has outlived its TTL at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Remaining storage lifetime at `instant`, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}
impl Debug for CredentialPair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialPair")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn issue_applies_ttl_and_expiry_boundary() {
		let issued = macros::datetime!(2025-11-10 12:00 UTC);
		let pair = CredentialPair::issue("tok", "ref", issued, CredentialPair::DEFAULT_TTL);

		assert_eq!(pair.expires_at, macros::datetime!(2025-12-10 12:00 UTC));
		assert!(!pair.is_expired_at(issued + Duration::days(29)));
		assert!(pair.is_expired_at(pair.expires_at));
		assert_eq!(pair.remaining_at(issued + Duration::days(31)), Duration::ZERO);
		assert_eq!(pair.remaining_at(issued + Duration::days(10)), Duration::days(20));
	}

	#[test]
	fn debug_output_redacts_both_tokens() {
		let pair = CredentialPair::issue_now("access-secret", "refresh-secret");
		let rendered = format!("{pair:?}");

		assert!(!rendered.contains("access-secret"));
		assert!(!rendered.contains("refresh-secret"));
	}
}
