//! Cookie storage contracts and built-in cookie jars holding the credential pair.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	config::CookiePolicy,
};

/// Boxed future returned by [`CookieStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Client-accessible storage for credential cookies.
///
/// Implementations must hide cookies whose max age has elapsed.
pub trait CookieStore
where
	Self: Send + Sync,
{
	/// Returns the live cookie named `name`, if present.
	fn get<'a>(&'a self, name: &'a str) -> StoreFuture<'a, Option<Cookie>>;

	/// Inserts or replaces a cookie.
	fn set(&self, cookie: Cookie) -> StoreFuture<'_, ()>;

	/// Removes a cookie, returning the previous live value.
	fn remove<'a>(&'a self, name: &'a str) -> StoreFuture<'a, Option<Cookie>>;
}

/// Error type produced by [`CookieStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// A stored cookie.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
	/// Cookie name.
	pub name: String,
	/// Cookie value.
	pub value: TokenSecret,
	/// Lifetime measured from `set_at`.
	pub max_age: Duration,
	/// Path attribute.
	pub path: String,
	/// Instant the cookie was written.
	pub set_at: OffsetDateTime,
}
impl Cookie {
	/// Creates a cookie written now with the given lifetime and path.
	pub fn new(
		name: impl Into<String>,
		value: impl Into<TokenSecret>,
		max_age: Duration,
		path: impl Into<String>,
	) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			max_age,
			path: path.into(),
			set_at: OffsetDateTime::now_utc(),
		}
	}

	/// Overrides the write instant.
	pub fn with_set_at(mut self, instant: OffsetDateTime) -> Self {
		self.set_at = instant;

		self
	}

	/// Instant the cookie stops being readable.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.set_at + self.max_age
	}

	/// Returns `true` if the cookie is expired at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at()
	}

	/// Renders the cookie as a `Set-Cookie` header value.
	pub fn to_set_cookie(&self) -> String {
		format!(
			"{}={}; Max-Age={}; Path={}",
			self.name,
			self.value.expose(),
			self.max_age.whole_seconds().max(0),
			self.path
		)
	}
}
impl Debug for Cookie {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Cookie")
			.field("name", &self.name)
			.field("value", &"<redacted>")
			.field("max_age", &self.max_age)
			.field("path", &self.path)
			.field("set_at", &self.set_at)
			.finish()
	}
}

/// Reads and writes the credential pair through a [`CookieStore`] using a [`CookiePolicy`].
#[derive(Clone)]
pub struct SessionCookies {
	store: Arc<dyn CookieStore>,
	policy: CookiePolicy,
}
impl SessionCookies {
	/// Binds a cookie store to a policy.
	pub fn new(store: Arc<dyn CookieStore>, policy: CookiePolicy) -> Self {
		Self { store, policy }
	}

	/// Returns the underlying store.
	pub fn store(&self) -> &Arc<dyn CookieStore> {
		&self.store
	}

	/// Returns the cookie policy.
	pub fn policy(&self) -> &CookiePolicy {
		&self.policy
	}

	/// Returns the stored access token.
	pub async fn access_token(&self) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.store.get(&self.policy.token_name).await?.map(|cookie| cookie.value))
	}

	/// Returns the stored refresh token.
	pub async fn refresh_token(&self) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.store.get(&self.policy.refresh_token_name).await?.map(|cookie| cookie.value))
	}

	/// Loads the full pair when both cookies are live.
	pub async fn load(&self) -> Result<Option<CredentialPair>, StoreError> {
		let token = self.store.get(&self.policy.token_name).await?;
		let refresh = self.store.get(&self.policy.refresh_token_name).await?;

		Ok(match (token, refresh) {
			(Some(token), Some(refresh)) => Some(CredentialPair {
				issued_at: token.set_at,
				expires_at: token.expires_at(),
				access_token: token.value,
				refresh_token: refresh.value,
			}),
			_ => None,
		})
	}

	/// Writes both credential cookies with the policy's max age and path.
	pub async fn save(&self, pair: &CredentialPair) -> Result<(), StoreError> {
		let Self { store, policy } = self;

		store
			.set(
				Cookie::new(
					&policy.token_name,
					pair.access_token.clone(),
					policy.max_age,
					&policy.path,
				)
				.with_set_at(pair.issued_at),
			)
			.await?;
		store
			.set(
				Cookie::new(
					&policy.refresh_token_name,
					pair.refresh_token.clone(),
					policy.max_age,
					&policy.path,
				)
				.with_set_at(pair.issued_at),
			)
			.await
	}

	/// Removes both credential cookies.
	pub async fn clear(&self) -> Result<(), StoreError> {
		self.store.remove(&self.policy.token_name).await?;
		self.store.remove(&self.policy.refresh_token_name).await?;

		Ok(())
	}
}
impl Debug for SessionCookies {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionCookies").field("policy", &self.policy).finish()
	}
}
