//! Thread-safe in-memory [`CookieStore`] used as a per-request jar and in tests.

// self
use crate::{
	_prelude::*,
	store::{Cookie, CookieStore, StoreError, StoreFuture},
};

type CookieMap = Arc<RwLock<BTreeMap<String, Cookie>>>;

/// Cookie jar that keeps cookies in-process.
///
/// A server renderer typically seeds one jar per incoming request from its `Cookie` header with
/// [`MemoryStore::from_cookie_header`] and writes [`MemoryStore::set_cookie_headers`] back onto
/// the response.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
	cookies: CookieMap,
	written: Arc<RwLock<Vec<String>>>,
}
impl MemoryStore {
	/// Seeds a jar from a request `Cookie` header (`a=1; b=2`).
	///
	/// Parsed cookies have no known lifetime; they use `max_age` and root path.
	pub fn from_cookie_header(header: &str, max_age: Duration) -> Self {
		let now = OffsetDateTime::now_utc();
		let cookies = header
			.split(';')
			.filter_map(|pair| {
				let (name, value) = pair.trim().split_once('=')?;
				let name = name.trim();

				if name.is_empty() {
					return None;
				}

				let cookie = Cookie::new(name, value.trim(), max_age, "/").with_set_at(now);

				Some((name.to_owned(), cookie))
			})
			.collect();

		Self { cookies: Arc::new(RwLock::new(cookies)), written: Default::default() }
	}

	/// Returns every `Set-Cookie` header produced by writes and removals, in order.
	pub fn set_cookie_headers(&self) -> Vec<String> {
		self.written.read().clone()
	}

	/// Returns the names of all live cookies.
	pub fn names(&self) -> Vec<String> {
		let now = OffsetDateTime::now_utc();

		self.cookies
			.read()
			.values()
			.filter(|cookie| !cookie.is_expired_at(now))
			.map(|cookie| cookie.name.clone())
			.collect()
	}

	fn get_now(map: &CookieMap, name: &str) -> Option<Cookie> {
		let now = OffsetDateTime::now_utc();

		map.read().get(name).filter(|cookie| !cookie.is_expired_at(now)).cloned()
	}

	fn set_now(&self, cookie: Cookie) {
		self.written.write().push(cookie.to_set_cookie());
		self.cookies.write().insert(cookie.name.clone(), cookie);
	}

	fn remove_now(&self, name: &str) -> Option<Cookie> {
		let now = OffsetDateTime::now_utc();
		let removed = self.cookies.write().remove(name);

		if let Some(cookie) = removed.as_ref() {
			self.written.write().push(format!("{}=; Max-Age=0; Path={}", name, cookie.path));
		}

		removed.filter(|cookie| !cookie.is_expired_at(now))
	}
}
impl CookieStore for MemoryStore {
	fn get<'a>(&'a self, name: &'a str) -> StoreFuture<'a, Option<Cookie>> {
		let map = self.cookies.clone();

		Box::pin(async move { Ok(Self::get_now(&map, name)) })
	}

	fn set(&self, cookie: Cookie) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.set_now(cookie);

			Ok::<_, StoreError>(())
		})
	}

	fn remove<'a>(&'a self, name: &'a str) -> StoreFuture<'a, Option<Cookie>> {
		Box::pin(async move { Ok(self.remove_now(name)) })
	}
}
