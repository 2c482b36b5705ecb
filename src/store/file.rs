//! Simple file-backed [`CookieStore`] for command-line clients that keep a session across runs.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{Cookie, CookieStore, StoreError, StoreFuture},
};

/// Persists cookies to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<BTreeMap<String, Cookie>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Returns the backing file path.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<BTreeMap<String, Cookie>, StoreError> {
		if !path.exists() {
			return Ok(BTreeMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(BTreeMap::new());
		}

		let cookies: Vec<Cookie> =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;
		let now = OffsetDateTime::now_utc();

		Ok(cookies
			.into_iter()
			.filter(|cookie| !cookie.is_expired_at(now))
			.map(|cookie| (cookie.name.clone(), cookie))
			.collect())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &BTreeMap<String, Cookie>) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let snapshot: Vec<_> = contents.values().collect();
		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize cookie snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl CookieStore for FileStore {
	fn get<'a>(&'a self, name: &'a str) -> StoreFuture<'a, Option<Cookie>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();

			Ok(self.inner.read().get(name).filter(|cookie| !cookie.is_expired_at(now)).cloned())
		})
	}

	fn set(&self, cookie: Cookie) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.insert(cookie.name.clone(), cookie);
			self.persist_locked(&guard)
		})
	}

	fn remove<'a>(&'a self, name: &'a str) -> StoreFuture<'a, Option<Cookie>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let mut guard = self.inner.write();
			let removed = guard.remove(name);

			if removed.is_some() {
				self.persist_locked(&guard)?;
			}

			Ok(removed.filter(|cookie| !cookie.is_expired_at(now)))
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;
	use crate::{
		auth::CredentialPair,
		config::CookiePolicy,
		store::SessionCookies,
	};

	fn temp_path() -> PathBuf {
		let unique = format!(
			"auth_gateway_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[tokio::test]
	async fn session_survives_reopen_and_clear_persists() {
		let path = temp_path();
		let store = Arc::new(FileStore::open(&path).expect("Failed to open file store snapshot."));
		let session = SessionCookies::new(store, CookiePolicy::default());

		session
			.save(&CredentialPair::issue_now("file-token", "file-refresh"))
			.await
			.expect("Failed to save credential pair to file store.");
		drop(session);

		let reopened: Arc<dyn CookieStore> =
			Arc::new(FileStore::open(&path).expect("Failed to reopen file store snapshot."));
		let session = SessionCookies::new(reopened, CookiePolicy::default());
		let pair = session
			.load()
			.await
			.expect("Failed to load credential pair from file store.")
			.expect("File store lost the credential pair after reopen.");

		assert_eq!(pair.access_token.expose(), "file-token");
		assert_eq!(pair.refresh_token.expose(), "file-refresh");

		session.clear().await.expect("Failed to clear credential pair.");

		let cleared = FileStore::open(&path).expect("Failed to reopen cleared snapshot.");

		assert!(cleared.inner.read().is_empty());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn expired_cookies_are_dropped_on_load() {
		let path = temp_path();
		let stale = Cookie::new("nextauth.token", "old", Duration::seconds(1), "/")
			.with_set_at(OffsetDateTime::now_utc() - Duration::hours(1));

		fs::write(&path, serde_json::to_vec(&[stale]).expect("Fixture should serialize."))
			.expect("Failed to write stale snapshot.");

		let store = FileStore::open(&path).expect("Failed to open stale snapshot.");

		assert!(store.inner.read().is_empty());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
