//! Storage contract and built-in store implementations for token records.
//!
//! Backends are interchangeable behind [`TokenStore`]. Absence is reported as `Ok(None)`,
//! never as an error; the only domain-specific failure is [`StoreError::Conflict`], raised by
//! [`TokenStore::save`] when the token key already exists.

pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")] pub mod sql;

pub use file::FileStore;
pub use memory::MemoryStore;
#[cfg(feature = "sqlite")] pub use sql::SqlStore;

// self
use crate::{_prelude::*, error::ConfigError, token::TokenRecord};

/// Boxed future returned by every [`TokenStore`] operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by token stores.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Inserts a new record; fails with [`StoreError::Conflict`] if the token already exists.
	fn save(&self, record: TokenRecord) -> StoreFuture<'_, ()>;

	/// Fetches the record for `token`, if present.
	fn get<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<TokenRecord>>;

	/// Soft-deletes the record at the provided instant, returning the affected record.
	fn delete<'a>(
		&'a self,
		token: &'a str,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, Option<TokenRecord>>;

	/// Overwrites an existing record; returns `false` when no record matched.
	fn update(&self, record: TokenRecord) -> StoreFuture<'_, bool>;

	/// Atomically applies a signed delta to the remaining quota.
	///
	/// Returns the committed remaining quota, or `None` when the token is absent. Finite
	/// quotas clamp at their limit; unlimited quotas ignore the delta.
	fn add_quota<'a>(&'a self, token: &'a str, delta: i64) -> StoreFuture<'a, Option<i64>>;

	/// Hard-removes every record that was deleted or had expired at or before `before`.
	///
	/// Returns the number of removed records. Active records are never touched.
	fn purge(&self, before: OffsetDateTime) -> StoreFuture<'_, usize>;

	/// Releases backend resources. Further calls may fail.
	fn close(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// A record with the same token already exists.
	#[error("A token record with fingerprint {fingerprint} already exists.")]
	Conflict {
		/// Log-safe fingerprint of the conflicting token.
		fingerprint: String,
	},
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
impl StoreError {
	/// Builds a conflict error without leaking the raw token.
	pub fn conflict(token: &str) -> Self {
		Self::Conflict { fingerprint: crate::token::fingerprint(token) }
	}

	/// Returns `true` for duplicate-key failures.
	pub fn is_conflict(&self) -> bool {
		matches!(self, Self::Conflict { .. })
	}
}

/// Opens a store from a URL.
///
/// Supported schemes: `memory:` (process-local), `file:` (JSON document at the URL path), and
/// `sqlite:` (requires the `sqlite` feature). Unknown schemes and disabled backends fail here
/// rather than on first use.
pub async fn connect(url: &str) -> Result<Arc<dyn TokenStore>> {
	let parsed = Url::parse(url).map_err(|e| ConfigError::InvalidStoreUrl {
		url: url.to_owned(),
		reason: e.to_string(),
	})?;

	match parsed.scheme() {
		"memory" => Ok(Arc::new(MemoryStore::default())),
		"file" => {
			let path = parsed.to_file_path().map_err(|_| ConfigError::InvalidStoreUrl {
				url: url.to_owned(),
				reason: "file URLs must carry an absolute path".into(),
			})?;

			Ok(Arc::new(FileStore::open(path)?))
		},
		"sqlite" => connect_sqlite(url).await,
		scheme => Err(ConfigError::UnsupportedScheme { scheme: scheme.to_owned() }.into()),
	}
}

#[cfg(feature = "sqlite")]
async fn connect_sqlite(url: &str) -> Result<Arc<dyn TokenStore>> {
	Ok(Arc::new(SqlStore::connect(url).await?))
}

#[cfg(not(feature = "sqlite"))]
async fn connect_sqlite(_url: &str) -> Result<Arc<dyn TokenStore>> {
	Err(ConfigError::BackendUnavailable { backend: "sqlite", feature: "sqlite" }.into())
}
