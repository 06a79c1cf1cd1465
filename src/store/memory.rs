//! Thread-safe in-memory [`TokenStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{StoreError, StoreFuture, TokenStore},
	token::TokenRecord,
};

type StoreMap = Arc<RwLock<HashMap<String, TokenRecord>>>;

/// Thread-safe storage backend that keeps records in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of records currently held, deleted ones included.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no records are held.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn save_now(map: StoreMap, record: TokenRecord) -> Result<(), StoreError> {
		let mut guard = map.write();
		let key = record.token.expose().to_owned();

		if guard.contains_key(&key) {
			return Err(StoreError::conflict(&key));
		}

		guard.insert(key, record);

		Ok(())
	}

	fn delete_now(map: StoreMap, token: &str, instant: OffsetDateTime) -> Option<TokenRecord> {
		let mut guard = map.write();

		guard.get_mut(token).map(|record| {
			record.delete(instant);

			record.clone()
		})
	}

	fn update_now(map: StoreMap, record: TokenRecord) -> bool {
		let mut guard = map.write();

		match guard.get_mut(record.token.expose()) {
			Some(existing) => {
				*existing = record;

				true
			},
			None => false,
		}
	}

	fn add_quota_now(map: StoreMap, token: &str, delta: i64) -> Option<i64> {
		map.write().get_mut(token).map(|record| record.apply_quota_delta(delta))
	}

	fn purge_now(map: StoreMap, before: OffsetDateTime) -> usize {
		let mut guard = map.write();
		let held = guard.len();

		guard.retain(|_, record| !record.is_retired_at(before));

		held - guard.len()
	}
}
impl TokenStore for MemoryStore {
	fn save(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::save_now(map, record) })
	}

	fn get<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<TokenRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(token).cloned()) })
	}

	fn delete<'a>(
		&'a self,
		token: &'a str,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, Option<TokenRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::delete_now(map, token, instant)) })
	}

	fn update(&self, record: TokenRecord) -> StoreFuture<'_, bool> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::update_now(map, record)) })
	}

	fn add_quota<'a>(&'a self, token: &'a str, delta: i64) -> StoreFuture<'a, Option<i64>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::add_quota_now(map, token, delta)) })
	}

	fn purge(&self, before: OffsetDateTime) -> StoreFuture<'_, usize> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::purge_now(map, before)) })
	}

	fn close(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move { Ok(()) })
	}
}
