//! Flat-file [`TokenStore`] that keeps the whole token map in one JSON document.
//!
//! Every mutation rewrites the document wholesale through a temporary file and a rename.
//! There is no journal: a crash between writes loses the latest mutation, and a torn write of
//! the temporary file leaves the previous document in place.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{StoreError, StoreFuture, TokenStore},
	token::TokenRecord,
};

type Snapshot = HashMap<String, TokenRecord>;

/// Persists token records to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Snapshot>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;
		let store = Self { path, inner: Arc::new(RwLock::new(snapshot)) };

		if !store.path.exists() {
			store.persist_locked(&store.inner.read())?;
		}

		Ok(store)
	}

	/// Location of the backing document.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
		if !path.exists() {
			return Ok(HashMap::new());
		}

		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		let deserializer = &mut serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(deserializer).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {} at `{}`: {}", path.display(), e.path(), e.inner()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &Snapshot) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
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

	/// Swaps `record` into the snapshot and persists it; a failed write restores the previous
	/// entry.
	fn commit_record(&self, snapshot: &mut Snapshot, record: TokenRecord) -> Result<(), StoreError> {
		let key = record.token.expose().to_owned();
		let previous = snapshot.insert(key.clone(), record);

		if let Err(e) = self.persist_locked(snapshot) {
			match previous {
				Some(previous) => snapshot.insert(key, previous),
				None => snapshot.remove(&key),
			};

			return Err(e);
		}

		Ok(())
	}
}
impl TokenStore for FileStore {
	fn save(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			if guard.contains_key(record.token.expose()) {
				return Err(StoreError::conflict(record.token.expose()));
			}

			self.commit_record(&mut guard, record)
		})
	}

	fn get<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move { Ok(self.inner.read().get(token).cloned()) })
	}

	fn delete<'a>(
		&'a self,
		token: &'a str,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let Some(mut record) = guard.get(token).cloned() else {
				return Ok(None);
			};

			record.delete(instant);
			self.commit_record(&mut guard, record.clone())?;

			Ok(Some(record))
		})
	}

	fn update(&self, record: TokenRecord) -> StoreFuture<'_, bool> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			if !guard.contains_key(record.token.expose()) {
				return Ok(false);
			}

			self.commit_record(&mut guard, record)?;

			Ok(true)
		})
	}

	fn add_quota<'a>(&'a self, token: &'a str, delta: i64) -> StoreFuture<'a, Option<i64>> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let Some(mut record) = guard.get(token).cloned() else {
				return Ok(None);
			};
			let remaining = record.apply_quota_delta(delta);

			self.commit_record(&mut guard, record)?;

			Ok(Some(remaining))
		})
	}

	fn purge(&self, before: OffsetDateTime) -> StoreFuture<'_, usize> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let retired = guard
				.iter()
				.filter(|(_, record)| record.is_retired_at(before))
				.map(|(token, _)| token.clone())
				.collect::<Vec<_>>();

			if retired.is_empty() {
				return Ok(0);
			}

			let removed = retired
				.into_iter()
				.filter_map(|token| guard.remove_entry(&token))
				.collect::<Vec<_>>();

			if let Err(e) = self.persist_locked(&guard) {
				guard.extend(removed);

				return Err(e);
			}

			Ok(removed.len())
		})
	}

	fn close(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let guard = self.inner.read();

			self.persist_locked(&guard)
		})
	}
}
