//! SQLite-backed [`TokenStore`] (feature `sqlite`).
//!
//! One row per token with a unique index on `token`. Quota adjustments run as a single
//! conditional `UPDATE ... SET r_quota = ...` so concurrent deductions compose in the database.

// crates.io
use sqlx::{
	Row,
	sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow},
	types::Json,
};
// self
use crate::{
	_prelude::*,
	store::{StoreError, StoreFuture, TokenStore},
	token::{Extension, Quota, TokenRecord, TokenSecret},
};

const CREATE_TABLE: &str = r#"CREATE TABLE IF NOT EXISTS tokens (
	id INTEGER PRIMARY KEY AUTOINCREMENT,
	token TEXT NOT NULL UNIQUE,
	token_type TEXT NOT NULL,
	ext TEXT NOT NULL,
	created_at TEXT NOT NULL,
	expires_at TEXT,
	deleted_at TEXT,
	quota INTEGER NOT NULL,
	r_quota INTEGER NOT NULL
)"#;
const SELECT_COLUMNS: &str =
	"SELECT token, token_type, ext, created_at, expires_at, deleted_at, quota, r_quota FROM tokens";

/// Token store persisting one row per record in SQLite.
#[derive(Clone, Debug)]
pub struct SqlStore {
	pool: SqlitePool,
}
impl SqlStore {
	/// Connects to `url` (e.g. `sqlite://tokens.db?mode=rwc` or `sqlite::memory:`) and ensures
	/// the schema exists.
	pub async fn connect(url: &str) -> Result<Self, StoreError> {
		// Every pooled connection to `:memory:` would see its own database.
		let max_connections = if url.contains(":memory:") { 1 } else { 8 };
		let pool = SqlitePoolOptions::new()
			.max_connections(max_connections)
			.connect(url)
			.await
			.map_err(backend_error)?;

		sqlx::query(CREATE_TABLE).execute(&pool).await.map_err(backend_error)?;

		Ok(Self { pool })
	}

	/// Wraps an existing pool; the schema must already exist.
	pub fn with_pool(pool: SqlitePool) -> Self {
		Self { pool }
	}

	fn decode(row: SqliteRow) -> Result<TokenRecord, StoreError> {
		let quota: i64 = row.try_get("quota").map_err(serialization_error)?;
		let Json(extension): Json<Extension> = row.try_get("ext").map_err(serialization_error)?;

		Ok(TokenRecord {
			token: TokenSecret::new(row.try_get::<String, _>("token").map_err(serialization_error)?),
			token_type: row.try_get("token_type").map_err(serialization_error)?,
			extension,
			created_at: row.try_get("created_at").map_err(serialization_error)?,
			expires_at: row.try_get("expires_at").map_err(serialization_error)?,
			deleted_at: row.try_get("deleted_at").map_err(serialization_error)?,
			quota: Quota::from_stored(quota)
				.map_err(|e| StoreError::Serialization { message: e.to_string() })?,
			remaining_quota: row.try_get("r_quota").map_err(serialization_error)?,
		})
	}

	async fn fetch(&self, token: &str) -> Result<Option<TokenRecord>, StoreError> {
		let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE token = ?1"))
			.bind(token)
			.fetch_optional(&self.pool)
			.await
			.map_err(backend_error)?;

		row.map(Self::decode).transpose()
	}
}
impl TokenStore for SqlStore {
	fn save(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let result = sqlx::query(
				"INSERT INTO tokens (token, token_type, ext, created_at, expires_at, deleted_at, quota, r_quota) \
				 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
			)
			.bind(record.token.expose())
			.bind(&record.token_type)
			.bind(Json(&record.extension))
			.bind(record.created_at)
			.bind(record.expires_at)
			.bind(record.deleted_at)
			.bind(record.quota.to_stored())
			.bind(record.remaining_quota)
			.execute(&self.pool)
			.await;

			match result {
				Ok(_) => Ok(()),
				Err(sqlx::Error::Database(e)) if e.is_unique_violation() =>
					Err(StoreError::conflict(record.token.expose())),
				Err(e) => Err(backend_error(e)),
			}
		})
	}

	fn get<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(self.fetch(token))
	}

	fn delete<'a>(
		&'a self,
		token: &'a str,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move {
			sqlx::query(
				"UPDATE tokens SET deleted_at = COALESCE(deleted_at, ?1) WHERE token = ?2",
			)
			.bind(instant)
			.bind(token)
			.execute(&self.pool)
			.await
			.map_err(backend_error)?;

			self.fetch(token).await
		})
	}

	fn update(&self, record: TokenRecord) -> StoreFuture<'_, bool> {
		Box::pin(async move {
			let result = sqlx::query(
				"UPDATE tokens SET token_type = ?1, ext = ?2, created_at = ?3, expires_at = ?4, \
				 deleted_at = ?5, quota = ?6, r_quota = ?7 WHERE token = ?8",
			)
			.bind(&record.token_type)
			.bind(Json(&record.extension))
			.bind(record.created_at)
			.bind(record.expires_at)
			.bind(record.deleted_at)
			.bind(record.quota.to_stored())
			.bind(record.remaining_quota)
			.bind(record.token.expose())
			.execute(&self.pool)
			.await
			.map_err(backend_error)?;

			Ok(result.rows_affected() > 0)
		})
	}

	fn add_quota<'a>(&'a self, token: &'a str, delta: i64) -> StoreFuture<'a, Option<i64>> {
		Box::pin(async move {
			let remaining = sqlx::query_scalar::<_, i64>(
				"UPDATE tokens SET r_quota = CASE WHEN quota < 0 THEN r_quota \
				 ELSE MIN(r_quota + ?1, quota) END WHERE token = ?2 RETURNING r_quota",
			)
			.bind(delta)
			.bind(token)
			.fetch_optional(&self.pool)
			.await
			.map_err(backend_error)?;

			Ok(remaining)
		})
	}

	fn purge(&self, before: OffsetDateTime) -> StoreFuture<'_, usize> {
		Box::pin(async move {
			let result = sqlx::query(
				"DELETE FROM tokens WHERE julianday(deleted_at) <= julianday(?1) \
				 OR julianday(expires_at) <= julianday(?1)",
			)
			.bind(before)
			.execute(&self.pool)
			.await
			.map_err(backend_error)?;

			Ok(usize::try_from(result.rows_affected()).unwrap_or(usize::MAX))
		})
	}

	fn close(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.pool.close().await;

			Ok(())
		})
	}
}

fn backend_error(e: sqlx::Error) -> StoreError {
	StoreError::Backend { message: e.to_string() }
}

fn serialization_error(e: sqlx::Error) -> StoreError {
	StoreError::Serialization { message: e.to_string() }
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	async fn memory_store() -> SqlStore {
		SqlStore::connect("sqlite::memory:").await.expect("In-memory SQLite should open.")
	}

	#[tokio::test]
	async fn rows_round_trip_and_conflict() {
		let store = memory_store().await;
		let record = TokenRecord::builder("sql-token")
			.token_type("api")
			.created_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::hours(1))
			.quota(4)
			.build()
			.expect("Fixture should build.");

		store.save(record.clone()).await.expect("First insert should succeed.");

		let err = store.save(record.clone()).await.expect_err("Duplicate insert must conflict.");

		assert!(err.is_conflict());

		let fetched = store.get("sql-token").await.expect("Lookup should succeed.").expect("Row.");

		assert_eq!(fetched, record);
		assert!(store.get("missing").await.expect("Lookup should succeed.").is_none());
	}

	#[tokio::test]
	async fn add_quota_is_a_single_conditional_update() {
		let store = memory_store().await;

		store
			.save(TokenRecord::builder("limited").quota(3).build().expect("Fixture."))
			.await
			.expect("Insert should succeed.");
		store
			.save(TokenRecord::builder("unlimited").build().expect("Fixture."))
			.await
			.expect("Insert should succeed.");

		assert_eq!(store.add_quota("limited", -2).await.expect("Delta should apply."), Some(1));
		assert_eq!(store.add_quota("limited", 10).await.expect("Refund should clamp."), Some(3));
		assert_eq!(store.add_quota("unlimited", -5).await.expect("No-op delta."), Some(0));
		assert_eq!(store.add_quota("missing", -1).await.expect("Absent rows are fine."), None);
	}

	#[tokio::test]
	async fn delete_sets_the_marker_once() {
		let store = memory_store().await;

		store
			.save(TokenRecord::builder("doomed").build().expect("Fixture."))
			.await
			.expect("Insert should succeed.");

		let first = macros::datetime!(2025-02-01 12:00 UTC);
		let deleted = store
			.delete("doomed", first)
			.await
			.expect("Delete should succeed.")
			.expect("Deleted row should be returned.");

		assert_eq!(deleted.deleted_at, Some(first));

		let again = store
			.delete("doomed", first + Duration::hours(1))
			.await
			.expect("Repeated delete should succeed.")
			.expect("Row should still exist.");

		assert_eq!(again.deleted_at, Some(first));
	}

	#[tokio::test]
	async fn purge_removes_only_retired_rows() {
		let store = memory_store().await;
		let now = macros::datetime!(2025-05-01 00:00 UTC);

		for (token, expires_at) in [
			("live", now + Duration::hours(1)),
			("stale", now - Duration::hours(1)),
			("gone", now + Duration::days(1)),
		] {
			store
				.save(
					TokenRecord::builder(token)
						.created_at(now - Duration::days(1))
						.expires_at(expires_at)
						.build()
						.expect("Fixture."),
				)
				.await
				.expect("Insert should succeed.");
		}

		store.delete("gone", now - Duration::minutes(5)).await.expect("Delete should succeed.");

		assert_eq!(store.purge(now).await.expect("Purge should succeed."), 2);
		assert!(store.get("live").await.expect("Lookup should succeed.").is_some());
		assert!(store.get("stale").await.expect("Lookup should succeed.").is_none());
		assert!(store.get("gone").await.expect("Lookup should succeed.").is_none());
	}

	#[tokio::test]
	async fn deleted_unlimited_rows_survive_reconnect() {
		let path = std::env::temp_dir().join(format!(
			"token_warden_sql_{}_{}.db",
			std::process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos()
		));
		let url = format!("sqlite://{}?mode=rwc", path.display());
		let store = SqlStore::connect(&url).await.expect("File-backed SQLite should open.");
		let unlimited = TokenRecord::builder("unlimited")
			.created_at(macros::datetime!(2025-03-04 05:06:07 UTC))
			.build()
			.expect("Fixture.");

		store.save(unlimited.clone()).await.expect("Insert should succeed.");
		store
			.save(
				TokenRecord::builder("doomed")
					.created_at(macros::datetime!(2025-03-04 05:06:07 UTC))
					.quota(2)
					.build()
					.expect("Fixture."),
			)
			.await
			.expect("Insert should succeed.");

		let deleted = store
			.delete("doomed", macros::datetime!(2025-03-05 00:00 UTC))
			.await
			.expect("Delete should succeed.")
			.expect("Deleted row should be returned.");

		store.close().await.expect("Close should succeed.");

		let reopened = SqlStore::connect(&url).await.expect("SQLite should reopen.");
		let reloaded = reopened.get("unlimited").await.expect("Lookup should succeed.").expect("Row.");

		assert_eq!(reloaded, unlimited);
		assert_eq!(reloaded.quota, Quota::Unlimited);
		assert!(reloaded.expires_at.is_none() && reloaded.deleted_at.is_none());
		assert_eq!(
			reopened.get("doomed").await.expect("Lookup should succeed.").expect("Row."),
			deleted
		);

		reopened.close().await.expect("Close should succeed.");
		std::fs::remove_file(&path).expect("Failed to remove temporary database.");
	}
}
