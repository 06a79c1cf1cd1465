// std
use std::{env, fs, process, sync::Arc};
// crates.io
use time::{Duration, macros};
// self
use token_warden::{
	error::{ConfigError, Error},
	store::{self, MemoryStore, TokenStore},
	token::{Quota, TokenRecord},
};

fn build_record(token: &str, quota: Option<u32>) -> TokenRecord {
	let mut builder = TokenRecord::builder(token)
		.token_type("api")
		.created_at(macros::datetime!(2025-06-01 08:00 UTC))
		.expires_in(Duration::days(30));

	if let Some(quota) = quota {
		builder = builder.quota(quota);
	}

	builder.build().expect("Token record fixture should build successfully.")
}

async fn exercise_contract(store: Arc<dyn TokenStore>) {
	let record = build_record("contract-token", Some(5));

	store.save(record.clone()).await.expect("First save should succeed.");

	let conflict = store
		.save(build_record("contract-token", None))
		.await
		.expect_err("Saving an existing token must conflict.");

	assert!(conflict.is_conflict());
	assert!(!conflict.to_string().contains("contract-token"));

	let fetched = store
		.get("contract-token")
		.await
		.expect("Lookup should succeed.")
		.expect("Saved record should be present.");

	assert_eq!(fetched, record);
	assert!(store.get("absent").await.expect("Lookup should succeed.").is_none());

	assert_eq!(store.add_quota("contract-token", -3).await.expect("Delta should apply."), Some(2));
	assert_eq!(store.add_quota("contract-token", 9).await.expect("Refund should clamp."), Some(5));
	assert_eq!(store.add_quota("absent", -1).await.expect("Absent tokens are fine."), None);

	let mut updated = fetched;

	updated.quota = Quota::Limited(8);
	updated.remaining_quota = 8;

	assert!(store.update(updated.clone()).await.expect("Update should succeed."));
	assert!(!store.update(build_record("absent", None)).await.expect("Update should succeed."));

	let deleted_at = macros::datetime!(2025-06-02 09:30 UTC);
	let deleted = store
		.delete("contract-token", deleted_at)
		.await
		.expect("Delete should succeed.")
		.expect("Deleted record should be returned.");

	assert_eq!(deleted.deleted_at, Some(deleted_at));
	assert_eq!(deleted.quota, Quota::Limited(8));
	assert!(store.delete("absent", deleted_at).await.expect("Delete should succeed.").is_none());

	let mut unlimited = build_record("contract-unlimited", None);

	unlimited.expires_at = None;

	store.save(unlimited.clone()).await.expect("Unlimited save should succeed.");
	store.save(build_record("contract-expiring", Some(1))).await.expect("Save should succeed.");

	let reloaded = store
		.get("contract-unlimited")
		.await
		.expect("Lookup should succeed.")
		.expect("Unlimited record should be present.");

	assert_eq!(reloaded, unlimited);
	assert_eq!(reloaded.quota, Quota::Unlimited);
	assert_eq!(
		store.purge(deleted_at - Duration::seconds(1)).await.expect("Purge should succeed."),
		0
	);
	assert_eq!(store.purge(deleted_at).await.expect("Purge should succeed."), 1);
	assert!(store.get("contract-token").await.expect("Lookup should succeed.").is_none());
	assert!(store.get("contract-expiring").await.expect("Lookup should succeed.").is_some());
	assert_eq!(
		store
			.purge(macros::datetime!(2025-07-01 08:00 UTC))
			.await
			.expect("Purge should succeed."),
		1
	);
	assert!(store.get("contract-expiring").await.expect("Lookup should succeed.").is_none());
	assert_eq!(
		store.get("contract-unlimited").await.expect("Lookup should succeed."),
		Some(unlimited)
	);

	store.close().await.expect("Close should succeed.");
}

#[tokio::test]
async fn memory_store_honors_the_contract() {
	exercise_contract(Arc::new(MemoryStore::default())).await;
}

#[tokio::test]
async fn file_store_honors_the_contract() {
	let path = env::temp_dir()
		.join(format!("token_warden_store_it_{}", process::id()))
		.join("tokens.json");
	let url = format!("file://{}", path.display());
	let _ = fs::remove_file(&path);
	let store = store::connect(&url).await.expect("File store URL should open.");

	exercise_contract(store).await;

	assert!(path.exists());

	fs::remove_dir_all(path.parent().expect("Store path should have a parent."))
		.expect("Failed to remove temporary store directory.");
}

#[tokio::test]
async fn connect_rejects_unknown_schemes() {
	let err = store::connect("redis://localhost").await.err().expect("Unknown schemes must fail.");

	assert!(matches!(
		err,
		Error::Config(ConfigError::UnsupportedScheme { ref scheme }) if scheme == "redis"
	));

	let err = store::connect("not a url").await.err().expect("Malformed URLs must fail.");

	assert!(matches!(err, Error::Config(ConfigError::InvalidStoreUrl { .. })));
}

#[tokio::test]
async fn memory_store_concurrent_deltas_compose() {
	let store = MemoryStore::default();

	store.save(build_record("shared", Some(100))).await.expect("Save should succeed.");

	let mut tasks = Vec::new();

	for _ in 0..40 {
		let store = store.clone();

		tasks.push(tokio::spawn(async move {
			store.add_quota("shared", -2).await.expect("Delta should apply.")
		}));
	}

	for task in tasks {
		task.await.expect("Delta task should not panic.");
	}

	let record = store.get("shared").await.expect("Lookup should succeed.").expect("Stored.");

	assert_eq!(record.remaining_quota, 20);
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn sqlite_store_honors_the_contract() {
	let store = store::connect("sqlite::memory:").await.expect("In-memory SQLite should open.");

	exercise_contract(store).await;
}
