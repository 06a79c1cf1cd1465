//! Opaque bearer tokens with optional expiry and usage quotas, re-checked against an
//! authoritative store on every use.
//!
//! The [`TokenManager`](manager::TokenManager) issues random identifiers, validates them
//! through an ordered lifecycle check (type, soft deletion, expiry, quota), and publishes
//! the validated record into an explicit [`CurrentToken`](context::CurrentToken) slot.
//! Persistence is delegated to any [`TokenStore`](store::TokenStore) implementation.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod context;
pub mod error;
pub mod guard;
pub mod manager;
pub mod obs;
pub mod store;
pub mod token;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		manager::TokenManager,
		store::{MemoryStore, TokenStore},
	};

	/// Token type used by fixtures when the test does not care about scoping.
	pub const TEST_TOKEN_TYPE: &str = "default";

	/// Constructs a [`TokenManager`] backed by a fresh in-memory store, returning both so tests
	/// can inspect the store directly.
	pub fn build_memory_manager() -> (TokenManager, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn TokenStore> = store_backend.clone();
		let manager = TokenManager::builder(store)
			.build()
			.expect("Default manager configuration should always be valid.");

		(manager, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use url;
#[cfg(test)] use tokio as _;
