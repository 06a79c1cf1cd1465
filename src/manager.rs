//! Token issuance, validation, quota accounting, and deletion.
//!
//! [`TokenManager`] owns no durable state: every decision is made against a fresh copy fetched
//! from the [`TokenStore`], and every mutation goes through the store. Validation runs the
//! ordered checks (type, deletion, expiry, quota) on that copy, so a rejected request never
//! touches the store. Quota commits use the store's atomic `add_quota`.
//!
//! Without [`ManagerConfig::serialize_quota`], two concurrent deducting validations of the same
//! token can both pass the local quota check before either commits, briefly over-consuming.
//! The stored remaining quota is still exact afterwards. With the flag set, the check and the
//! commit run under a per-token async lock, which closes the window inside one process only.

pub mod config;
pub mod request;

mod metrics;

pub use config::*;
pub use metrics::ManagerMetrics;
pub use request::*;

// self
use crate::{
	_prelude::*,
	context::CurrentToken,
	error::{ConfigError, InvalidReason},
	obs::{self, OpOutcome, OpSpan, TokenOp},
	store::TokenStore,
	token::{TokenGenerator, TokenRecord, TokenStatus},
};

type QuotaGuards = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

const QUOTA_GUARD_PRUNE_THRESHOLD: usize = 1_024;

/// Issues, validates, and retires bearer tokens against a pluggable store.
#[derive(Clone)]
pub struct TokenManager {
	store: Arc<dyn TokenStore>,
	generator: TokenGenerator,
	config: ManagerConfig,
	metrics: Arc<ManagerMetrics>,
	quota_guards: QuotaGuards,
}
impl TokenManager {
	/// Returns a builder seeded with default settings.
	pub fn builder(store: Arc<dyn TokenStore>) -> TokenManagerBuilder {
		TokenManagerBuilder::new(store)
	}

	/// Creates a manager with default settings: 16-character tokens, no default expiry,
	/// unlimited default quota, unbounded generation retries.
	pub fn new(store: Arc<dyn TokenStore>) -> Self {
		Self::from_parts(store, TokenGenerator::default(), ManagerConfig::default())
	}

	pub(crate) fn from_parts(
		store: Arc<dyn TokenStore>,
		generator: TokenGenerator,
		config: ManagerConfig,
	) -> Self {
		Self {
			store,
			generator,
			config,
			metrics: Default::default(),
			quota_guards: Default::default(),
		}
	}

	/// Store backing this manager.
	pub fn store(&self) -> &Arc<dyn TokenStore> {
		&self.store
	}

	/// Effective configuration.
	pub fn config(&self) -> &ManagerConfig {
		&self.config
	}

	/// In-process activity counters.
	pub fn metrics(&self) -> &ManagerMetrics {
		&self.metrics
	}

	/// Issues a new token and persists its record, returning the token string.
	///
	/// Candidates that already exist, or that the store rejects as duplicates, are discarded
	/// and resampled; duplicate-key conflicts never reach the caller.
	pub async fn generate_token(&self, request: GenerateRequest) -> Result<String> {
		const OP: TokenOp = TokenOp::Generate;

		let span = OpSpan::new(OP, "generate_token");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span.instrument(self.generate_inner(request)).await;

		record_outcome(OP, &result);

		result
	}

	/// Validates a token without publishing it anywhere.
	pub async fn validate_token(&self, request: ValidateRequest) -> Result<TokenRecord> {
		self.validate_token_in(&CurrentToken::new(), request).await
	}

	/// Validates a token and, on success, publishes the validated copy into `current`.
	///
	/// Checks run in order and stop at the first failure: unknown token or type mismatch,
	/// soft deletion, expiry, then quota. A deducting validation commits `cost` through
	/// [`TokenStore::add_quota`] and the returned copy reflects the committed remaining quota.
	pub async fn validate_token_in(
		&self,
		current: &CurrentToken,
		request: ValidateRequest,
	) -> Result<TokenRecord> {
		const OP: TokenOp = TokenOp::Validate;

		let span = OpSpan::for_token(OP, "validate_token", &request.token);

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span.instrument(self.validate_inner(&request)).await;

		match &result {
			Ok(record) => {
				current.publish(record.clone());
				self.metrics.record_validated();
			},
			Err(Error::Invalid(invalid)) => {
				obs::record_rejection(invalid.reason);
				self.metrics.record_rejected();
			},
			Err(_) => {},
		}

		record_outcome(OP, &result);

		result
	}

	/// Consumes `amount` units of quota directly, e.g. after a check-only validation.
	///
	/// Returns the committed remaining quota, or `None` when the token does not exist.
	pub async fn deduct_quota(&self, token: &str, amount: u32) -> Result<Option<i64>> {
		self.adjust_quota(token, -i64::from(amount), "deduct_quota").await
	}

	/// Gives `amount` units back, e.g. when the protected operation failed downstream.
	///
	/// Finite quotas never rise above their limit.
	pub async fn refund_quota(&self, token: &str, amount: u32) -> Result<Option<i64>> {
		self.adjust_quota(token, i64::from(amount), "refund_quota").await
	}

	/// Overwrites the stored record; returns `false` when no record matched.
	pub async fn update_token(&self, record: TokenRecord) -> Result<bool> {
		const OP: TokenOp = TokenOp::Update;

		let span = OpSpan::for_token(OP, "update_token", record.token.expose());

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result: Result<bool> =
			span.instrument(async { Ok(self.store.update(record).await?) }).await;

		record_outcome(OP, &result);

		result
	}

	/// Soft-deletes the token. Deletion is terminal.
	pub async fn delete_token(&self, token: &str) -> Result<Option<TokenRecord>> {
		const OP: TokenOp = TokenOp::Delete;

		let span = OpSpan::for_token(OP, "delete_token", token);

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result: Result<Option<TokenRecord>> = span
			.instrument(async {
				let deleted = self.store.delete(token, OffsetDateTime::now_utc()).await?;

				self.quota_guards.lock().remove(token);

				Ok(deleted)
			})
			.await;

		record_outcome(OP, &result);

		result
	}

	/// Hard-removes records that are deleted or expired as of now, returning how many went.
	pub async fn purge_expired(&self) -> Result<usize> {
		const OP: TokenOp = TokenOp::Purge;

		let span = OpSpan::new(OP, "purge_expired");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result: Result<usize> = span
			.instrument(async { Ok(self.store.purge(OffsetDateTime::now_utc()).await?) })
			.await;

		if let Ok(purged) = &result {
			obs::log_purge(*purged);
		}

		record_outcome(OP, &result);

		result
	}

	/// Read-only fetch with no validation side effects.
	pub async fn get_token_data(&self, token: &str) -> Result<Option<TokenRecord>> {
		Ok(self.store.get(token).await?)
	}

	/// Releases the store's resources.
	pub async fn close(&self) -> Result<()> {
		Ok(self.store.close().await?)
	}

	async fn generate_inner(&self, request: GenerateRequest) -> Result<String> {
		let expiry = request.expiry.or_else(|| self.config.default_expiry());
		let quota = request.quota.unwrap_or_else(|| self.config.default_quota());
		let mut attempts: u32 = 0;

		loop {
			if self.config.max_generation_attempts.is_some_and(|max| attempts >= max) {
				return Err(Error::GenerationExhausted { attempts });
			}

			attempts = attempts.saturating_add(1);

			let mut builder = TokenRecord::builder(self.generator.generate())
				.token_type(request.token_type.as_str())
				.extension(request.extension.clone())
				.quota(quota);

			if let Some(expiry) = expiry {
				builder = builder.expires_in(expiry);
			}

			let record = builder.build().map_err(ConfigError::from)?;
			let token = record.token.expose().to_owned();

			if self.store.get(&token).await?.is_some() {
				self.note_collision(attempts);

				continue;
			}

			match self.store.save(record).await {
				Ok(()) => {
					self.metrics.record_issued();

					return Ok(token);
				},
				Err(e) if e.is_conflict() => self.note_collision(attempts),
				Err(e) => return Err(e.into()),
			}
		}
	}

	async fn validate_inner(&self, request: &ValidateRequest) -> Result<TokenRecord> {
		let guard = if request.deduct { self.quota_guard(&request.token) } else { None };
		let _serialized = match &guard {
			Some(guard) => Some(guard.lock().await),
			None => None,
		};
		let Some(mut record) = self.store.get(&request.token).await? else {
			return Err(reject(InvalidReason::NotFound));
		};
		let now = OffsetDateTime::now_utc();

		if record.token_type != request.token_type {
			return Err(reject(InvalidReason::WrongType));
		}

		match record.status_at(now) {
			TokenStatus::Deleted => return Err(reject(InvalidReason::Deleted)),
			TokenStatus::Expired => return Err(reject(InvalidReason::Expired)),
			TokenStatus::Active => {},
		}

		if record.quota.is_unlimited() {
			return Ok(record);
		}

		let cost = i64::from(request.cost);

		if record.remaining_quota.saturating_sub(cost) < 0 {
			return Err(reject(InvalidReason::QuotaExceeded));
		}
		if request.deduct && cost > 0 {
			match self.store.add_quota(&request.token, -cost).await? {
				Some(remaining) => record.remaining_quota = remaining,
				None => return Err(reject(InvalidReason::NotFound)),
			}
		}

		Ok(record)
	}

	async fn adjust_quota(
		&self,
		token: &str,
		delta: i64,
		stage: &'static str,
	) -> Result<Option<i64>> {
		const OP: TokenOp = TokenOp::AdjustQuota;

		let span = OpSpan::for_token(OP, stage, token);

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result: Result<Option<i64>> = span
			.instrument(async {
				let guard = self.quota_guard(token);
				let _serialized = match &guard {
					Some(guard) => Some(guard.lock().await),
					None => None,
				};

				Ok(self.store.add_quota(token, delta).await?)
			})
			.await;

		record_outcome(OP, &result);

		result
	}

	/// Returns (and creates on demand) the per-token quota lock when serialization is enabled.
	fn quota_guard(&self, token: &str) -> Option<Arc<AsyncMutex<()>>> {
		if !self.config.serialize_quota {
			return None;
		}

		let mut guards = self.quota_guards.lock();

		if guards.len() >= QUOTA_GUARD_PRUNE_THRESHOLD {
			guards.retain(|_, guard| Arc::strong_count(guard) > 1);
		}

		Some(guards.entry(token.to_owned()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone())
	}

	fn note_collision(&self, attempt: u32) {
		self.metrics.record_collision();
		obs::log_collision(attempt);
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("config", &self.config)
			.field("metrics", &self.metrics)
			.finish()
	}
}

fn reject(reason: InvalidReason) -> Error {
	obs::log_rejection(reason);

	reason.into()
}

fn record_outcome<T>(op: TokenOp, result: &Result<T>) {
	match result {
		Ok(_) => obs::record_op_outcome(op, OpOutcome::Success),
		Err(_) => obs::record_op_outcome(op, OpOutcome::Failure),
	}
}
