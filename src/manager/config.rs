//! Manager configuration and fluent builder.

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	manager::TokenManager,
	store::TokenStore,
	token::{Quota, TokenGenerator},
};

/// Serializable manager settings; missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
	/// Length of generated tokens.
	pub token_length: usize,
	/// Lifetime applied when a request carries none; `None` issues non-expiring tokens.
	pub default_expiry_secs: Option<i64>,
	/// Quota applied when a request carries none; `None` means unlimited.
	pub default_quota: Option<u32>,
	/// Upper bound on generation attempts; `None` retries until a free token is found.
	pub max_generation_attempts: Option<u32>,
	/// Serializes check-then-commit quota validation per token within this process.
	pub serialize_quota: bool,
}
impl ManagerConfig {
	/// Default expiry as a [`Duration`].
	pub fn default_expiry(&self) -> Option<Duration> {
		self.default_expiry_secs.map(Duration::seconds)
	}

	/// Default quota as a [`Quota`].
	pub fn default_quota(&self) -> Quota {
		self.default_quota.map_or(Quota::Unlimited, Quota::Limited)
	}
}
impl Default for ManagerConfig {
	fn default() -> Self {
		Self {
			token_length: TokenGenerator::DEFAULT_LENGTH,
			default_expiry_secs: None,
			default_quota: None,
			max_generation_attempts: None,
			serialize_quota: false,
		}
	}
}

/// Builder for [`TokenManager`].
pub struct TokenManagerBuilder {
	store: Arc<dyn TokenStore>,
	config: ManagerConfig,
}
impl TokenManagerBuilder {
	pub(crate) fn new(store: Arc<dyn TokenStore>) -> Self {
		Self { store, config: ManagerConfig::default() }
	}

	/// Replaces every setting with the provided configuration.
	pub fn config(mut self, config: ManagerConfig) -> Self {
		self.config = config;

		self
	}

	/// Sets the generated token length.
	pub fn token_length(mut self, length: usize) -> Self {
		self.config.token_length = length;

		self
	}

	/// Sets the lifetime applied when a request carries none.
	pub fn default_expiry(mut self, expiry: Duration) -> Self {
		self.config.default_expiry_secs = Some(expiry.whole_seconds());

		self
	}

	/// Sets the quota applied when a request carries none.
	pub fn default_quota(mut self, quota: u32) -> Self {
		self.config.default_quota = Some(quota);

		self
	}

	/// Caps the number of generation attempts.
	pub fn max_generation_attempts(mut self, attempts: u32) -> Self {
		self.config.max_generation_attempts = Some(attempts);

		self
	}

	/// Holds a per-token lock across the quota check and commit.
	pub fn serialize_quota(mut self, enabled: bool) -> Self {
		self.config.serialize_quota = enabled;

		self
	}

	/// Validates the configuration and produces a [`TokenManager`].
	pub fn build(self) -> Result<TokenManager, ConfigError> {
		let generator = TokenGenerator::new(self.config.token_length)?;

		if self.config.max_generation_attempts == Some(0) {
			return Err(ConfigError::ZeroGenerationAttempts);
		}

		Ok(TokenManager::from_parts(self.store, generator, self.config))
	}
}
impl Debug for TokenManagerBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManagerBuilder").field("config", &self.config).finish()
	}
}
