//! Request parameters for issuance and validation.

// self
use crate::{
	_prelude::*,
	token::{DEFAULT_TOKEN_TYPE, Extension, Quota},
};

/// Parameters for [`TokenManager::generate_token`](crate::manager::TokenManager::generate_token).
///
/// Unset expiry and quota fall back to the manager defaults.
#[derive(Clone, Debug)]
pub struct GenerateRequest {
	/// Token type the issued token is scoped to.
	pub token_type: String,
	/// Lifetime from issuance; overrides the manager default.
	pub expiry: Option<Duration>,
	/// Usage budget; overrides the manager default.
	pub quota: Option<Quota>,
	/// Opaque payload stored with the record.
	pub extension: Extension,
}
impl GenerateRequest {
	/// Creates a request for the provided token type.
	pub fn new(token_type: impl Into<String>) -> Self {
		Self { token_type: token_type.into(), expiry: None, quota: None, extension: Extension::new() }
	}

	/// Sets the lifetime from issuance.
	pub fn with_expiry(mut self, expiry: Duration) -> Self {
		self.expiry = Some(expiry);

		self
	}

	/// Sets the usage budget.
	pub fn with_quota(mut self, quota: impl Into<Quota>) -> Self {
		self.quota = Some(quota.into());

		self
	}

	/// Replaces the extension payload.
	pub fn with_extension(mut self, extension: Extension) -> Self {
		self.extension = extension;

		self
	}

	/// Adds a single extension entry.
	pub fn with_ext(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
		self.extension.insert(key.into(), value.into());

		self
	}
}
impl Default for GenerateRequest {
	fn default() -> Self {
		Self::new(DEFAULT_TOKEN_TYPE)
	}
}

/// Parameters for [`TokenManager::validate_token`](crate::manager::TokenManager::validate_token).
#[derive(Clone, Debug)]
pub struct ValidateRequest {
	/// Presented token.
	pub token: String,
	/// Token type the caller expects.
	pub token_type: String,
	/// Quota units this validation costs.
	pub cost: u32,
	/// Commits the cost to the store on success when true.
	pub deduct: bool,
}
impl ValidateRequest {
	const DEFAULT_COST: u32 = 1;

	/// Creates a request for the default token type, costing one unit and deducting it.
	pub fn new(token: impl Into<String>) -> Self {
		Self {
			token: token.into(),
			token_type: DEFAULT_TOKEN_TYPE.into(),
			cost: Self::DEFAULT_COST,
			deduct: true,
		}
	}

	/// Overrides the expected token type.
	pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = token_type.into();

		self
	}

	/// Overrides the cost.
	pub fn with_cost(mut self, cost: u32) -> Self {
		self.cost = cost;

		self
	}

	/// Controls whether the cost is committed on success.
	pub fn with_deduct(mut self, deduct: bool) -> Self {
		self.deduct = deduct;

		self
	}

	/// Checks the quota without consuming it.
	pub fn check_only(self) -> Self {
		self.with_deduct(false)
	}
}
