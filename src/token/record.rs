//! Token record structs, lifecycle helpers, and builders.

// self
use crate::{
	_prelude::*,
	token::{DEFAULT_TOKEN_TYPE, Extension, Quota, TokenSecret},
};

/// Lifecycle status of a token record, computed once per evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token may still validate (subject to type and quota checks).
	Active,
	/// Token passed its expiry deadline. Terminal.
	Expired,
	/// Token has been soft-deleted. Terminal.
	Deleted,
}

/// Errors produced by [`TokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenRecordBuilderError {
	/// Issued when no token value was provided.
	#[error("Token value is required.")]
	MissingToken,
	/// Issued when the token type is empty.
	#[error("Token type cannot be empty.")]
	EmptyTokenType,
	/// Issued when the relative expiry overflows the representable time range.
	#[error("Token expiry is out of range.")]
	ExpiryOutOfRange,
}

/// Persisted token record.
///
/// Field names on the wire follow the shared record shape:
/// `{token, token_type, ext, created_at, expires_at, deleted_at, quota, r_quota}`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Opaque bearer token; primary identity across the store.
	pub token: TokenSecret,
	/// Category label scoping where the token may be used.
	pub token_type: String,
	/// Caller-supplied payload captured at issuance.
	#[serde(rename = "ext", default)]
	pub extension: Extension,
	/// Issuance instant.
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	/// Optional expiry deadline.
	#[serde(with = "time::serde::rfc3339::option")]
	pub expires_at: Option<OffsetDateTime>,
	/// Optional soft-delete marker.
	#[serde(with = "time::serde::rfc3339::option")]
	pub deleted_at: Option<OffsetDateTime>,
	/// Total budget granted at issuance.
	pub quota: Quota,
	/// Budget left; meaningless for unlimited quotas.
	#[serde(rename = "r_quota")]
	pub remaining_quota: i64,
}
impl TokenRecord {
	/// Returns a builder for the provided token value.
	pub fn builder(token: impl Into<String>) -> TokenRecordBuilder {
		TokenRecordBuilder::new(token)
	}

	/// Computes the lifecycle status at a given instant.
	///
	/// Deletion wins over expiry so a deleted record never reports as merely expired.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if self.deleted_at.is_some_and(|deleted_at| instant >= deleted_at) {
			return TokenStatus::Deleted;
		}
		if self.expires_at.is_some_and(|expires_at| instant >= expires_at) {
			return TokenStatus::Expired;
		}

		TokenStatus::Active
	}

	/// Convenience helper that checks the status using the current UTC instant.
	pub fn status(&self) -> TokenStatus {
		self.status_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` if the record is currently active.
	pub fn is_active(&self) -> bool {
		matches!(self.status(), TokenStatus::Active)
	}

	/// Returns `true` if the record has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Expired)
	}

	/// Returns `true` if the record counts as deleted at the provided instant.
	pub fn is_deleted_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Deleted)
	}

	/// Returns `true` once the record can never validate again (deleted or expired).
	pub fn is_retired_at(&self, instant: OffsetDateTime) -> bool {
		!matches!(self.status_at(instant), TokenStatus::Active)
	}

	/// Marks the record as deleted. An existing marker is kept.
	pub fn delete(&mut self, instant: OffsetDateTime) {
		if self.deleted_at.is_none() {
			self.deleted_at = Some(instant);
		}
	}

	/// Applies a signed quota delta in place and returns the new remaining budget.
	pub fn apply_quota_delta(&mut self, delta: i64) -> i64 {
		self.remaining_quota = self.quota.apply_delta(self.remaining_quota, delta);

		self.remaining_quota
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("token", &self.token)
			.field("token_type", &self.token_type)
			.field("extension", &self.extension)
			.field("created_at", &self.created_at)
			.field("expires_at", &self.expires_at)
			.field("deleted_at", &self.deleted_at)
			.field("quota", &self.quota)
			.field("remaining_quota", &self.remaining_quota)
			.finish()
	}
}

/// Builder for [`TokenRecord`].
#[derive(Clone, Debug)]
pub struct TokenRecordBuilder {
	token: String,
	token_type: String,
	extension: Extension,
	created_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
	quota: Quota,
}
impl TokenRecordBuilder {
	fn new(token: impl Into<String>) -> Self {
		Self {
			token: token.into(),
			token_type: DEFAULT_TOKEN_TYPE.into(),
			extension: Extension::new(),
			created_at: None,
			expires_at: None,
			expires_in: None,
			quota: Quota::Unlimited,
		}
	}

	/// Sets the token type.
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = token_type.into();

		self
	}

	/// Replaces the extension payload.
	pub fn extension(mut self, extension: Extension) -> Self {
		self.extension = extension;

		self
	}

	/// Sets the issuance instant.
	pub fn created_at(mut self, instant: OffsetDateTime) -> Self {
		self.created_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issuance instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Sets the usage quota; the remaining budget starts equal to it.
	pub fn quota(mut self, quota: impl Into<Quota>) -> Self {
		self.quota = quota.into();

		self
	}

	/// Consumes the builder and produces a [`TokenRecord`].
	pub fn build(self) -> Result<TokenRecord, TokenRecordBuilderError> {
		if self.token.is_empty() {
			return Err(TokenRecordBuilderError::MissingToken);
		}
		if self.token_type.is_empty() {
			return Err(TokenRecordBuilderError::EmptyTokenType);
		}

		let created_at = self.created_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => Some(instant),
			(None, Some(delta)) => Some(
				created_at.checked_add(delta).ok_or(TokenRecordBuilderError::ExpiryOutOfRange)?,
			),
			(None, None) => None,
		};

		Ok(TokenRecord {
			token: TokenSecret::new(self.token),
			token_type: self.token_type,
			extension: self.extension,
			created_at,
			expires_at,
			deleted_at: None,
			quota: self.quota,
			remaining_quota: self.quota.initial_remaining(),
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	use time::macros;
	// self
	use super::*;

	#[test]
	fn status_transitions_cover_all_states() {
		let created = macros::datetime!(2025-01-01 00:00 UTC);
		let mut record = TokenRecord::builder("tok-1")
			.created_at(created)
			.expires_at(macros::datetime!(2025-01-01 01:00 UTC))
			.build()
			.expect("Token record builder should succeed for status transitions.");

		assert_eq!(record.status_at(macros::datetime!(2025-01-01 00:30 UTC)), TokenStatus::Active);
		assert_eq!(record.status_at(macros::datetime!(2025-01-01 01:00 UTC)), TokenStatus::Expired);

		record.delete(macros::datetime!(2025-01-01 00:10 UTC));

		assert_eq!(record.status_at(macros::datetime!(2025-01-01 00:05 UTC)), TokenStatus::Active);
		assert_eq!(record.status_at(macros::datetime!(2025-01-01 00:30 UTC)), TokenStatus::Deleted);
		assert_eq!(record.status_at(macros::datetime!(2025-01-01 02:00 UTC)), TokenStatus::Deleted);
	}

	#[test]
	fn builder_handles_relative_expiry_and_quota() {
		let record = TokenRecord::builder("tok-2")
			.created_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::minutes(30))
			.quota(10)
			.build()
			.expect("Token record builder should support relative expiry calculations.");

		assert_eq!(record.expires_at, Some(macros::datetime!(2025-01-01 00:30 UTC)));
		assert_eq!(record.quota, Quota::Limited(10));
		assert_eq!(record.remaining_quota, 10);
		assert_eq!(record.token_type, DEFAULT_TOKEN_TYPE);
	}

	#[test]
	fn builder_rejects_missing_fields() {
		assert_eq!(TokenRecord::builder("").build(), Err(TokenRecordBuilderError::MissingToken));
		assert_eq!(
			TokenRecord::builder("tok").token_type("").build(),
			Err(TokenRecordBuilderError::EmptyTokenType)
		);
	}

	#[test]
	fn builder_rejects_unrepresentable_expiry() {
		assert_eq!(
			TokenRecord::builder("tok").expires_in(Duration::MAX).build(),
			Err(TokenRecordBuilderError::ExpiryOutOfRange)
		);
		assert_eq!(
			TokenRecord::builder("tok")
				.created_at(macros::datetime!(2025-01-01 00:00 UTC))
				.expires_in(Duration::MIN)
				.build(),
			Err(TokenRecordBuilderError::ExpiryOutOfRange)
		);
	}

	#[test]
	fn delete_keeps_the_first_marker() {
		let mut record = TokenRecord::builder("tok-3").build().expect("Fixture should build.");
		let first = macros::datetime!(2025-01-01 00:00 UTC);

		record.delete(first);
		record.delete(macros::datetime!(2025-06-01 00:00 UTC));

		assert_eq!(record.deleted_at, Some(first));
	}

	#[test]
	fn serde_round_trip_is_lossless() {
		let mut extension = Extension::new();

		extension.insert("user_id".into(), json!("u-42"));
		extension.insert("plan".into(), json!({ "tier": "pro", "seats": 3 }));

		let unlimited = TokenRecord::builder("tok-unlimited")
			.token_type("api")
			.extension(extension)
			.created_at(macros::datetime!(2025-03-04 05:06:07.123456789 UTC))
			.build()
			.expect("Unlimited fixture should build.");
		let mut limited = TokenRecord::builder("tok-limited")
			.created_at(macros::datetime!(2025-03-04 05:06:07 UTC))
			.expires_in(Duration::hours(24))
			.quota(7)
			.build()
			.expect("Limited fixture should build.");

		limited.delete(macros::datetime!(2025-03-05 00:00 UTC));
		limited.apply_quota_delta(-2);

		for record in [unlimited, limited] {
			let payload = serde_json::to_string(&record).expect("Record should serialize.");
			let decoded: TokenRecord =
				serde_json::from_str(&payload).expect("Record should deserialize.");

			assert_eq!(decoded, record);
		}
	}

	#[test]
	fn wire_shape_uses_short_field_names() {
		let record = TokenRecord::builder("tok-wire")
			.created_at(macros::datetime!(2025-01-01 00:00 UTC))
			.quota(3)
			.build()
			.expect("Wire fixture should build.");
		let value = serde_json::to_value(&record).expect("Record should serialize to a value.");

		assert_eq!(value["token"], json!("tok-wire"));
		assert_eq!(value["ext"], json!({}));
		assert_eq!(value["expires_at"], json!(null));
		assert_eq!(value["deleted_at"], json!(null));
		assert_eq!(value["quota"], json!(3));
		assert_eq!(value["r_quota"], json!(3));
		assert_eq!(value["created_at"], json!("2025-01-01T00:00:00Z"));
	}
}
