//! Crate-level error types shared across the manager, stores, and guards.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure (I/O, serialization, backend connectivity).
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem detected at construction.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The presented token failed validation.
	#[error(transparent)]
	Invalid(#[from] InvalidToken),
	/// Token generation hit the configured attempt cap without finding a free identifier.
	#[error("Token generation gave up after {attempts} attempts.")]
	GenerationExhausted {
		/// Number of candidates sampled before giving up.
		attempts: u32,
	},
}
impl Error {
	/// Returns the validation reason when the error belongs to the "token invalid" family.
	pub fn invalid_reason(&self) -> Option<InvalidReason> {
		match self {
			Self::Invalid(invalid) => Some(invalid.reason),
			_ => None,
		}
	}
}

/// Configuration failures raised while constructing managers or stores.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Token length must produce a usable identifier.
	#[error("Token length {length} is outside the supported range 1..={max}.")]
	InvalidTokenLength {
		/// Requested length.
		length: usize,
		/// Maximum supported length.
		max: usize,
	},
	/// Generation attempt cap must allow at least one attempt.
	#[error("The generation attempt cap must be at least 1.")]
	ZeroGenerationAttempts,
	/// Store URL could not be parsed or does not describe a usable location.
	#[error("Store URL `{url}` is invalid: {reason}.")]
	InvalidStoreUrl {
		/// Offending URL string.
		url: String,
		/// Human-readable reason.
		reason: String,
	},
	/// Store URL names a scheme no backend understands.
	#[error("No token store backend handles the `{scheme}` scheme.")]
	UnsupportedScheme {
		/// Scheme taken from the URL.
		scheme: String,
	},
	/// Backend exists but its optional dependency was not compiled in.
	#[error("The {backend} token store requires the `{feature}` crate feature.")]
	BackendUnavailable {
		/// Backend label.
		backend: &'static str,
		/// Cargo feature that enables the backend.
		feature: &'static str,
	},
	/// Token record builder validation failed.
	#[error("Unable to build token record.")]
	TokenBuild(#[from] crate::token::TokenRecordBuilderError),
}

/// Reason code attached to every [`InvalidToken`] error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidReason {
	/// No record exists for the presented token.
	NotFound,
	/// The record exists but was issued for another token type.
	WrongType,
	/// The record has been soft-deleted.
	Deleted,
	/// The record passed its expiry deadline.
	Expired,
	/// The requested cost exceeds the remaining quota.
	QuotaExceeded,
}
impl InvalidReason {
	/// Returns a stable label suitable for span, metric, or response fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			InvalidReason::NotFound => "not_found",
			InvalidReason::WrongType => "wrong_type",
			InvalidReason::Deleted => "deleted",
			InvalidReason::Expired => "expired",
			InvalidReason::QuotaExceeded => "quota_exceeded",
		}
	}

	/// Caller-facing message. Missing and mistyped tokens are indistinguishable here.
	pub const fn message(self) -> &'static str {
		match self {
			InvalidReason::NotFound | InvalidReason::WrongType | InvalidReason::Deleted =>
				"Invalid token.",
			InvalidReason::Expired => "Token expired.",
			InvalidReason::QuotaExceeded => "Token quota exceeded.",
		}
	}
}
impl Display for InvalidReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// The single "token invalid" error family; adapters branch on [`InvalidToken::reason`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[error("{}", reason.message())]
pub struct InvalidToken {
	/// Why validation failed.
	pub reason: InvalidReason,
}
impl InvalidToken {
	/// Wraps a reason code.
	pub const fn new(reason: InvalidReason) -> Self {
		Self { reason }
	}
}
impl From<InvalidReason> for Error {
	fn from(reason: InvalidReason) -> Self {
		Self::Invalid(InvalidToken::new(reason))
	}
}
