//! Usage budgets attached to token records.

// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError};
// self
use crate::_prelude::*;

/// Total validation budget granted to a token.
///
/// Persisted as a signed integer: any negative value (canonically [`Quota::UNLIMITED_SENTINEL`])
/// means "unlimited", non-negative values are finite budgets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Quota {
	/// No budget; validations never consume anything.
	#[default]
	Unlimited,
	/// Finite budget of cost units.
	Limited(u32),
}
impl Quota {
	/// Integer written to storage for [`Quota::Unlimited`].
	pub const UNLIMITED_SENTINEL: i64 = i64::MIN;

	/// Returns `true` when the quota is unlimited.
	pub const fn is_unlimited(self) -> bool {
		matches!(self, Self::Unlimited)
	}

	/// Returns the finite limit, if any.
	pub const fn limit(self) -> Option<u32> {
		match self {
			Self::Unlimited => None,
			Self::Limited(limit) => Some(limit),
		}
	}

	/// Encodes the quota using the persisted integer representation.
	pub const fn to_stored(self) -> i64 {
		match self {
			Self::Unlimited => Self::UNLIMITED_SENTINEL,
			Self::Limited(limit) => limit as i64,
		}
	}

	/// Decodes the persisted integer representation.
	pub fn from_stored(value: i64) -> Result<Self, QuotaRangeError> {
		if value < 0 {
			return Ok(Self::Unlimited);
		}

		u32::try_from(value).map(Self::Limited).map_err(|_| QuotaRangeError { value })
	}

	/// Remaining budget a freshly issued record starts with.
	pub const fn initial_remaining(self) -> i64 {
		match self {
			Self::Unlimited => 0,
			Self::Limited(limit) => limit as i64,
		}
	}

	/// Applies a signed delta to `remaining`, clamping at the limit for finite quotas.
	///
	/// Unlimited quotas ignore the delta.
	pub fn apply_delta(self, remaining: i64, delta: i64) -> i64 {
		match self {
			Self::Unlimited => remaining,
			Self::Limited(limit) => remaining.saturating_add(delta).min(i64::from(limit)),
		}
	}
}
impl From<u32> for Quota {
	fn from(limit: u32) -> Self {
		Self::Limited(limit)
	}
}
impl Display for Quota {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Unlimited => f.write_str("unlimited"),
			Self::Limited(limit) => write!(f, "{limit}"),
		}
	}
}
impl Serialize for Quota {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(self.to_stored())
	}
}
impl<'de> Deserialize<'de> for Quota {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let value = i64::deserialize(deserializer)?;

		Quota::from_stored(value).map_err(DeError::custom)
	}
}

/// Raised when a persisted quota does not fit the supported range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
#[error("Stored quota {value} exceeds the supported range.")]
pub struct QuotaRangeError {
	/// Offending stored value.
	pub value: i64,
}
