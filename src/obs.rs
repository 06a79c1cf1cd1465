//! Optional observability helpers for manager operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (on by default) to emit structured spans named `token_warden.op` with the
//!   `op` and `stage` fields, plus a `token_fp` fingerprint when a token is involved. Raw
//!   tokens never reach the subscriber.
//! - Enable `metrics` to increment the `token_warden_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`, and `token_warden_rejection_total`
//!   labeled by `reason`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Manager operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenOp {
	/// Token issuance.
	Generate,
	/// Token validation.
	Validate,
	/// Direct quota deduction or refund.
	AdjustQuota,
	/// Record overwrite.
	Update,
	/// Soft deletion.
	Delete,
	/// Hard removal of retired records.
	Purge,
}
impl TokenOp {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenOp::Generate => "generate",
			TokenOp::Validate => "validate",
			TokenOp::AdjustQuota => "adjust_quota",
			TokenOp::Update => "update",
			TokenOp::Delete => "delete",
			TokenOp::Purge => "purge",
		}
	}
}
impl Display for TokenOp {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to a manager operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
