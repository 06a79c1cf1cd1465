// self
use crate::{
	error::InvalidReason,
	obs::{OpOutcome, TokenOp},
};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_op_outcome(op: TokenOp, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"token_warden_op_total",
			"op" => op.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (op, outcome);
	}
}

/// Records a validation rejection via the global metrics recorder (when enabled).
pub fn record_rejection(reason: InvalidReason) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("token_warden_rejection_total", "reason" => reason.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = reason;
	}
}
