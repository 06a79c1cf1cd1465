// self
use crate::{
	_prelude::*,
	error::InvalidReason,
	obs::TokenOp,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// A span builder used by manager operations.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(op: TokenOp, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("token_warden.op", op = op.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (op, stage);

			Self {}
		}
	}

	/// Creates a span that also carries the fingerprint of the token being handled.
	pub fn for_token(op: TokenOp, stage: &'static str, token: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let token_fp = crate::token::fingerprint(token);
			let span = tracing::info_span!(
				"token_warden.op",
				op = op.as_str(),
				stage,
				token_fp = token_fp.as_str()
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (op, stage, token);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event for a rejected validation inside the current span.
pub fn log_rejection(reason: InvalidReason) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(reason = reason.as_str(), "token rejected");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = reason;
	}
}

/// Emits a debug event when a generated candidate collides with an existing token.
pub fn log_collision(attempt: u32) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(attempt, "generated token collided; resampling");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = attempt;
	}
}

/// Emits a debug event after retired records were removed.
pub fn log_purge(purged: usize) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(purged, "retired tokens purged");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = purged;
	}
}

/// Emits a warning when returning quota to a token fails.
pub fn log_refund_failure(error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(error = %error, "quota refund failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}
