//! Transport-agnostic glue that protects a handler behind token validation.
//!
//! A [`TokenGuard`] extracts the token from a request, validates it through the
//! [`TokenManager`], and only then runs the protected handler with a populated
//! [`CurrentToken`]. Failures short-circuit into a [`Rejection`] carrying a transport status
//! chosen by a [`StatusMapper`]; adapters for a concrete framework translate that into their
//! own response type.

pub mod extract;

pub use extract::*;

// self
use crate::{
	_prelude::*,
	context::CurrentToken,
	error::InvalidReason,
	manager::{TokenManager, ValidateRequest},
	obs,
	token::{DEFAULT_TOKEN_TYPE, TokenRecord},
};

/// Why a guarded request was turned away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectionKind {
	/// The request carried no token.
	MissingToken,
	/// The token failed validation.
	Invalid(InvalidReason),
	/// Storage or configuration failure unrelated to the caller's token.
	Internal,
}

/// Short-circuit outcome of a guarded request.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{message}")]
pub struct Rejection {
	/// Classified failure.
	pub kind: RejectionKind,
	/// Transport status chosen by the guard's [`StatusMapper`].
	pub status: u16,
	/// Caller-safe message.
	pub message: String,
}

/// Maps a [`RejectionKind`] to a transport status code.
pub trait StatusMapper
where
	Self: Send + Sync,
{
	/// Status for the given failure.
	fn status(&self, kind: RejectionKind) -> u16;
}
impl<F> StatusMapper for F
where
	F: Fn(RejectionKind) -> u16 + Send + Sync,
{
	fn status(&self, kind: RejectionKind) -> u16 {
		self(kind)
	}
}

/// `401` for every caller-side failure, `500` for internal ones.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultStatusMapper;
impl StatusMapper for DefaultStatusMapper {
	fn status(&self, kind: RejectionKind) -> u16 {
		match kind {
			RejectionKind::MissingToken | RejectionKind::Invalid(_) => 401,
			RejectionKind::Internal => 500,
		}
	}
}

/// Validates requests before handing them to a protected handler.
pub struct TokenGuard<Request> {
	manager: TokenManager,
	extractor: Box<dyn TokenExtractor<Request>>,
	mapper: Box<dyn StatusMapper>,
	token_type: String,
	cost: u32,
	deduct: bool,
}
impl<Request> TokenGuard<Request> {
	/// Creates a guard for the default token type that deducts one unit per request.
	pub fn new(manager: TokenManager, extractor: impl TokenExtractor<Request> + 'static) -> Self {
		Self {
			manager,
			extractor: Box::new(extractor),
			mapper: Box::new(DefaultStatusMapper),
			token_type: DEFAULT_TOKEN_TYPE.into(),
			cost: 1,
			deduct: true,
		}
	}

	/// Restricts the guard to tokens of `token_type`.
	pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = token_type.into();

		self
	}

	/// Sets the quota cost charged per request.
	pub fn with_cost(mut self, cost: u32) -> Self {
		self.cost = cost;

		self
	}

	/// Controls whether the cost is committed or only checked.
	pub fn with_deduct(mut self, deduct: bool) -> Self {
		self.deduct = deduct;

		self
	}

	/// Replaces the status mapping.
	pub fn with_status_mapper(mut self, mapper: impl StatusMapper + 'static) -> Self {
		self.mapper = Box::new(mapper);

		self
	}

	/// Extracts and validates the request's token, returning a populated context.
	pub async fn authorize(&self, request: &Request) -> Result<CurrentToken, Rejection> {
		let current = CurrentToken::new();

		self.authorize_in(&current, request).await?;

		Ok(current)
	}

	/// Like [`authorize`](Self::authorize) but publishes into a caller-owned context.
	pub async fn authorize_in(
		&self,
		current: &CurrentToken,
		request: &Request,
	) -> Result<TokenRecord, Rejection> {
		let token = self
			.extractor
			.extract_token(request)
			.map_err(|e| self.reject(RejectionKind::MissingToken, e.to_string()))?;
		let validate = ValidateRequest::new(token)
			.with_token_type(self.token_type.as_str())
			.with_cost(self.cost)
			.with_deduct(self.deduct);

		self.manager.validate_token_in(current, validate).await.map_err(|e| match e {
			Error::Invalid(invalid) =>
				self.reject(RejectionKind::Invalid(invalid.reason), invalid.to_string()),
			_ => self.reject(RejectionKind::Internal, "Internal error.".into()),
		})
	}

	/// Runs `handler` only when the request carries a valid token.
	pub async fn call<F, Fut, T>(&self, request: &Request, handler: F) -> Result<T, Rejection>
	where
		F: FnOnce(CurrentToken) -> Fut,
		Fut: Future<Output = T>,
	{
		let current = self.authorize(request).await?;

		Ok(handler(current).await)
	}

	/// Runs a fallible handler; when it fails, the deducted cost is refunded.
	///
	/// Refund failures are logged and never mask the handler's own error.
	pub async fn try_call<F, Fut, T, E>(
		&self,
		request: &Request,
		handler: F,
	) -> Result<Result<T, E>, Rejection>
	where
		F: FnOnce(CurrentToken) -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		let current = CurrentToken::new();
		let record = self.authorize_in(&current, request).await?;
		let outcome = handler(current).await;
		let charged = self.deduct && self.cost > 0 && !record.quota.is_unlimited();

		if outcome.is_err() && charged {
			let refund = self.manager.refund_quota(record.token.expose(), self.cost).await;

			if let Err(e) = refund {
				obs::log_refund_failure(&e);
			}
		}

		Ok(outcome)
	}

	fn reject(&self, kind: RejectionKind, message: String) -> Rejection {
		Rejection { kind, status: self.mapper.status(kind), message }
	}
}
impl<Request> Debug for TokenGuard<Request> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenGuard")
			.field("token_type", &self.token_type)
			.field("cost", &self.cost)
			.field("deduct", &self.deduct)
			.finish()
	}
}
