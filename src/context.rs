//! Per-request slot holding the most recently validated token record.
//!
//! A [`CurrentToken`] is an explicit value: the hosting runtime creates one per logical request
//! (or per pooled worker), hands it to [`TokenManager::validate_token_in`], and passes it down
//! the call chain. Clones share the same slot. Nothing is stored in ambient global state, so a
//! runtime that reuses a context across requests must call [`CurrentToken::clear`] between uses.
//!
//! [`TokenManager::validate_token_in`]: crate::manager::TokenManager::validate_token_in

// self
use crate::{_prelude::*, token::TokenRecord};

/// Shared, clonable handle to a validated-token slot.
#[derive(Clone, Default)]
pub struct CurrentToken(Arc<RwLock<Option<TokenRecord>>>);
impl CurrentToken {
	/// Creates an empty slot.
	pub fn new() -> Self {
		Self::default()
	}

	/// Copy of the validated record, if any.
	pub fn record(&self) -> Option<TokenRecord> {
		self.0.read().clone()
	}

	/// Raw token string of the validated record, if any.
	pub fn token(&self) -> Option<String> {
		self.0.read().as_ref().map(|record| record.token.expose().to_owned())
	}

	/// Returns `true` once a validation has published a record.
	pub fn is_set(&self) -> bool {
		self.0.read().is_some()
	}

	/// Empties the slot, returning whatever it held.
	pub fn clear(&self) -> Option<TokenRecord> {
		self.0.write().take()
	}

	pub(crate) fn publish(&self, record: TokenRecord) {
		*self.0.write() = Some(record);
	}
}
impl Debug for CurrentToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("CurrentToken").field(&*self.0.read()).finish()
	}
}
