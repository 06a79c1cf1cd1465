//! Random token identifier generation.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{_prelude::*, error::ConfigError};

/// Samples fixed-length alphanumeric identifiers from the thread-local CSPRNG.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenGenerator {
	length: usize,
}
impl TokenGenerator {
	/// Length used when callers do not configure one.
	pub const DEFAULT_LENGTH: usize = 16;
	/// Longest identifier the generator will produce.
	pub const MAX_LENGTH: usize = 256;

	/// Creates a generator producing identifiers of `length` characters.
	pub fn new(length: usize) -> Result<Self, ConfigError> {
		if length == 0 || length > Self::MAX_LENGTH {
			return Err(ConfigError::InvalidTokenLength { length, max: Self::MAX_LENGTH });
		}

		Ok(Self { length })
	}

	/// Configured identifier length.
	pub fn length(&self) -> usize {
		self.length
	}

	/// Draws a fresh candidate. Uniqueness is the caller's concern.
	pub fn generate(&self) -> String {
		rand::rng().sample_iter(Alphanumeric).take(self.length).map(char::from).collect()
	}
}
impl Default for TokenGenerator {
	fn default() -> Self {
		Self { length: Self::DEFAULT_LENGTH }
	}
}
