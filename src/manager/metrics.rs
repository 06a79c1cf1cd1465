// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for manager activity.
#[derive(Debug, Default)]
pub struct ManagerMetrics {
	issued: AtomicU64,
	collisions: AtomicU64,
	validated: AtomicU64,
	rejected: AtomicU64,
}
impl ManagerMetrics {
	/// Returns the number of tokens issued.
	pub fn issued(&self) -> u64 {
		self.issued.load(Ordering::Relaxed)
	}

	/// Returns how many generated candidates collided with existing tokens.
	pub fn collisions(&self) -> u64 {
		self.collisions.load(Ordering::Relaxed)
	}

	/// Returns the number of successful validations.
	pub fn validated(&self) -> u64 {
		self.validated.load(Ordering::Relaxed)
	}

	/// Returns the number of validations rejected with an invalid-token reason.
	pub fn rejected(&self) -> u64 {
		self.rejected.load(Ordering::Relaxed)
	}

	pub(crate) fn record_issued(&self) {
		self.issued.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_collision(&self) {
		self.collisions.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_validated(&self) {
		self.validated.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_rejected(&self) {
		self.rejected.fetch_add(1, Ordering::Relaxed);
	}
}
