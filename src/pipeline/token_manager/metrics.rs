// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for token acquisitions.
#[derive(Debug, Default)]
pub struct TokenMetrics {
	logins: AtomicU64,
	refreshes: AtomicU64,
	reuses: AtomicU64,
	failures: AtomicU64,
}
impl TokenMetrics {
	/// Returns the number of successful first-time logins.
	pub fn logins(&self) -> u64 {
		self.logins.load(Ordering::Relaxed)
	}

	/// Returns the number of successful refreshes.
	pub fn refreshes(&self) -> u64 {
		self.refreshes.load(Ordering::Relaxed)
	}

	/// Returns how often a waiting caller reused a token another caller had just fetched.
	pub fn reuses(&self) -> u64 {
		self.reuses.load(Ordering::Relaxed)
	}

	/// Returns the number of failed token endpoint calls.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	/// Returns the number of token endpoint calls, successful or not.
	pub fn exchanges(&self) -> u64 {
		self.logins() + self.refreshes() + self.failures()
	}

	pub(crate) fn record_login(&self) {
		self.logins.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh(&self) {
		self.refreshes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_reuse(&self) {
		self.reuses.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
