//! Optional observability helpers for token and request operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `suitecrm_client.op` with the `op` (operation
//!   kind) and `stage` (call site) fields.
//! - Enable `metrics` to increment the `suitecrm_client_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`, and the `suitecrm_client_cache_total`
//!   counter labeled by cache `event`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operation kinds observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// First client-credentials exchange of a session.
	Login,
	/// Token re-acquisition after expiry or rejection.
	Refresh,
	/// Authenticated resource request.
	Request,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::Login => "login",
			OpKind::Refresh => "refresh",
			OpKind::Request => "request",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an operation.
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

/// Response cache events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheEvent {
	/// A stored response was returned.
	Hit,
	/// No stored response matched; the call went to the server.
	Miss,
	/// The least recently used entry was dropped to make room.
	Evict,
}
impl CacheEvent {
	/// Returns a stable label suitable for metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheEvent::Hit => "hit",
			CacheEvent::Miss => "miss",
			CacheEvent::Evict => "evict",
		}
	}
}
