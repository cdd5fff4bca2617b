// self
use crate::obs::{CacheEvent, OpKind, OpOutcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"suitecrm_client_op_total",
			"op" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a response cache event via the global metrics recorder (when enabled).
pub fn record_cache_event(event: CacheEvent) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("suitecrm_client_cache_total", "event" => event.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = event;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_noop_without_metrics() {
		record_op_outcome(OpKind::Refresh, OpOutcome::Failure);
		record_cache_event(CacheEvent::Evict);
	}
}
