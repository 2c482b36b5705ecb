// self
use crate::obs::{FlowKind, FlowOutcome};

/// Counts one flow outcome on `auth_gateway_flow_total` (when the `metrics` feature is enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"auth_gateway_flow_total",
		"flow" => kind.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Samples how many requests a settled refresh episode released on
/// `auth_gateway_refresh_queue_depth`.
pub fn record_queue_depth(drained: usize) {
	#[cfg(feature = "metrics")]
	metrics::histogram!("auth_gateway_refresh_queue_depth").record(drained as f64);
	#[cfg(not(feature = "metrics"))]
	let _ = drained;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_accept_every_label_without_a_global_recorder() {
		for kind in
			[FlowKind::Request, FlowKind::Refresh, FlowKind::Replay, FlowKind::SignIn, FlowKind::SignOut]
		{
			record_flow_outcome(kind, FlowOutcome::Attempt);
			record_flow_outcome(kind, FlowOutcome::Failure);
		}

		record_queue_depth(0);
		record_queue_depth(3);
	}
}
