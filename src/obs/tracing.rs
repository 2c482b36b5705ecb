// self
use crate::{_prelude::*, obs::FlowKind};

/// Future returned by [`FlowSpan::instrument`]; instrumented only with the `tracing` feature.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`FlowSpan::instrument`]; instrumented only with the `tracing` feature.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// `auth_gateway.flow` span carrying the flow kind and the call site (`stage`).
///
/// Without the `tracing` feature every method compiles to nothing.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Opens a span for `kind` at `stage`.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			Self { span: tracing::info_span!("auth_gateway.flow", flow = kind.as_str(), stage) }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Runs `fut` inside the span; no guard is held across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			tracing::Instrument::instrument(fut, self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}

	/// Emits a debug event explaining a branch the flow took.
	pub fn note(&self, message: &'static str) {
		#[cfg(feature = "tracing")]
		tracing::debug!(parent: &self.span, "{message}");
		#[cfg(not(feature = "tracing"))]
		let _ = message;
	}

	/// Emits the size of the queue released when a refresh episode settled.
	pub fn settled(&self, drained: usize, succeeded: bool) {
		#[cfg(feature = "tracing")]
		tracing::info!(parent: &self.span, drained, succeeded, "refresh episode settled");
		#[cfg(not(feature = "tracing"))]
		let _ = (drained, succeeded);
	}
}
