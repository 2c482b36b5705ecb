//! Authenticated HTTP gateway: bearer cookies on every request, one shared refresh per expiry
//! episode, and ordered replay of every request that failed while the credential was stale.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod http;
pub mod obs;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and a scripted transport for tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use crate::{
		error::TransportError,
		http::{ApiResponse, HttpTransport, OutboundRequest, TransportFuture},
	};

	/// Boxed responder used by [`ScriptedTransport`].
	pub type Responder = Box<dyn Fn(&OutboundRequest) -> TransportFuture<'static> + Send + Sync>;

	/// In-process transport that answers every request through a caller-supplied responder and
	/// records what was sent.
	pub struct ScriptedTransport {
		responder: Responder,
		sent: Mutex<Vec<OutboundRequest>>,
		calls: AtomicUsize,
	}
	impl ScriptedTransport {
		/// Wraps an async responder.
		pub fn new<F>(responder: F) -> Self
		where
			F: 'static + Fn(&OutboundRequest) -> TransportFuture<'static> + Send + Sync,
		{
			Self { responder: Box::new(responder), sent: Default::default(), calls: AtomicUsize::new(0) }
		}

		/// Returns every request dispatched so far, in order.
		pub fn sent(&self) -> Vec<OutboundRequest> {
			self.sent.lock().clone()
		}

		/// Returns the number of dispatched requests whose path equals `path`.
		pub fn calls_to(&self, path: &str) -> usize {
			self.sent.lock().iter().filter(|request| request.url.path() == path).count()
		}

		/// Returns the total number of dispatched requests.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn execute(&self, request: OutboundRequest) -> TransportFuture<'_> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let future = (self.responder)(&request);

			self.sent.lock().push(request);

			future
		}
	}

	/// Builds a ready future that yields a JSON response.
	pub fn json_response(status: u16, body: serde_json::Value) -> TransportFuture<'static> {
		let response = ApiResponse::new(status, body.to_string().into_bytes())
			.with_header("content-type", "application/json");

		Box::pin(async move { Ok::<_, TransportError>(response) })
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
