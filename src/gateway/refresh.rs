//! Refresh coordination: one refresh call per expiry episode, ordered replay of queued requests.
//!
//! Each [`Gateway`] owns a [`RefreshCoordinator`] holding the in-flight flag and the queue of
//! pending continuations under one lock. The first request that fails with `token.expired`
//! obtains a [`RefreshLease`] and drives the refresh call; every request (the leader included)
//! enqueues a single-resolution [`PendingReplay`] and is resubmitted with the new bearer once the
//! lease settles. Settling clears the flag before any continuation resolves, and dropping an
//! unsettled lease fails the whole queue with [`RefreshError::Abandoned`].

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::mem;
// crates.io
use futures::channel::oneshot;
// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	error::RefreshError,
	gateway::{ExecutionContext, Gateway, unauthorized},
	http::{ApiRequest, ApiResponse, HttpTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Result delivered to every continuation of a refresh episode.
pub type RefreshOutcome = std::result::Result<TokenSecret, RefreshError>;

/// Per-gateway refresh state: the in-flight flag and the pending continuation queue.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
	state: Mutex<RefreshState>,
}
impl RefreshCoordinator {
	/// Returns `true` while a lease is outstanding.
	pub fn is_refreshing(&self) -> bool {
		self.state.lock().in_flight
	}

	/// Number of continuations waiting on the current episode.
	pub fn pending(&self) -> usize {
		self.state.lock().pending.len()
	}

	/// Queues a continuation and, if no refresh is in flight, hands out the lease for a new one.
	pub fn enqueue(&self) -> (PendingReplay, Option<RefreshLease<'_>>) {
		let mut state = self.state.lock();

		self.enqueue_locked(&mut state)
	}

	/// Admits a request that failed with an expired `sent_with` credential.
	///
	/// The decision is taken under the queue lock: when no refresh is in flight and `current`
	/// yields a different credential, the episode that rotated it has already settled and the
	/// request is [`Admission::Stale`]. Otherwise it is queued like [`Self::enqueue`].
	///
	/// A settling episode publishes its credential before clearing the flag, so `current` is
	/// read after the flag.
	pub fn admit<F>(&self, sent_with: Option<&TokenSecret>, current: F) -> Admission<'_>
	where
		F: FnOnce() -> Option<TokenSecret>,
	{
		let mut state = self.state.lock();

		if !state.in_flight {
			if let Some(current) = current() {
				if sent_with != Some(&current) {
					return Admission::Stale(current);
				}
			}
		}

		let (pending, lease) = self.enqueue_locked(&mut state);

		Admission::Queued(pending, lease)
	}

	fn enqueue_locked(&self, state: &mut RefreshState) -> (PendingReplay, Option<RefreshLease<'_>>) {
		let (sender, receiver) = oneshot::channel();

		state.pending.push(sender);

		let lease = if state.in_flight {
			None
		} else {
			state.in_flight = true;

			Some(RefreshLease { coordinator: self, settled: false })
		};

		(PendingReplay(receiver), lease)
	}

	fn drain(&self, outcome: RefreshOutcome) -> usize {
		let pending = {
			let mut state = self.state.lock();

			state.in_flight = false;

			mem::take(&mut state.pending)
		};
		let drained = pending.len();

		for continuation in pending {
			// A dropped receiver means its caller gave up; the rest of the queue still settles.
			let _ = continuation.send(outcome.clone());
		}

		drained
	}
}

/// How a request that failed with an expired credential joins the refresh state.
#[derive(Debug)]
pub enum Admission<'a> {
	/// The credential was already rotated by a settled episode; replay with this one.
	Stale(TokenSecret),
	/// Queued behind the current episode; the lease is present when this request must drive it.
	Queued(PendingReplay, Option<RefreshLease<'a>>),
}

#[derive(Debug, Default)]
struct RefreshState {
	in_flight: bool,
	pending: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Exclusive right to perform the refresh call of the current episode.
#[derive(Debug)]
pub struct RefreshLease<'a> {
	coordinator: &'a RefreshCoordinator,
	settled: bool,
}
impl RefreshLease<'_> {
	/// Ends the episode, delivering `outcome` to every queued continuation in enqueue order.
	///
	/// Returns how many continuations were drained.
	pub fn settle(mut self, outcome: RefreshOutcome) -> usize {
		self.settled = true;

		self.coordinator.drain(outcome)
	}
}
impl Drop for RefreshLease<'_> {
	fn drop(&mut self) {
		if !self.settled {
			self.coordinator.drain(Err(RefreshError::Abandoned));
		}
	}
}

/// Single-resolution continuation of a request queued behind a refresh.
#[derive(Debug)]
pub struct PendingReplay(oneshot::Receiver<RefreshOutcome>);
impl PendingReplay {
	/// Waits for the episode to settle.
	pub async fn wait(self) -> RefreshOutcome {
		self.0.await.unwrap_or(Err(RefreshError::Abandoned))
	}
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
	token: String,
	refresh_token: String,
}

impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Joins (or starts) the refresh episode for a request that failed with `token.expired`, then
	/// replays it with the rotated credential.
	pub(crate) async fn recover(
		&self,
		request: ApiRequest,
		sent_with: Option<TokenSecret>,
	) -> Result<ApiResponse> {
		let span = FlowSpan::new(FlowKind::Refresh, "recover");
		let (pending, lease) =
			match self.refresh.admit(sent_with.as_ref(), || self.default_bearer()) {
				Admission::Stale(current) => {
					span.note("credential already rotated, replaying without a refresh");

					return self.replay(request, current).await;
				},
				Admission::Queued(pending, lease) => (pending, lease),
			};

		if let Some(lease) = lease {
			let outcome = span.instrument(self.refresh_credentials()).await;
			let failed = outcome.is_err();
			let drained = lease.settle(outcome);

			span.settled(drained, !failed);
			obs::record_queue_depth(drained);

			if failed
				&& self.context == ExecutionContext::Interactive
				&& self.sign_out().await.is_err()
			{
				span.note("sign-out after a failed refresh could not clear the credential cookies");
			}
		}

		match pending.wait().await {
			Ok(token) => self.replay(request, token).await,
			Err(err) => Err(match self.context {
				ExecutionContext::Interactive => Error::Refresh(err),
				ExecutionContext::ServerRendered => Error::AuthTokenInvalid { refresh: Some(err) },
			}),
		}
	}

	/// Performs the refresh call and rotates the stored credential.
	async fn refresh_credentials(&self) -> RefreshOutcome {
		const KIND: FlowKind = FlowKind::Refresh;

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result = self.exchange_refresh_token().await;

		match &result {
			Ok(_) => self.refresh_metrics.record_success(),
			Err(_) => self.refresh_metrics.record_failure(),
		}

		obs::record_result(KIND, &result);

		result
	}

	async fn exchange_refresh_token(&self) -> RefreshOutcome {
		let refresh_token = self
			.session
			.refresh_token()
			.await
			.map_err(|e| RefreshError::Storage { message: e.to_string() })?
			.ok_or(RefreshError::MissingRefreshToken)?;
		let body = serde_json::json!({ "refreshToken": refresh_token.expose() });
		let request = ApiRequest::post(self.config.refresh_path.as_str())
			.header("content-type", "application/json")
			.body(body.to_string());
		let bearer = self.default_bearer();
		let response = self
			.dispatch(&request, bearer.as_ref())
			.await
			.map_err(|e| RefreshError::Transport { message: describe(&e) })?;

		if !response.is_success() {
			return Err(RefreshError::Rejected {
				status: response.status,
				code: unauthorized::error_code(&response.body),
			});
		}

		let rotated: RefreshResponse = response
			.json()
			.map_err(|e| RefreshError::MalformedResponse { message: describe(&e) })?;
		let pair = CredentialPair::issue(
			rotated.token,
			rotated.refresh_token,
			OffsetDateTime::now_utc(),
			self.config.cookie_policy.max_age,
		);

		self.session
			.save(&pair)
			.await
			.map_err(|e| RefreshError::Storage { message: e.to_string() })?;
		*self.default_bearer.write() = Some(pair.access_token.clone());

		Ok(pair.access_token)
	}

	/// Resubmits `request` with `token`; a second `401` is never refreshed again.
	async fn replay(&self, request: ApiRequest, token: TokenSecret) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::Replay;

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.refresh_metrics.record_replay();

		let request = request.header("authorization", token.bearer());
		let result = async {
			let response = self.dispatch(&request, Some(&token)).await?;

			if response.is_success() {
				Ok(response)
			} else if response.is_unauthorized() {
				Err(self.reject_unauthorized().await)
			} else {
				Err(Error::Status(response))
			}
		}
		.await;

		obs::record_result(KIND, &result);

		result
	}
}

/// Flattens an error and its sources into one line.
fn describe(err: &dyn StdError) -> String {
	let mut message = err.to_string();
	let mut source = err.source();

	while let Some(cause) = source {
		message.push_str(": ");
		message.push_str(&cause.to_string());

		source = cause.source();
	}

	message
}
