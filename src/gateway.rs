//! Authenticated request gateway.
//!
//! [`Gateway`] wraps an [`HttpTransport`] bound to a base endpoint. Every outbound request
//! carries the current bearer credential; a `401` whose payload reports `token.expired` joins the
//! instance's refresh episode (see [`refresh`]) and is replayed once the shared refresh settles.
//! Any other `401` is unrecoverable and is handled according to the injected
//! [`ExecutionContext`].

pub mod refresh;
pub mod session;
pub mod unauthorized;

pub use refresh::*;
pub use session::*;
pub use unauthorized::*;

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::GatewayConfig,
	http::{ApiRequest, ApiResponse, Headers, HttpTransport, Method, OutboundRequest},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::{CookieStore, SessionCookies},
};
#[cfg(feature = "reqwest")] use crate::{error::ConfigError, http::ReqwestTransport};

#[cfg(feature = "reqwest")]
/// Gateway specialized for the crate's default reqwest transport.
pub type ReqwestGateway = Gateway<ReqwestTransport>;

/// Where the gateway runs, which decides how unrecoverable auth failures surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionContext {
	#[default]
	/// A client that can navigate: failures clear the session and notify the sign-out handler.
	Interactive,
	/// A server renderer: failures surface as [`Error::AuthTokenInvalid`] for the page guard.
	ServerRendered,
}

/// HTTP client that attaches, refreshes, and replays bearer credentials.
///
/// Clones share the same credential, refresh state, and metrics; separately built gateways are
/// fully independent.
pub struct Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Transport used for every outbound request.
	pub transport: Arc<T>,
	/// Validated configuration.
	pub config: Arc<GatewayConfig>,
	/// Execution context injected at construction.
	pub context: ExecutionContext,
	/// Shared counters for refresh episodes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	session: SessionCookies,
	default_bearer: Arc<RwLock<Option<TokenSecret>>>,
	refresh: Arc<RefreshCoordinator>,
	sign_out_handler: Option<Arc<dyn SignOutHandler>>,
}
impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Starts building a gateway over `transport` that reads credentials from `cookies`.
	pub fn builder(
		config: GatewayConfig,
		transport: impl Into<Arc<T>>,
		cookies: Arc<dyn CookieStore>,
	) -> GatewayBuilder<T> {
		GatewayBuilder {
			config,
			transport: transport.into(),
			cookies,
			context: ExecutionContext::default(),
			sign_out_handler: None,
		}
	}

	/// Returns the credential currently attached to new requests.
	pub fn default_bearer(&self) -> Option<TokenSecret> {
		self.default_bearer.read().clone()
	}

	/// Returns `true` while a refresh episode is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.refresh.is_refreshing()
	}

	/// Number of requests waiting on the current refresh episode.
	pub fn pending_requests(&self) -> usize {
		self.refresh.pending()
	}

	/// Credential cookies backing this gateway.
	pub fn session(&self) -> &SessionCookies {
		&self.session
	}

	/// Sends `request`, transparently refreshing and replaying on credential expiry.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::Request;

		let span = FlowSpan::new(KIND, "send");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let sent_with = match request.header_value("authorization") {
					Some(value) => match value.strip_prefix("Bearer ") {
						Some(token) => Some(TokenSecret::new(token)),
						// A caller-supplied non-bearer credential is never refreshed or replaced.
						None => return self.send_as_is(&request).await,
					},
					None => self.default_bearer(),
				};
				let response = self.dispatch(&request, sent_with.as_ref()).await?;

				self.intercept(request, sent_with, response).await
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Sends a `GET` request.
	pub async fn get(&self, path: &str) -> Result<ApiResponse> {
		self.send(ApiRequest::get(path)).await
	}

	/// Sends a `DELETE` request.
	pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
		self.send(ApiRequest::delete(path)).await
	}

	/// Sends a `POST` request with a JSON body.
	pub async fn post<B>(&self, path: &str, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(ApiRequest::post(path).json(body)?).await
	}

	/// Sends a `PUT` request with a JSON body.
	pub async fn put<B>(&self, path: &str, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(ApiRequest::new(Method::Put, path).json(body)?).await
	}

	/// Sends a `PATCH` request with a JSON body.
	pub async fn patch<B>(&self, path: &str, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(ApiRequest::new(Method::Patch, path).json(body)?).await
	}

	async fn send_as_is(&self, request: &ApiRequest) -> Result<ApiResponse> {
		let response = self.dispatch(request, None).await?;

		if response.is_success() { Ok(response) } else { Err(Error::Status(response)) }
	}

	async fn intercept(
		&self,
		request: ApiRequest,
		sent_with: Option<TokenSecret>,
		response: ApiResponse,
	) -> Result<ApiResponse> {
		if response.is_success() {
			return Ok(response);
		}
		if !response.is_unauthorized() {
			return Err(Error::Status(response));
		}

		match UnauthorizedReason::classify(&response.body) {
			UnauthorizedReason::TokenExpired => self.recover(request, sent_with).await,
			UnauthorizedReason::Other { .. } => Err(self.reject_unauthorized().await),
		}
	}

	/// Resolves `request` against the base endpoint and hands it to the transport without any
	/// interception.
	async fn dispatch(
		&self,
		request: &ApiRequest,
		bearer: Option<&TokenSecret>,
	) -> Result<ApiResponse> {
		let url = self.config.endpoint(&request.path)?;
		let mut headers = Headers::new();

		if let Some(bearer) = bearer {
			headers.insert("authorization".into(), bearer.bearer());
		}

		headers.extend(request.headers.iter().map(|(name, value)| (name.clone(), value.clone())));

		let outbound =
			OutboundRequest { method: request.method, url, headers, body: request.body.clone() };

		Ok(self.transport.execute(outbound).await?)
	}

	/// Surfaces an unrecoverable `401` according to the execution context.
	async fn reject_unauthorized(&self) -> Error {
		match self.context {
			ExecutionContext::ServerRendered => Error::AuthTokenInvalid { refresh: None },
			ExecutionContext::Interactive => match self.sign_out().await {
				Ok(()) => Error::SignedOut,
				Err(err) => err,
			},
		}
	}
}
#[cfg(feature = "reqwest")]
impl Gateway<ReqwestTransport> {
	/// Starts building a gateway backed by a reqwest client that honors the configured timeout.
	pub fn with_reqwest(
		config: GatewayConfig,
		cookies: Arc<dyn CookieStore>,
	) -> Result<GatewayBuilder<ReqwestTransport>, ConfigError> {
		let transport = ReqwestTransport::from_config(&config)?;

		Ok(Self::builder(config, transport, cookies))
	}
}
impl<T> Clone for Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			config: self.config.clone(),
			context: self.context,
			refresh_metrics: self.refresh_metrics.clone(),
			session: self.session.clone(),
			default_bearer: self.default_bearer.clone(),
			refresh: self.refresh.clone(),
			sign_out_handler: self.sign_out_handler.clone(),
		}
	}
}
impl<T> Debug for Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gateway")
			.field("base_url", &self.config.base_url.as_str())
			.field("context", &self.context)
			.field("bearer_set", &self.default_bearer.read().is_some())
			.field("refreshing", &self.refresh.is_refreshing())
			.finish()
	}
}

/// Builder returned by [`Gateway::builder`].
pub struct GatewayBuilder<T>
where
	T: ?Sized + HttpTransport,
{
	config: GatewayConfig,
	transport: Arc<T>,
	cookies: Arc<dyn CookieStore>,
	context: ExecutionContext,
	sign_out_handler: Option<Arc<dyn SignOutHandler>>,
}
impl<T> GatewayBuilder<T>
where
	T: ?Sized + HttpTransport,
{
	/// Overrides the execution context (defaults to [`ExecutionContext::Interactive`]).
	pub fn context(mut self, context: ExecutionContext) -> Self {
		self.context = context;

		self
	}

	/// Registers the handler notified after every sign-out.
	pub fn on_sign_out(mut self, handler: impl 'static + SignOutHandler) -> Self {
		self.sign_out_handler = Some(Arc::new(handler));

		self
	}

	/// Reads the stored access token and builds the gateway with it as the default bearer.
	pub async fn build(self) -> Result<Gateway<T>> {
		let session = SessionCookies::new(self.cookies, self.config.cookie_policy.clone());
		let bearer = session.access_token().await?;

		Ok(Gateway {
			transport: self.transport,
			config: Arc::new(self.config),
			context: self.context,
			refresh_metrics: Default::default(),
			session,
			default_bearer: Arc::new(RwLock::new(bearer)),
			refresh: Default::default(),
			sign_out_handler: self.sign_out_handler,
		})
	}
}
impl<T> Debug for GatewayBuilder<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GatewayBuilder")
			.field("base_url", &self.config.base_url.as_str())
			.field("context", &self.context)
			.finish()
	}
}
