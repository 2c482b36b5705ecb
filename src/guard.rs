//! Server-rendered page guards deciding between rendering and redirecting.
//!
//! [`PageGuard::guest`] keeps signed-in visitors away from guest-only pages (login, sign-up);
//! [`PageGuard::authenticated`] keeps anonymous or under-privileged visitors away from protected
//! pages and turns [`Error::AuthTokenInvalid`] raised while rendering into a fresh login.

// self
use crate::{
	_prelude::*,
	auth::{AccessRequirements, UserClaims, validate_user_permissions},
	config::GatewayConfig,
	obs::{FlowKind, FlowSpan},
	store::{CookieStore, SessionCookies},
};

/// Redirect emitted instead of a page body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
	/// Route to navigate to.
	pub destination: String,
	/// Whether clients may cache the redirect.
	pub permanent: bool,
}
impl Redirect {
	/// Creates a non-permanent redirect.
	pub fn temporary(destination: impl Into<String>) -> Self {
		Self { destination: destination.into(), permanent: false }
	}
}

/// Result of a guarded page: props to render, or a redirect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageOutcome<P> {
	/// Page rendered with these props.
	Props(P),
	/// Page short-circuited with a redirect.
	Redirect(Redirect),
}
impl<P> PageOutcome<P> {
	/// Returns the redirect, if the page did not render.
	pub fn redirect(&self) -> Option<&Redirect> {
		match self {
			Self::Redirect(redirect) => Some(redirect),
			Self::Props(_) => None,
		}
	}

	/// Returns the props, if the page rendered.
	pub fn into_props(self) -> Option<P> {
		match self {
			Self::Props(props) => Some(props),
			Self::Redirect(_) => None,
		}
	}
}

/// Guards page data loaders using the credential cookies of the incoming request.
#[derive(Clone, Debug)]
pub struct PageGuard {
	session: SessionCookies,
	config: Arc<GatewayConfig>,
}
impl PageGuard {
	/// Binds a guard to the request's cookie store.
	pub fn new(config: impl Into<Arc<GatewayConfig>>, cookies: Arc<dyn CookieStore>) -> Self {
		let config = config.into();

		Self { session: SessionCookies::new(cookies, config.cookie_policy.clone()), config }
	}

	/// Runs `page` only for visitors without an access-token cookie; signed-in visitors are
	/// redirected to the dashboard route and `page` never runs.
	pub async fn guest<P, F, Fut>(&self, page: F) -> Result<PageOutcome<P>>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<PageOutcome<P>>>,
	{
		if self.session.access_token().await?.is_some() {
			return Ok(PageOutcome::Redirect(Redirect::temporary(&self.config.dashboard_route)));
		}

		page().await
	}

	/// Runs `page` only for signed-in visitors whose claims satisfy `requirements`.
	///
	/// - No access token: redirect to the login route.
	/// - Token that is not a readable JWT while requirements are set: cookies cleared, redirect to
	///   the login route.
	/// - Claims missing a permission or role: redirect to the dashboard route.
	/// - `page` failing with [`Error::AuthTokenInvalid`]: cookies cleared, redirect to the login
	///   route. Other errors propagate.
	pub async fn authenticated<P, F, Fut>(
		&self,
		requirements: Option<&AccessRequirements>,
		page: F,
	) -> Result<PageOutcome<P>>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<PageOutcome<P>>>,
	{
		let span = FlowSpan::new(FlowKind::Request, "authenticated_page");
		let Some(token) = self.session.access_token().await? else {
			return Ok(self.to_login());
		};

		if let Some(requirements) = requirements {
			match UserClaims::decode(token.expose()) {
				Ok(claims) if validate_user_permissions(&claims, requirements) => {},
				Ok(_) => {
					span.note("visitor lacks the permissions or roles the page requires");

					return Ok(PageOutcome::Redirect(Redirect::temporary(
						&self.config.dashboard_route,
					)));
				},
				Err(_) => {
					span.note("access token claims are unreadable");
					self.session.clear().await?;

					return Ok(self.to_login());
				},
			}
		}

		match page().await {
			Err(Error::AuthTokenInvalid { .. }) => {
				span.note("page rejected the session credential");
				self.session.clear().await?;

				Ok(self.to_login())
			},
			outcome => outcome,
		}
	}

	fn to_login<P>(&self) -> PageOutcome<P> {
		PageOutcome::Redirect(Redirect::temporary(&self.config.login_route))
	}
}
