//! Session lifecycle: sign-in creates the credential pair, sign-out removes it.

// self
use crate::{
	_prelude::*,
	auth::CredentialPair,
	gateway::Gateway,
	http::{ApiRequest, HttpTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Receives control after the session has been cleared, typically to navigate to the login page.
pub trait SignOutHandler
where
	Self: Send + Sync,
{
	/// Called with the configured login route once the credential cookies are gone.
	fn signed_out(&self, login_route: &str);
}
impl<F> SignOutHandler for F
where
	F: Fn(&str) + Send + Sync,
{
	fn signed_out(&self, login_route: &str) {
		self(login_route)
	}
}

/// Email and password submitted at sign-in.
#[derive(Clone, Serialize)]
pub struct SignInCredentials {
	/// Account email.
	pub email: String,
	/// Account password.
	pub password: String,
}
impl SignInCredentials {
	/// Creates a credential submission.
	pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
		Self { email: email.into(), password: password.into() }
	}
}
impl Debug for SignInCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SignInCredentials")
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Signed-in user as reported by the sessions endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
	/// Account email.
	pub email: String,
	/// Permissions granted to the user.
	pub permissions: Vec<String>,
	/// Roles granted to the user.
	pub roles: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
	token: String,
	refresh_token: String,
	#[serde(default)]
	permissions: Vec<String>,
	#[serde(default)]
	roles: Vec<String>,
}

impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Exchanges email and password for a credential pair, stores it, and makes the new access
	/// token the default bearer.
	///
	/// The sessions call bypasses interception: a `401` here means bad credentials and is returned
	/// as [`Error::Status`].
	pub async fn sign_in(&self, credentials: &SignInCredentials) -> Result<SessionUser> {
		const KIND: FlowKind = FlowKind::SignIn;

		let span = FlowSpan::new(KIND, "sign_in");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request = ApiRequest::post(self.config.sessions_path.as_str()).json(credentials)?;
				let response = self.dispatch(&request, None).await?;

				if !response.is_success() {
					return Err(Error::Status(response));
				}

				let session: SessionResponse = response.json()?;
				let pair = CredentialPair::issue(
					session.token,
					session.refresh_token,
					OffsetDateTime::now_utc(),
					self.config.cookie_policy.max_age,
				);

				self.session.save(&pair).await?;
				*self.default_bearer.write() = Some(pair.access_token);

				Ok(SessionUser {
					email: credentials.email.clone(),
					permissions: session.permissions,
					roles: session.roles,
				})
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Clears the credential cookies and default bearer, then notifies the sign-out handler.
	pub async fn sign_out(&self) -> Result<()> {
		const KIND: FlowKind = FlowKind::SignOut;

		let span = FlowSpan::new(KIND, "sign_out");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.default_bearer.write().take();
				self.session.clear().await?;

				if let Some(handler) = self.sign_out_handler.as_ref() {
					handler.signed_out(&self.config.login_route);
				}

				Ok(())
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn credentials_debug_hides_password() {
		let rendered = format!("{:?}", SignInCredentials::new("diego@example.com", "123456"));

		assert!(rendered.contains("diego@example.com"));
		assert!(!rendered.contains("123456"));
	}

	#[test]
	fn closures_are_sign_out_handlers() {
		let visited = Arc::new(Mutex::new(Vec::new()));
		let sink = visited.clone();
		let handler = move |route: &str| sink.lock().push(route.to_owned());

		handler.signed_out("/");

		assert_eq!(*visited.lock(), ["/"]);
	}
}
