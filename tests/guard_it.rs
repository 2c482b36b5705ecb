#![cfg(feature = "reqwest")]

// std
use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use httpmock::prelude::*;
use serde_json::json;
// self
use auth_gateway::{
	auth::AccessRequirements,
	config::GatewayConfig,
	error::Error,
	gateway::{ExecutionContext, ReqwestGateway},
	guard::{PageGuard, PageOutcome, Redirect},
	store::MemoryStore,
	url::Url,
};

const MAX_AGE_DAYS: i64 = 30;

fn jwt(claims: serde_json::Value) -> String {
	let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
	let payload = URL_SAFE_NO_PAD.encode(claims.to_string());

	format!("{header}.{payload}.signature")
}

fn request_cookies(access: &str) -> Arc<MemoryStore> {
	Arc::new(MemoryStore::from_cookie_header(
		&format!("theme=dark; nextauth.token={access}; nextauth.refreshToken=ref1"),
		time::Duration::days(MAX_AGE_DAYS),
	))
}

fn metrics_reader() -> AccessRequirements {
	AccessRequirements::new().permissions(["metrics.list"]).roles(["administrator", "editor"])
}

#[tokio::test]
async fn guest_page_redirects_signed_in_visitors() {
	let config = GatewayConfig::local().expect("Local config should validate.");
	let guard = PageGuard::new(config, request_cookies("tok1"));
	let rendered = AtomicBool::new(false);
	let flag = &rendered;
	let outcome = guard
		.guest(move || async move {
			flag.store(true, Ordering::SeqCst);

			Ok(PageOutcome::Props("login form"))
		})
		.await
		.expect("Guest guard should not fail.");

	assert_eq!(outcome, PageOutcome::Redirect(Redirect::temporary("/dashboard")));
	assert!(!rendered.load(Ordering::SeqCst), "Signed-in visitors must never see the page.");
}

#[tokio::test]
async fn guest_page_renders_for_anonymous_visitors() {
	let config = GatewayConfig::local().expect("Local config should validate.");
	let jar = MemoryStore::from_cookie_header("theme=dark", time::Duration::days(1));
	let guard = PageGuard::new(config, Arc::new(jar));
	let outcome = guard
		.guest(|| async { Ok(PageOutcome::Props("login form")) })
		.await
		.expect("Guest guard should not fail.");

	assert_eq!(outcome.into_props(), Some("login form"));
}

#[tokio::test]
async fn guest_page_errors_propagate() {
	let config = GatewayConfig::local().expect("Local config should validate.");
	let guard = PageGuard::new(config, Arc::new(MemoryStore::default()));
	let err = guard
		.guest(|| async { Err::<PageOutcome<()>, _>(Error::SignedOut) })
		.await
		.expect_err("Page failures should reach the caller.");

	assert!(matches!(err, Error::SignedOut));
}

#[tokio::test]
async fn authenticated_page_checks_presence_and_claims() {
	let config = Arc::new(GatewayConfig::local().expect("Local config should validate."));
	let anonymous = PageGuard::new(config.clone(), Arc::new(MemoryStore::default()));
	let outcome = anonymous
		.authenticated(None, || async { Ok(PageOutcome::Props(())) })
		.await
		.expect("Guard should not fail.");

	assert_eq!(outcome.redirect(), Some(&Redirect::temporary("/")));

	let requirements = metrics_reader();
	let editor = jwt(json!({
		"sub": "editor@example.com",
		"permissions": ["metrics.list"],
		"roles": ["editor"]
	}));
	let allowed = PageGuard::new(config.clone(), request_cookies(&editor));
	let outcome = allowed
		.authenticated(Some(&requirements), || async { Ok(PageOutcome::Props("metrics")) })
		.await
		.expect("Guard should not fail.");

	assert_eq!(outcome, PageOutcome::Props("metrics"));

	let viewer =
		jwt(json!({ "sub": "viewer@example.com", "permissions": [], "roles": ["editor"] }));
	let jar = request_cookies(&viewer);
	let denied = PageGuard::new(config.clone(), jar.clone());
	let outcome = denied
		.authenticated(Some(&requirements), || async { Ok(PageOutcome::Props("metrics")) })
		.await
		.expect("Guard should not fail.");

	assert_eq!(outcome.redirect(), Some(&Redirect::temporary("/dashboard")));
	assert!(jar.set_cookie_headers().is_empty(), "Missing permissions keep the session.");

	let jar = request_cookies("not-a-jwt");
	let unreadable = PageGuard::new(config, jar.clone());
	let outcome = unreadable
		.authenticated(Some(&requirements), || async { Ok(PageOutcome::Props("metrics")) })
		.await
		.expect("Guard should not fail.");

	assert_eq!(outcome.redirect(), Some(&Redirect::temporary("/")));
	assert_eq!(jar.names(), ["theme"]);
}

#[tokio::test]
async fn metrics_page_signs_out_when_api_rejects_session() {
	let server = MockServer::start_async().await;
	let me = server
		.mock_async(|when, then| {
			when.method(GET).path("/me").header("authorization", "Bearer tok-revoked");
			then.status(401)
				.header("content-type", "application/json")
				.json_body(json!({ "code": "token.invalid", "message": "Invalid token." }));
		})
		.await;
	let config = GatewayConfig::builder(
		Url::parse(&server.base_url()).expect("Mock server base URL should parse."),
	)
	.build()
	.expect("Gateway config fixture should validate.");
	let jar = request_cookies("tok-revoked");
	let guard = PageGuard::new(config.clone(), jar.clone());
	let page_jar = jar.clone();
	let outcome = guard
		.authenticated(None, move || async move {
			let gateway = ReqwestGateway::with_reqwest(config, page_jar)?
				.context(ExecutionContext::ServerRendered)
				.build()
				.await?;
			let profile = gateway.get("/me").await?;

			Ok::<_, Error>(PageOutcome::Props(profile.text()))
		})
		.await
		.expect("Guard should translate the rejected session into a redirect.");

	me.assert_async().await;

	assert_eq!(outcome, PageOutcome::Redirect(Redirect::temporary("/")));
	assert_eq!(jar.names(), ["theme"]);
	assert_eq!(
		jar.set_cookie_headers(),
		["nextauth.token=; Max-Age=0; Path=/", "nextauth.refreshToken=; Max-Age=0; Path=/"]
	);
}
