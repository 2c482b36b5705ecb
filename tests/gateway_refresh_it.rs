#![cfg(feature = "reqwest")]

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use auth_gateway::{
	auth::CredentialPair,
	config::GatewayConfig,
	error::{Error, RefreshError},
	gateway::{ExecutionContext, ReqwestGateway, SignInCredentials},
	store::{CookieStore, MemoryStore, SessionCookies},
	url::Url,
};

fn config_for(server: &MockServer) -> GatewayConfig {
	GatewayConfig::builder(
		Url::parse(&server.base_url()).expect("Mock server base URL should parse."),
	)
	.request_timeout(std::time::Duration::from_secs(5))
	.build()
	.expect("Gateway config fixture should validate.")
}

async fn seeded_jar(access: &str, refresh: &str) -> Arc<MemoryStore> {
	let jar = Arc::new(MemoryStore::default());

	SessionCookies::new(jar.clone(), Default::default())
		.save(&CredentialPair::issue_now(access, refresh))
		.await
		.expect("Seeding the credential cookies should succeed.");

	jar
}

async fn build_gateway(
	server: &MockServer,
	jar: Arc<MemoryStore>,
	context: ExecutionContext,
) -> ReqwestGateway {
	ReqwestGateway::with_reqwest(config_for(server), jar)
		.expect("Reqwest transport should build.")
		.context(context)
		.build()
		.await
		.expect("Gateway should build from the seeded cookies.")
}

#[tokio::test]
async fn concurrent_expiry_hits_refresh_endpoint_once() {
	let server = MockServer::start_async().await;
	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/metrics").header("authorization", "Bearer tok1");
			then.status(401)
				.header("content-type", "application/json")
				.json_body(json!({ "code": "token.expired", "message": "Token expired." }));
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/metrics").header("authorization", "Bearer tok2");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "metrics": [] }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/refresh")
				.header("authorization", "Bearer tok1")
				.json_body(json!({ "refreshToken": "ref1" }));
			then.status(200)
				.delay(std::time::Duration::from_millis(200))
				.header("content-type", "application/json")
				.json_body(json!({ "token": "tok2", "refreshToken": "ref2" }));
		})
		.await;
	let jar = seeded_jar("tok1", "ref1").await;
	let gateway = build_gateway(&server, jar.clone(), ExecutionContext::Interactive).await;
	let (a, b, c) = futures::join!(
		gateway.get("/metrics"),
		gateway.get("/metrics"),
		gateway.get("/metrics"),
	);

	for response in [a, b, c] {
		assert_eq!(response.expect("Every expired request should be replayed.").status, 200);
	}

	refresh.assert_calls_async(1).await;
	expired.assert_calls_async(3).await;
	fresh.assert_calls_async(3).await;

	assert!(!gateway.is_refreshing());
	assert_eq!(gateway.pending_requests(), 0);
	assert_eq!(gateway.default_bearer().map(|token| token.expose().to_owned()), Some("tok2".into()));
	assert_eq!(gateway.refresh_metrics.attempts(), 1);
	assert_eq!(gateway.refresh_metrics.successes(), 1);

	let token = jar
		.get("nextauth.token")
		.await
		.expect("Cookie lookup should succeed.")
		.expect("Rotated access cookie should be stored.");

	assert_eq!(token.value.expose(), "tok2");
	assert_eq!(token.max_age, time::Duration::days(30));
	assert_eq!(token.path, "/");
}

#[tokio::test]
async fn failed_refresh_rejects_every_waiter_without_resubmitting() {
	let server = MockServer::start_async().await;
	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/metrics");
			then.status(401)
				.header("content-type", "application/json")
				.json_body(json!({ "code": "token.expired" }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/refresh");
			then.status(401)
				.delay(std::time::Duration::from_millis(200))
				.header("content-type", "application/json")
				.json_body(json!({ "code": "token.invalid" }));
		})
		.await;
	let jar = seeded_jar("tok1", "ref1").await;
	let visits = Arc::new(std::sync::Mutex::new(Vec::<String>::new()));
	let sink = visits.clone();
	let gateway = ReqwestGateway::with_reqwest(config_for(&server), jar.clone())
		.expect("Reqwest transport should build.")
		.on_sign_out(move |route: &str| {
			sink.lock().expect("Visit log lock should not be poisoned.").push(route.to_owned())
		})
		.build()
		.await
		.expect("Gateway should build from the seeded cookies.");
	let (a, b) = futures::join!(gateway.get("/metrics"), gateway.get("/metrics"));

	for result in [a, b] {
		match result {
			Err(Error::Refresh(RefreshError::Rejected { status, code })) => {
				assert_eq!(status, 401);
				assert_eq!(code.as_deref(), Some("token.invalid"));
			},
			other => panic!("Unexpected result: {other:?}."),
		}
	}

	refresh.assert_calls_async(1).await;
	expired.assert_calls_async(2).await;

	assert!(jar.names().is_empty());
	assert!(gateway.default_bearer().is_none());
	assert_eq!(*visits.lock().expect("Visit log lock should not be poisoned."), ["/"]);
}

#[tokio::test]
async fn invalid_token_on_server_surfaces_auth_token_invalid() {
	let server = MockServer::start_async().await;
	let me = server
		.mock_async(|when, then| {
			when.method(GET).path("/me");
			then.status(401)
				.header("content-type", "application/json")
				.json_body(json!({ "code": "token.invalid" }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/refresh");
			then.status(200);
		})
		.await;
	let jar = seeded_jar("tok1", "ref1").await;
	let gateway = build_gateway(&server, jar.clone(), ExecutionContext::ServerRendered).await;
	let err = gateway.get("/me").await.expect_err("Invalid token should not be recovered.");

	assert!(matches!(err, Error::AuthTokenInvalid { refresh: None }));
	assert!(err.is_auth_failure());

	me.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	assert_eq!(jar.names().len(), 2);
}

#[tokio::test]
async fn sign_in_then_request_carries_new_bearer() {
	let server = MockServer::start_async().await;
	let sessions = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/sessions")
				.json_body(json!({ "email": "diego@example.com", "password": "123456" }));
			then.status(200).header("content-type", "application/json").json_body(json!({
				"token": "tok-session",
				"refreshToken": "ref-session",
				"permissions": ["users.list", "metrics.list"],
				"roles": ["administrator"]
			}));
		})
		.await;
	let me = server
		.mock_async(|when, then| {
			when.method(GET).path("/me").header("authorization", "Bearer tok-session");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "email": "diego@example.com" }));
		})
		.await;
	let jar = Arc::new(MemoryStore::default());
	let gateway = build_gateway(&server, jar.clone(), ExecutionContext::Interactive).await;
	let user = gateway
		.sign_in(&SignInCredentials::new("diego@example.com", "123456"))
		.await
		.expect("Sign-in should succeed.");

	assert_eq!(user.roles, ["administrator"]);

	let profile: serde_json::Value = gateway
		.get("/me")
		.await
		.expect("Authenticated request should succeed.")
		.json()
		.expect("Profile body should decode.");

	assert_eq!(profile["email"], "diego@example.com");

	sessions.assert_async().await;
	me.assert_async().await;

	assert_eq!(
		jar.set_cookie_headers(),
		[
			"nextauth.token=tok-session; Max-Age=2592000; Path=/",
			"nextauth.refreshToken=ref-session; Max-Age=2592000; Path=/",
		]
	);
}
