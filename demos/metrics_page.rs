//! Demonstrates a server-rendered metrics page: the guard checks the request cookies, the gateway
//! calls the API with the stored bearer, and an expired token is refreshed once and replayed.

// std
use std::sync::Arc;
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
use url::Url;
// self
use auth_gateway::{
	auth::AccessRequirements,
	config::GatewayConfig,
	gateway::{ExecutionContext, ReqwestGateway},
	guard::{PageGuard, PageOutcome},
	store::MemoryStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let expired_token = format!(
		"{}.{}.signature",
		URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#),
		URL_SAFE_NO_PAD.encode(
			json!({
				"sub": "diego@example.com",
				"permissions": ["metrics.list"],
				"roles": ["administrator"]
			})
			.to_string()
		),
	);
	let expired = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/metrics")
				.header("authorization", format!("Bearer {expired_token}"));
			then.status(401)
				.header("content-type", "application/json")
				.json_body(json!({ "code": "token.expired", "message": "Token expired." }));
		})
		.await;
	let metrics = server
		.mock_async(|when, then| {
			when.method(GET).path("/metrics").header("authorization", "Bearer demo-fresh");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "requests": 1280, "errors": 3 }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/refresh").json_body(json!({ "refreshToken": "demo-refresh" }));
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "token": "demo-fresh", "refreshToken": "demo-refresh-2" }));
		})
		.await;
	let config = GatewayConfig::builder(Url::parse(&server.base_url())?).build()?;
	let cookies = Arc::new(MemoryStore::from_cookie_header(
		&format!("nextauth.token={expired_token}; nextauth.refreshToken=demo-refresh"),
		config.cookie_policy.max_age,
	));
	let guard = PageGuard::new(config.clone(), cookies.clone());
	let requirements = AccessRequirements::new().permissions(["metrics.list"]);
	let page_cookies = cookies.clone();
	let outcome = guard
		.authenticated(Some(&requirements), move || async move {
			let gateway = ReqwestGateway::with_reqwest(config, page_cookies)?
				.context(ExecutionContext::ServerRendered)
				.build()
				.await?;
			let body: serde_json::Value = gateway.get("/metrics").await?.json()?;

			Ok::<_, auth_gateway::error::Error>(PageOutcome::Props(body))
		})
		.await?;

	match outcome {
		PageOutcome::Props(props) => println!("Rendered metrics page with props {props}."),
		PageOutcome::Redirect(redirect) => println!("Redirected to {}.", redirect.destination),
	}
	for header in cookies.set_cookie_headers() {
		println!("Set-Cookie: {header}");
	}

	expired.assert_async().await;
	refresh.assert_async().await;
	metrics.assert_async().await;

	Ok(())
}
