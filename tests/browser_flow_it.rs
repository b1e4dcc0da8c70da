#![cfg(feature = "reqwest")]

// std
use std::{net::SocketAddr, sync::Arc, time::Duration};
// crates.io
use httpmock::prelude::*;
use reqwest::{Client, StatusCode, header::LOCATION, redirect::Policy};
use serde_json::json;
// self
use oidc_login::{
	BrowserFlow, Error, FlowContext, IdTokenVerifier, OidcConfig, Token,
	auth::IdentityClaims,
	error::{CancelReason, VerificationError},
	flows::ReqwestBrowserFlow,
	provider::VerifyFuture,
	url::Url,
};

const CLIENT_ID: &str = "cli";

/// Accepts exactly one credential.
struct AcceptOnly(&'static str);
impl IdTokenVerifier for AcceptOnly {
	fn verify<'a>(&'a self, raw: &'a str) -> VerifyFuture<'a> {
		Box::pin(async move {
			if raw == self.0 {
				Ok(IdentityClaims::new())
			} else {
				Err(VerificationError::MissingKeyId.into())
			}
		})
	}
}

async fn provider() -> MockServer {
	let server = MockServer::start_async().await;
	let issuer = server.base_url();

	server
		.mock_async(|when, then| {
			when.method(GET).path("/.well-known/openid-configuration");
			then.status(200).header("content-type", "application/json").json_body(json!({
				"issuer": issuer,
				"authorization_endpoint": format!("{issuer}/authorize"),
				"token_endpoint": format!("{issuer}/token"),
				"userinfo_endpoint": format!("{issuer}/userinfo"),
				"jwks_uri": format!("{issuer}/certs")
			}));
		})
		.await;

	server
}

fn flow(server: &MockServer) -> ReqwestBrowserFlow {
	BrowserFlow::new(OidcConfig::new(server.base_url(), CLIENT_ID))
		.open_browser(false)
		.with_id_token_verifier(Arc::new(AcceptOnly("good")))
}

fn browser() -> Client {
	Client::builder().redirect(Policy::none()).build().expect("Test browser should build.")
}

fn socket_addr(url: &Url) -> SocketAddr {
	url.socket_addrs(|| None)
		.expect("Login URL should resolve.")
		.into_iter()
		.next()
		.expect("Login URL should have an address.")
}

async fn authorize_state(browser: &Client, login_url: &Url) -> (Url, String) {
	let response = browser.get(login_url.clone()).send().await.expect("Login page should answer.");

	assert_eq!(response.status(), StatusCode::FOUND);

	let location = response
		.headers()
		.get(LOCATION)
		.and_then(|value| value.to_str().ok())
		.and_then(|value| Url::parse(value).ok())
		.expect("Login redirect should carry a location.");
	let state = location
		.query_pairs()
		.find(|(key, _)| key == "state")
		.map(|(_, value)| value.into_owned())
		.expect("Authorization URL should carry a state.");

	(location, state)
}

fn callback_url(login_url: &Url, state: &str, code: &str) -> Url {
	let mut url = login_url.join("/auth/callback").expect("Callback URL should build.");

	url.query_pairs_mut().append_pair("state", state).append_pair("code", code);

	url
}

#[tokio::test]
async fn valid_callback_delivers_token_and_releases_port() {
	let server = provider().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").json_body(json!({
				"access_token": "AT1",
				"token_type": "bearer",
				"expires_in": 300,
				"id_token": "ID1"
			}));
		})
		.await;
	let flow = flow(&server);
	let login_url = flow.login_url();
	let ctx = FlowContext::with_timeout(Duration::from_secs(30));
	let (result, addr) = tokio::join!(flow.authenticate_session(&ctx), async {
		let login_url = login_url.await.expect("Login URL should be published.");
		let browser = browser();
		let (location, state) = authorize_state(&browser, &login_url).await;

		assert_eq!(location.path(), "/authorize");

		let pairs: std::collections::HashMap<_, _> = location.query_pairs().into_owned().collect();

		assert_eq!(pairs.get("client_id").map(String::as_str), Some(CLIENT_ID));
		assert_eq!(pairs.get("scope").map(String::as_str), Some("openid profile email"));
		assert_eq!(pairs.get("code_challenge_method").map(String::as_str), Some("S256"));
		assert_eq!(
			pairs.get("redirect_uri").map(String::as_str),
			Some(login_url.join("/auth/callback").expect("Callback URL should build.").as_str())
		);

		let response = browser
			.get(callback_url(&login_url, &state, "C1"))
			.send()
			.await
			.expect("Callback should answer.");

		assert_eq!(response.status(), StatusCode::OK);

		socket_addr(&login_url)
	});
	let token: Token = result.expect("Browser login should succeed.");

	assert_eq!(token.access_token.expose(), "AT1");
	assert_eq!(token.authorization_header(), "Bearer AT1");
	token_mock.assert_calls_async(1).await;
	assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn forged_state_is_rejected_without_exchange() {
	let server = provider().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(500);
		})
		.await;
	let flow = flow(&server);
	let login_url = flow.login_url();
	let ctx = FlowContext::with_timeout(Duration::from_secs(30));
	let (result, addr) = tokio::join!(flow.authenticate_session(&ctx), async {
		let login_url = login_url.await.expect("Login URL should be published.");
		let browser = browser();
		let response = browser
			.get(callback_url(&login_url, "forged", "C1"))
			.send()
			.await
			.expect("Callback should answer.");

		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
		assert_eq!(response.text().await.expect("Body should read."), "state did not match");

		let response = browser
			.get(login_url.join("/auth/callback/").expect("Callback URL should build."))
			.send()
			.await
			.expect("Callback should answer.");

		assert_eq!(response.status(), StatusCode::BAD_REQUEST);

		ctx.cancel();

		socket_addr(&login_url)
	});

	assert!(matches!(result, Err(Error::Cancelled(CancelReason::Cancelled))));
	token_mock.assert_calls_async(0).await;
	assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn deadline_ends_attempt_and_closes_listener() {
	let server = provider().await;
	let flow = flow(&server);
	let login_url = flow.login_url();
	let ctx = FlowContext::with_timeout(Duration::from_millis(500));
	let (result, login_url) = tokio::join!(flow.authenticate_session(&ctx), login_url);
	let login_url = login_url.expect("Login URL should have been published.");

	assert!(matches!(result, Err(Error::Cancelled(CancelReason::DeadlineExceeded))));
	assert!(tokio::net::TcpStream::connect(socket_addr(&login_url)).await.is_err());
}

#[tokio::test]
async fn login_page_checks_presented_credentials() {
	let server = provider().await;
	let flow = flow(&server);
	let login_url = flow.login_url();
	let ctx = FlowContext::with_timeout(Duration::from_secs(30));
	let (result, ()) = tokio::join!(flow.authenticate_session(&ctx), async {
		let login_url = login_url.await.expect("Login URL should be published.");
		let browser = browser();
		let send = |value: &'static str| {
			browser.get(login_url.clone()).header("authorization", value).send()
		};

		assert_eq!(
			send("Bearer good").await.expect("Login page should answer.").status(),
			StatusCode::OK
		);
		assert_eq!(
			send("Bearer bad").await.expect("Login page should answer.").status(),
			StatusCode::FOUND
		);
		assert_eq!(
			send("Bearer").await.expect("Login page should answer.").status(),
			StatusCode::BAD_REQUEST
		);
		assert_eq!(
			send("Bearer good extra").await.expect("Login page should answer.").status(),
			StatusCode::BAD_REQUEST
		);

		let slash = browser
			.get(login_url.join("/auth/").expect("Login URL should build."))
			.send()
			.await
			.expect("Login page should answer.");

		assert_eq!(slash.status(), StatusCode::FOUND);

		ctx.cancel();
	});

	assert!(matches!(result, Err(Error::Cancelled(CancelReason::Cancelled))));
}

#[tokio::test]
async fn provider_refusal_on_callback_is_reported_to_the_browser() {
	let server = provider().await;
	let flow = flow(&server);
	let login_url = flow.login_url();
	let ctx = FlowContext::with_timeout(Duration::from_secs(30));
	let (result, ()) = tokio::join!(flow.authenticate_session(&ctx), async {
		let login_url = login_url.await.expect("Login URL should be published.");
		let browser = browser();
		let (_, state) = authorize_state(&browser, &login_url).await;
		let mut url = login_url.join("/auth/callback").expect("Callback URL should build.");

		url.query_pairs_mut().append_pair("state", &state).append_pair("error", "access_denied");

		let response = browser.get(url).send().await.expect("Callback should answer.");

		assert_eq!(response.status(), StatusCode::BAD_REQUEST);

		let mut url = login_url.join("/auth/callback").expect("Callback URL should build.");

		url.query_pairs_mut().append_pair("state", &state);

		let response = browser.get(url).send().await.expect("Callback should answer.");

		assert_eq!(response.status(), StatusCode::BAD_REQUEST);

		ctx.cancel();
	});

	assert!(matches!(result, Err(Error::Cancelled(CancelReason::Cancelled))));
}

#[tokio::test]
async fn failed_exchange_keeps_waiting_for_a_valid_callback() {
	let server = provider().await;
	let mut failing = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400).header("content-type", "application/json").json_body(json!({
				"error": "invalid_grant",
				"error_description": "code already used"
			}));
		})
		.await;
	let flow = flow(&server);
	let login_url = flow.login_url();
	let ctx = FlowContext::with_timeout(Duration::from_secs(30));
	let (result, ()) = tokio::join!(flow.authenticate_session(&ctx), async {
		let login_url = login_url.await.expect("Login URL should be published.");
		let browser = browser();
		let (_, state) = authorize_state(&browser, &login_url).await;
		let response = browser
			.get(callback_url(&login_url, &state, "used"))
			.send()
			.await
			.expect("Callback should answer.");

		assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
		assert!(
			response
				.text()
				.await
				.expect("Body should read.")
				.starts_with("Failed to exchange token:")
		);

		failing.delete_async().await;
		server
			.mock_async(|when, then| {
				when.method(POST).path("/token");
				then.status(200).header("content-type", "application/json").json_body(json!({
					"access_token": "AT2",
					"token_type": "Bearer"
				}));
			})
			.await;

		let response = browser
			.get(callback_url(&login_url, &state, "fresh"))
			.send()
			.await
			.expect("Callback should answer.");

		assert_eq!(response.status(), StatusCode::OK);
	});

	assert_eq!(result.expect("Second callback should succeed.").access_token.expose(), "AT2");
}

#[tokio::test]
async fn oversized_token_lifetime_is_still_delivered() {
	let server = provider().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").json_body(json!({
				"access_token": "AT1",
				"token_type": "Bearer",
				"expires_in": i64::MAX
			}));
		})
		.await;

	let flow = flow(&server);
	let login_url = flow.login_url();
	let ctx = FlowContext::with_timeout(Duration::from_secs(30));
	let (result, status) = tokio::join!(flow.authenticate_session(&ctx), async {
		let login_url = login_url.await.expect("Login URL should be published.");
		let browser = browser();
		let (_, state) = authorize_state(&browser, &login_url).await;

		browser
			.get(callback_url(&login_url, &state, "C1"))
			.send()
			.await
			.expect("Callback should answer.")
			.status()
	});
	let token = result.expect("Browser login should succeed.");

	assert_eq!(status, StatusCode::OK);
	assert_eq!(token.access_token.expose(), "AT1");
	assert_eq!(token.expires_at, None);
}
