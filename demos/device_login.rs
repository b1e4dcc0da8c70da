//! Runs the device-code login against a local mock provider, then resolves the token into
//! identity claims through the userinfo endpoint.
//!
//! The mock approves immediately; against a real provider the user would visit the printed
//! verification URI and type the user code while the flow keeps polling.

// std
use std::time::Duration;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use oidc_login::{DeviceFlow, FlowContext, OidcConfig, Verifier};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let issuer = server.base_url();

	server
		.mock_async(|when, then| {
			when.method(GET).path("/.well-known/openid-configuration");
			then.status(200).json_body(json!({
				"issuer": issuer,
				"authorization_endpoint": format!("{issuer}/auth"),
				"token_endpoint": format!("{issuer}/token"),
				"device_authorization_endpoint": format!("{issuer}/auth/device"),
				"userinfo_endpoint": format!("{issuer}/userinfo")
			}));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/device");
			then.status(200).json_body(json!({
				"device_code": "D1",
				"user_code": "WDJB-MJHT",
				"verification_uri": format!("{issuer}/device"),
				"expires_in": 600,
				"interval": 1
			}));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).json_body(json!({
				"access_token": "demo-access",
				"token_type": "Bearer",
				"expires_in": 300
			}));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/userinfo").header("authorization", "Bearer demo-access");
			then.status(200).json_body(json!({
				"sub": "7d1c",
				"preferred_username": "ada",
				"email": "ada@example.com",
				"email_verified": true
			}));
		})
		.await;

	let flow = DeviceFlow::new(OidcConfig::new(issuer, "demo-cli"));
	let announcement = flow.announcement();

	tokio::spawn(async move {
		if let Some(announcement) = announcement.await {
			println!(
				"Visit {} and enter the code {}.",
				announcement.verification_uri, announcement.user_code
			);
		}
	});

	let ctx = FlowContext::with_timeout(Duration::from_secs(60));
	let token = flow.authenticate_session(&ctx).await?;

	println!("Signed in; token type {}.", token.scheme());

	let claims = flow.user_info(&ctx, &token).await?;

	println!(
		"Hello {} <{}> (verified: {}).",
		claims.username(),
		claims.email(),
		claims.email_verified()
	);

	Ok(())
}
