//! Signs in through the system browser against a real provider.
//!
//! Configure the provider with `OIDC_ISSUER` and `OIDC_CLIENT_ID` (plus `OIDC_CLIENT_SECRET`
//! for confidential clients), and register `http://127.0.0.1/*` as a redirect URI.

// std
use std::{env, time::Duration};
// crates.io
use color_eyre::{Result, eyre::eyre};
// self
use oidc_login::{BrowserFlow, FlowContext, OidcConfig, Verifier};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let issuer = env::var("OIDC_ISSUER").map_err(|_| eyre!("OIDC_ISSUER is not set."))?;
	let client_id = env::var("OIDC_CLIENT_ID").map_err(|_| eyre!("OIDC_CLIENT_ID is not set."))?;
	let mut config = OidcConfig::new(issuer, client_id);

	if let Ok(secret) = env::var("OIDC_CLIENT_SECRET") {
		config = config.with_client_secret(secret);
	}

	let flow = BrowserFlow::new(config);
	let login_url = flow.login_url();

	tokio::spawn(async move {
		if let Some(url) = login_url.await {
			println!("If no browser opened, visit {url} to sign in.");
		}
	});

	let ctx = FlowContext::with_timeout(Duration::from_secs(300));
	let token = flow.authenticate_session(&ctx).await?;
	let claims = flow.user_info(&ctx, &token).await?;

	println!("Signed in as {} ({}).", claims.username(), claims.id());

	Ok(())
}
