//! Userinfo-backed identity verification.
//!
//! An access token is trusted exactly as far as the provider's userinfo endpoint accepts
//! it: the token is presented as `Authorization: Bearer <token>` and the returned JSON
//! object becomes the caller's [`IdentityClaims`].

// self
use crate::{
	_prelude::*,
	auth::{IdentityClaims, Token},
	config::OidcConfig,
	flows::{FlowContext, FlowFuture, OidcClient, Verifier, common},
	http::ProviderHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::Endpoint,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

/// Deadline applied by [`verify`].
pub const VERIFY_TIMEOUT: StdDuration = StdDuration::from_secs(10);

#[cfg(feature = "reqwest")]
/// Userinfo verifier specialized for the crate's default reqwest transport stack.
pub type ReqwestUserInfoVerifier = UserInfoVerifier<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Discovers the provider and fetches the claims `token` is entitled to.
pub async fn user_info<C, M>(
	ctx: &FlowContext,
	token: &Token,
	client: &OidcClient<C, M>,
) -> Result<IdentityClaims>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	const KIND: FlowKind = FlowKind::UserInfo;

	let span = FlowSpan::new(KIND, "user_info");

	obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

	let result = span
		.instrument(async move {
			let descriptor = client.discover(ctx).await?;
			let url = descriptor.endpoint(Endpoint::Userinfo)?;
			let request = common::get_request(url, Some(&token.authorization_header()))?;
			let response = ctx.run(client.send(Endpoint::Userinfo, request)).await?;

			common::decode_success::<IdentityClaims>(Endpoint::Userinfo, &response)
		})
		.await;

	obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

	result
}

/// Verifies a bare access token under [`VERIFY_TIMEOUT`].
pub async fn verify<V>(access_token: &str, verifier: &V) -> Result<IdentityClaims>
where
	V: ?Sized + Verifier,
{
	let token = Token::bearer(access_token);
	let ctx = FlowContext::with_timeout(VERIFY_TIMEOUT);

	verifier.user_info(&ctx, &token).await
}

/// [`Verifier`] that only talks to the userinfo endpoint.
pub struct UserInfoVerifier<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	client: OidcClient<C, M>,
}
impl<C, M> UserInfoVerifier<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a verifier over an existing client.
	pub fn with_client(client: OidcClient<C, M>) -> Self {
		Self { client }
	}

	/// Returns the underlying client.
	pub fn client(&self) -> &OidcClient<C, M> {
		&self.client
	}
}
#[cfg(feature = "reqwest")]
impl UserInfoVerifier<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a verifier backed by a default reqwest transport.
	pub fn new(config: OidcConfig) -> Self {
		Self::with_client(OidcClient::new(config))
	}
}
impl<C, M> Verifier for UserInfoVerifier<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn user_info<'a>(
		&'a self,
		ctx: &'a FlowContext,
		token: &'a Token,
	) -> FlowFuture<'a, IdentityClaims> {
		Box::pin(user_info(ctx, token, &self.client))
	}
}
impl<C, M> Debug for UserInfoVerifier<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("UserInfoVerifier").field("client", &self.client).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	struct Echo;
	impl Verifier for Echo {
		fn user_info<'a>(
			&'a self,
			ctx: &'a FlowContext,
			token: &'a Token,
		) -> FlowFuture<'a, IdentityClaims> {
			Box::pin(async move {
				let mut claims = IdentityClaims::new();

				claims.insert("authorization", token.authorization_header());
				claims.insert("bounded", ctx.deadline().is_some());

				Ok(claims)
			})
		}
	}

	#[tokio::test]
	async fn verify_wraps_token_as_bearer_under_deadline() {
		let claims = verify("AT1", &Echo).await.expect("Echo verifier should succeed.");

		assert_eq!(claims.string("authorization"), "Bearer AT1");
		assert!(claims.flag("bounded"));
	}
}
