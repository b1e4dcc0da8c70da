//! RFC 8628 device authorization flow.
//!
//! The flow requests a device code, publishes the user code and verification URI to any
//! subscriber, then polls the token endpoint at the provider's interval until the user
//! approves, the provider refuses, the code expires, or the caller's context ends.

/// Device authorization wire types and polling state.
pub mod session;

pub use session::{
	DEFAULT_POLL_INTERVAL, DEVICE_CODE_GRANT_TYPE, DeviceAnnouncement, DeviceAuthorizationResponse,
	REQUESTED_TOKEN_TYPE,
};

// crates.io
use tokio::time::Instant;
// self
use crate::{
	_prelude::*,
	auth::{IdentityClaims, Token},
	config::OidcConfig,
	flows::{
		Authenticator, FlowContext, FlowFuture, OidcClient, Verifier, common,
		signal::{AttemptSignal, SignalFuture},
	},
	http::ProviderHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{Endpoint, ProviderDescriptor},
	verifier,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};
use session::{DeviceSession, PollOutcome};

#[cfg(feature = "reqwest")]
/// Device flow specialized for the crate's default reqwest transport stack.
pub type ReqwestDeviceFlow = DeviceFlow<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Device-code login engine.
///
/// One attempt runs at a time per instance; callers that share an instance across tasks
/// must serialize [`DeviceFlow::authenticate_session`] themselves.
pub struct DeviceFlow<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	client: OidcClient<C, M>,
	verification_uri_override: Option<String>,
	announcement: AttemptSignal<DeviceAnnouncement>,
}
impl<C, M> DeviceFlow<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a device flow over an existing client.
	pub fn with_client(client: OidcClient<C, M>) -> Self {
		Self { client, verification_uri_override: None, announcement: AttemptSignal::new() }
	}

	/// Replaces the verification URI shown to the user.
	pub fn with_verification_uri(mut self, uri: impl Into<String>) -> Self {
		self.verification_uri_override = Some(uri.into());

		self
	}

	/// Returns the underlying client.
	pub fn client(&self) -> &OidcClient<C, M> {
		&self.client
	}

	/// Resolves to the user code of the current (or next) attempt.
	pub fn device_code(&self) -> SignalFuture<String> {
		self.announcement.subscribe(|announcement| announcement.user_code.clone())
	}

	/// Resolves to the verification URI of the current (or next) attempt.
	pub fn verification_uri(&self) -> SignalFuture<String> {
		self.announcement.subscribe(|announcement| announcement.verification_uri.clone())
	}

	/// Resolves to everything the user needs for the current (or next) attempt.
	pub fn announcement(&self) -> SignalFuture<DeviceAnnouncement> {
		self.announcement.subscribe(DeviceAnnouncement::clone)
	}

	/// Runs one device authorization attempt.
	pub async fn authenticate_session(&self, ctx: &FlowContext) -> Result<Token> {
		const KIND: FlowKind = FlowKind::DeviceCode;

		let span = FlowSpan::new(KIND, "authenticate_session");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let attempt = self.announcement.begin();

				self.client.config.issuer()?;

				let descriptor = self.client.discover(ctx).await?;
				let session = self.request_device_code(ctx, &descriptor).await?;
				let verification_uri = self
					.verification_uri_override
					.clone()
					.unwrap_or_else(|| session.verification_uri.clone());

				attempt.publish(DeviceAnnouncement {
					user_code: session.user_code.clone(),
					verification_uri,
					verification_uri_complete: session.verification_uri_complete.clone(),
				});

				self.poll_for_token(ctx, &descriptor, &session).await
			})
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}

	async fn request_device_code(
		&self,
		ctx: &FlowContext,
		descriptor: &ProviderDescriptor,
	) -> Result<DeviceSession> {
		let url = descriptor.endpoint(Endpoint::DeviceAuthorization)?;
		let config = &self.client.config;
		let mut form = vec![("client_id", config.client_id.as_str())];

		if let Some(secret) = config.client_secret() {
			form.push(("client_secret", secret));
		}

		let request = common::form_request(url, &form)?;
		let issued_at = Instant::now();
		let response = ctx.run(self.client.send(Endpoint::DeviceAuthorization, request)).await?;
		let authorization: DeviceAuthorizationResponse =
			common::decode_success(Endpoint::DeviceAuthorization, &response)?;

		flow_event!(
			debug,
			"Device authorization granted.",
			expires_in = authorization.expires_in,
			interval = authorization.interval.unwrap_or_default(),
		);

		Ok(DeviceSession::new(authorization, issued_at))
	}

	async fn poll_for_token(
		&self,
		ctx: &FlowContext,
		descriptor: &ProviderDescriptor,
		session: &DeviceSession,
	) -> Result<Token> {
		let url = descriptor.endpoint(Endpoint::Token)?;
		let config = &self.client.config;
		let mut form = vec![
			("grant_type", DEVICE_CODE_GRANT_TYPE),
			("requested_token_type", REQUESTED_TOKEN_TYPE),
			("client_id", config.client_id.as_str()),
		];

		if let Some(secret) = config.client_secret() {
			form.push(("client_secret", secret));
		}

		form.push(("device_code", session.device_code.expose()));

		let mut polls = 0_u32;

		loop {
			let request = common::form_request(url, &form)?;
			let response = ctx.run(self.client.send(Endpoint::Token, request)).await?;

			polls += 1;

			match session::interpret_poll_response(&response)? {
				PollOutcome::Granted(token) => {
					flow_event!(debug, "Device authorization approved.", polls = polls);

					return Ok(token);
				},
				PollOutcome::Pending => {
					if session.expires_before_next_poll(Instant::now()) {
						return Err(Error::DeviceCodeExpired);
					}

					flow_event!(
						debug,
						"Device authorization pending.",
						polls = polls,
						interval_ms = session.poll_interval.as_millis(),
					);

					ctx.sleep(session.poll_interval).await?;
				},
			}
		}
	}
}
#[cfg(feature = "reqwest")]
impl DeviceFlow<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a device flow backed by a default reqwest transport.
	pub fn new(config: OidcConfig) -> Self {
		Self::with_client(OidcClient::new(config))
	}
}
impl<C, M> Verifier for DeviceFlow<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn user_info<'a>(
		&'a self,
		ctx: &'a FlowContext,
		token: &'a Token,
	) -> FlowFuture<'a, IdentityClaims> {
		Box::pin(verifier::user_info(ctx, token, &self.client))
	}
}
impl<C, M> Authenticator for DeviceFlow<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn authenticate<'a>(&'a self, ctx: &'a FlowContext) -> FlowFuture<'a, Token> {
		Box::pin(self.authenticate_session(ctx))
	}
}
impl<C, M> Debug for DeviceFlow<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DeviceFlow")
			.field("client", &self.client)
			.field("verification_uri_override", &self.verification_uri_override)
			.finish()
	}
}
