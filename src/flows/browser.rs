//! Loopback browser login (authorization code + PKCE).
//!
//! Each attempt binds an ephemeral `127.0.0.1` port, serves `/auth` and `/auth/callback`
//! on it, and points the user's browser at `/auth`. The attempt resolves with the token
//! delivered by the first valid callback; the port is released before the attempt returns,
//! whatever the outcome.

/// Best-effort launch of the system browser.
pub mod launch;
/// Loopback routes serving the login page and the authorization callback.
pub mod server;
/// Per-attempt state, PKCE material, and the authorization URL.
pub mod session;

pub use server::{CALLBACK_PATH, LOGIN_PATH};
pub use session::{BrowserSession, LOGIN_SCOPES};

// std
use std::net::{Ipv4Addr, SocketAddr};
// crates.io
use tokio::net::TcpListener;
// self
use crate::{
	_prelude::*,
	auth::{IdentityClaims, Token},
	config::OidcConfig,
	error::{ConfigError, TransportError},
	flows::{
		Authenticator, FlowContext, FlowFuture, OidcClient, Verifier,
		signal::{self, AttemptSignal, SignalFuture},
	},
	http::ProviderHttpClient,
	oauth::{CodeExchangeFacade, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{IdTokenVerifier, JwksVerifier},
	verifier,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};
use server::{CallbackServer, CallbackState};

#[cfg(feature = "reqwest")]
/// Browser flow specialized for the crate's default reqwest transport stack.
pub type ReqwestBrowserFlow = BrowserFlow<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Browser login engine.
pub struct BrowserFlow<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	client: OidcClient<C, M>,
	open_browser: bool,
	id_token_verifier: Option<Arc<dyn IdTokenVerifier>>,
	login_url: AttemptSignal<Url>,
}
impl<C, M> BrowserFlow<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a browser flow over an existing client.
	pub fn with_client(client: OidcClient<C, M>) -> Self {
		Self {
			client,
			open_browser: true,
			id_token_verifier: None,
			login_url: AttemptSignal::new(),
		}
	}

	/// Enables or disables launching the system browser.
	pub fn open_browser(mut self, enabled: bool) -> Self {
		self.open_browser = enabled;

		self
	}

	/// Replaces the verifier used for credentials presented to the login page.
	///
	/// Defaults to a [`JwksVerifier`] built from the discovered provider.
	pub fn with_id_token_verifier(mut self, verifier: Arc<dyn IdTokenVerifier>) -> Self {
		self.id_token_verifier = Some(verifier);

		self
	}

	/// Returns the underlying client.
	pub fn client(&self) -> &OidcClient<C, M> {
		&self.client
	}

	/// Resolves to the login URL of the current (or next) attempt.
	pub fn login_url(&self) -> SignalFuture<Url> {
		self.login_url.subscribe(Url::clone)
	}

	/// Runs one browser login attempt.
	pub async fn authenticate_session(&self, ctx: &FlowContext) -> Result<Token> {
		const KIND: FlowKind = FlowKind::Browser;

		let span = FlowSpan::new(KIND, "authenticate_session");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.run_attempt(ctx)).await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}

	async fn run_attempt(&self, ctx: &FlowContext) -> Result<Token> {
		let attempt = self.login_url.begin();

		self.client.config.issuer()?;

		if let Some(reason) = ctx.err() {
			return Err(Error::Cancelled(reason));
		}

		let listener =
			TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.map_err(TransportError::from)?;
		let addr = listener.local_addr().map_err(TransportError::from)?;
		let redirect_uri = loopback_url(addr, CALLBACK_PATH)?;
		let descriptor = self.client.discover(ctx).await?;
		let session =
			BrowserSession::start(&descriptor, &self.client.config.client_id, redirect_uri);
		let facade = CodeExchangeFacade::from_descriptor(
			&descriptor,
			&self.client.config,
			&session.redirect_uri,
			Arc::clone(&self.client.http_client),
			Arc::clone(&self.client.transport_mapper),
		);
		let verifier: Arc<dyn IdTokenVerifier> = match &self.id_token_verifier {
			Some(verifier) => Arc::clone(verifier),
			None => Arc::new(JwksVerifier::from_descriptor(self.client.clone(), &descriptor)),
		};
		let (slot, receiver) = signal::delivery();
		let state = Arc::new(CallbackState { session, facade, verifier, slot });
		let server = CallbackServer::spawn(listener, server::router(state));
		let login_url = loopback_url(addr, LOGIN_PATH)?;

		flow_event!(debug, "Callback server listening.", addr = addr);

		attempt.publish(login_url.clone());

		if self.open_browser {
			if let Err(err) = launch::open(login_url.as_str()) {
				flow_event!(warn, "Failed to open the browser; visit the login URL.", error = err);
			}
		}

		let outcome = tokio::select! {
			reason = ctx.done() => Err(Error::Cancelled(reason)),
			delivered = receiver =>
				delivered.map_err(|_| Error::from(TransportError::CallbackServerStopped)),
		};

		server.stop().await;

		outcome
	}
}
#[cfg(feature = "reqwest")]
impl BrowserFlow<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a browser flow backed by a default reqwest transport.
	pub fn new(config: OidcConfig) -> Self {
		Self::with_client(OidcClient::new(config))
	}
}
impl<C, M> Verifier for BrowserFlow<C, M>
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
impl<C, M> Authenticator for BrowserFlow<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn authenticate<'a>(&'a self, ctx: &'a FlowContext) -> FlowFuture<'a, Token> {
		Box::pin(self.authenticate_session(ctx))
	}
}
impl<C, M> Debug for BrowserFlow<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BrowserFlow")
			.field("client", &self.client)
			.field("open_browser", &self.open_browser)
			.field("custom_id_token_verifier", &self.id_token_verifier.is_some())
			.finish()
	}
}

fn loopback_url(addr: SocketAddr, path: &str) -> Result<Url, ConfigError> {
	Url::parse(&format!("http://{addr}{path}"))
		.map_err(|source| ConfigError::InvalidRedirect { source })
}
