//! Login flows and the client they share.

pub mod browser;
pub mod common;
pub mod context;
pub mod device;
pub mod signal;

#[cfg(feature = "reqwest")] pub use browser::ReqwestBrowserFlow;
pub use browser::{BrowserFlow, BrowserSession, CALLBACK_PATH, LOGIN_PATH, LOGIN_SCOPES};
pub use context::*;
#[cfg(feature = "reqwest")] pub use device::ReqwestDeviceFlow;
pub use device::{
	DEFAULT_POLL_INTERVAL, DEVICE_CODE_GRANT_TYPE, DeviceAnnouncement, DeviceAuthorizationResponse,
	DeviceFlow, REQUESTED_TOKEN_TYPE,
};
pub use signal::{OnceSignal, SignalFuture};

// self
use crate::{
	_prelude::*,
	auth::{IdentityClaims, Token},
	config::OidcConfig,
	http::ProviderHttpClient,
	oauth::TransportErrorMapper,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

/// Boxed future returned by the [`Authenticator`] and [`Verifier`] traits.
pub type FlowFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport stack.
pub type ReqwestOidcClient = OidcClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Resolves an access token into the caller's identity claims.
pub trait Verifier: Send + Sync {
	/// Presents `token` to the provider and returns the claims it reports.
	fn user_info<'a>(
		&'a self,
		ctx: &'a FlowContext,
		token: &'a Token,
	) -> FlowFuture<'a, IdentityClaims>;
}

/// Interactive login that yields a token, paired with identity verification.
pub trait Authenticator: Verifier {
	/// Runs one login attempt to completion, failure, or cancellation.
	fn authenticate<'a>(&'a self, ctx: &'a FlowContext) -> FlowFuture<'a, Token>;
}

/// Provider connection shared by every flow: configuration, transport, and error mapping.
pub struct OidcClient<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Provider coordinates and client credentials.
	pub config: OidcConfig,
	/// HTTP client wrapper used for every outbound provider request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
}
impl<C, M> OidcClient<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		config: OidcConfig,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self { config, http_client: http_client.into(), transport_mapper: mapper.into() }
	}

	/// Returns the client configuration.
	pub fn config(&self) -> &OidcConfig {
		&self.config
	}
}
#[cfg(feature = "reqwest")]
impl OidcClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a client backed by a default reqwest transport.
	pub fn new(config: OidcConfig) -> Self {
		Self::with_http_client(
			config,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Clone for OidcClient<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			http_client: Arc::clone(&self.http_client),
			transport_mapper: Arc::clone(&self.transport_mapper),
		}
	}
}
impl<C, M> Debug for OidcClient<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OidcClient").field("config", &self.config).finish()
	}
}
