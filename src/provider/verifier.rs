//! ID token signature verification against the provider's JSON Web Key Set.

// crates.io
use jsonwebtoken::{
	DecodingKey, Validation, decode, decode_header,
	jwk::{Jwk, JwkSet},
};
// self
use crate::{
	_prelude::*,
	auth::IdentityClaims,
	error::{ConfigError, VerificationError},
	flows::{FlowContext, OidcClient, common},
	http::ProviderHttpClient,
	oauth::TransportErrorMapper,
	provider::{Endpoint, ProviderDescriptor},
};

/// Upper bound on a single key set download.
pub const JWKS_FETCH_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Boxed future returned by [`IdTokenVerifier::verify`].
pub type VerifyFuture<'a> = Pin<Box<dyn Future<Output = Result<IdentityClaims>> + 'a + Send>>;

/// Validates a raw ID token and returns its claims.
pub trait IdTokenVerifier: Send + Sync {
	/// Checks signature, expiry, issuer, and audience of `raw`.
	fn verify<'a>(&'a self, raw: &'a str) -> VerifyFuture<'a>;
}

/// [`IdTokenVerifier`] backed by the provider's `jwks_uri`.
///
/// The key set is downloaded on first use and kept for the lifetime of the verifier.
pub struct JwksVerifier<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	client: OidcClient<C, M>,
	issuer: String,
	jwks_uri: Option<Url>,
	keys: AsyncOnceCell<JwkSet>,
}
impl<C, M> JwksVerifier<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a verifier for tokens issued by `issuer` and signed by keys at `jwks_uri`.
	pub fn new(client: OidcClient<C, M>, issuer: impl Into<String>, jwks_uri: Option<Url>) -> Self {
		Self { client, issuer: issuer.into(), jwks_uri, keys: AsyncOnceCell::new() }
	}

	/// Creates a verifier from a discovered provider.
	pub fn from_descriptor(client: OidcClient<C, M>, descriptor: &ProviderDescriptor) -> Self {
		Self::new(client, descriptor.issuer.clone(), descriptor.endpoints.jwks.clone())
	}

	/// Pins the key set instead of downloading it.
	pub fn with_key_set(self, keys: JwkSet) -> Self {
		let _ = self.keys.set_blocking(keys);

		self
	}

	/// Validates `raw` and returns its claims.
	pub async fn verify_token(&self, raw: &str) -> Result<IdentityClaims> {
		let header = decode_header(raw).map_err(VerificationError::from)?;
		let keys = self.keys.get_or_try_init(|| self.fetch_keys()).await?;
		let jwk = select_key(keys, header.kid.as_deref())?;
		let key = DecodingKey::from_jwk(jwk).map_err(VerificationError::from)?;
		let mut validation = Validation::new(header.alg);

		validation.set_issuer(&[self.issuer.as_str()]);
		validation.set_audience(&[self.client.config.client_id.as_str()]);

		let data = decode::<IdentityClaims>(raw, &key, &validation)
			.map_err(VerificationError::from)?;

		Ok(data.claims)
	}

	async fn fetch_keys(&self) -> Result<JwkSet> {
		let url = self
			.jwks_uri
			.as_ref()
			.ok_or(ConfigError::MissingEndpoint { endpoint: Endpoint::Jwks })?;
		let request = common::get_request(url, None)?;
		let ctx = FlowContext::with_timeout(JWKS_FETCH_TIMEOUT);
		let response = ctx.run(self.client.send(Endpoint::Jwks, request)).await?;
		let keys: JwkSet = common::decode_success(Endpoint::Jwks, &response)?;

		flow_event!(debug, "Provider key set loaded.", keys = keys.keys.len());

		Ok(keys)
	}
}
impl<C, M> IdTokenVerifier for JwksVerifier<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn verify<'a>(&'a self, raw: &'a str) -> VerifyFuture<'a> {
		Box::pin(self.verify_token(raw))
	}
}
impl<C, M> Debug for JwksVerifier<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("JwksVerifier")
			.field("issuer", &self.issuer)
			.field("jwks_uri", &self.jwks_uri)
			.field("keys_loaded", &self.keys.is_initialized())
			.finish()
	}
}

fn select_key<'a>(keys: &'a JwkSet, kid: Option<&str>) -> Result<&'a Jwk, VerificationError> {
	match kid {
		Some(kid) => keys
			.find(kid)
			.ok_or_else(|| VerificationError::UnknownSigningKey { kid: kid.to_owned() }),
		None => match keys.keys.as_slice() {
			[only] => Ok(only),
			_ => Err(VerificationError::MissingKeyId),
		},
	}
}
