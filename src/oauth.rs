//! Authorization-code exchange facade over the `oauth2` crate, plus transport error mapping.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret, EndpointNotSet,
	EndpointSet, ExtraTokenFields, HttpClientError, PkceCodeVerifier, RedirectUrl,
	RequestTokenError, StandardRevocableToken, StandardTokenResponse, TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
		BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	auth::Token,
	config::OidcConfig,
	error::{ConfigError, DecodeError, ProviderError, TransportError},
	http::{ProviderHttpClient, ResponseMetadata, ResponseMetadataSlot},
	provider::{ClientAuthMethod, Endpoint, ProviderDescriptor},
};

type OidcTokenResponse = StandardTokenResponse<IdTokenFields, BasicTokenType>;
type ConfiguredClient = Client<
	BasicErrorResponse,
	OidcTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] raised while calling `endpoint` into a crate error.
	fn map_transport_error(
		&self,
		endpoint: Endpoint,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: Endpoint,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) if inner.is_builder() =>
				ConfigError::from(*inner).into(),
			HttpClientError::Reqwest(inner) => TransportError::network(endpoint, *inner).into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => DecodeError::Unexpected {
				endpoint,
				message,
				status: meta.and_then(|meta| meta.status),
			}
			.into(),
			_ => TransportError::network(endpoint, "unrecognized HTTP client failure").into(),
		}
	}
}

/// Extra token response fields defined by OpenID Connect.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenFields {
	/// Signed ID token, present when the `openid` scope was granted.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id_token: Option<String>,
}
impl ExtraTokenFields for IdTokenFields {}

/// Exchanges authorization codes at the token endpoint on behalf of the browser flow.
pub(crate) struct CodeExchangeFacade<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> CodeExchangeFacade<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_descriptor(
		descriptor: &ProviderDescriptor,
		config: &OidcConfig,
		redirect_uri: &Url,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Self {
		let auth_url = AuthUrl::from_url(descriptor.endpoints.authorization.clone());
		let token_url = TokenUrl::from_url(descriptor.endpoints.token.clone());
		let redirect_url = RedirectUrl::from_url(redirect_uri.clone());
		let mut oauth_client: ConfiguredClient =
			Client::new(ClientId::new(config.client_id.clone()))
				.set_auth_uri(auth_url)
				.set_token_uri(token_url)
				.set_redirect_uri(redirect_url);

		match (config.client_auth, config.client_secret()) {
			(ClientAuthMethod::NoneWithPkce, _) | (_, None) => {},
			(ClientAuthMethod::ClientSecretBasic, Some(secret)) =>
				oauth_client = oauth_client.set_client_secret(ClientSecret::new(secret.to_owned())),
			(ClientAuthMethod::ClientSecretPost, Some(secret)) =>
				oauth_client = oauth_client
					.set_client_secret(ClientSecret::new(secret.to_owned()))
					.set_auth_type(AuthType::RequestBody),
		}

		Self { oauth_client, http_client, error_mapper }
	}

	/// Redeems `code` together with the PKCE verifier generated for the attempt.
	pub(crate) async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<Token> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let response = self
			.oauth_client
			.exchange_code(AuthorizationCode::new(code.to_owned()))
			.set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_owned()))
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err, self.error_mapper.as_ref()))?;

		Ok(token_from_response(&response))
	}
}

fn token_from_response(response: &OidcTokenResponse) -> Token {
	let mut token =
		Token::new(response.access_token().secret().to_owned(), response.token_type().as_ref());

	if let Some(refresh) = response.refresh_token() {
		token = token.with_refresh_token(refresh.secret().to_owned());
	}
	if let Some(id_token) = response.extra_fields().id_token.as_deref() {
		token = token.with_id_token(id_token);
	}
	if let Some(expires_in) = response.expires_in().and_then(|d| i64::try_from(d.as_secs()).ok())
	{
		token = token.with_expires_in(Duration::seconds(expires_in));
	}

	token
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: RequestTokenError<HttpClientError<E>, BasicErrorResponse>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let status = meta.as_ref().and_then(|meta| meta.status);

	match err {
		RequestTokenError::ServerResponse(response) => ProviderError {
			endpoint: Endpoint::Token,
			error: response.error().as_ref().to_owned(),
			description: response.error_description().cloned(),
			status,
		}
		.into(),
		RequestTokenError::Request(error) =>
			mapper.map_transport_error(Endpoint::Token, meta.as_ref(), error),
		RequestTokenError::Parse(source, _body) =>
			DecodeError::Json { endpoint: Endpoint::Token, source, status }.into(),
		RequestTokenError::Other(message) =>
			DecodeError::Unexpected { endpoint: Endpoint::Token, message, status }.into(),
	}
}
