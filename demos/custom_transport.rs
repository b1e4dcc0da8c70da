//! Plugs a non-reqwest transport into the identity verifier.
//!
//! 1. Implement [`ProviderHttpClient`] so each handle records [`ResponseMetadata`] in the slot it
//!    was given.
//! 2. Provide a [`TransportErrorMapper`] that turns the transport's own errors into crate errors.
//! 3. Hand both to [`OidcClient::with_http_client`] and build any flow or verifier on top.

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
	sync::Arc,
};
// crates.io
use color_eyre::Result;
use serde_json::json;
// self
use oidc_login::{
	Error, OidcClient, OidcConfig, UserInfoVerifier,
	error::TransportError,
	http::{ProviderHttpClient, ResponseMetadata, ResponseMetadataSlot},
	oauth::{
		TransportErrorMapper,
		oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse},
	},
	provider::Endpoint,
	verify,
};

const ISSUER: &str = "https://iam.example.com/realms/demo";

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let verifier = UserInfoVerifier::with_client(client(MockHttpClient::Online));
	let claims = verify("demo-access", &verifier).await?;

	println!("Userinfo served by the in-memory transport: {}.", claims.username());

	let offline = UserInfoVerifier::with_client(client(MockHttpClient::Offline {
		host: "iam.example.com",
	}));

	match verify("demo-access", &offline).await {
		Ok(_) => println!("Offline transport unexpectedly answered."),
		Err(e) => println!("Transport error mapped into the crate error: {e}"),
	}

	Ok(())
}

fn client(transport: MockHttpClient) -> OidcClient<MockHttpClient, MockTransportErrorMapper> {
	OidcClient::with_http_client(
		OidcConfig::new(ISSUER, "demo-cli"),
		Arc::new(transport),
		Arc::new(MockTransportErrorMapper),
	)
}

#[derive(Clone, Debug)]
enum MockTransportError {
	DnsFailure { host: &'static str },
	UnknownRoute(String),
}
impl Display for MockTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::DnsFailure { host } => write!(f, "DNS lookup failed for {host}"),
			Self::UnknownRoute(path) => write!(f, "no route for {path}"),
		}
	}
}
impl StdError for MockTransportError {}

#[derive(Clone, Copy)]
enum MockHttpClient {
	Online,
	Offline { host: &'static str },
}
impl ProviderHttpClient for MockHttpClient {
	type Handle = MockHttpHandle;
	type TransportError = MockTransportError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		MockHttpHandle { slot, behavior: *self }
	}
}

struct MockHttpHandle {
	slot: ResponseMetadataSlot,
	behavior: MockHttpClient,
}
impl<'a> AsyncHttpClient<'a> for MockHttpHandle {
	type Error = HttpClientError<MockTransportError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'a + Send>>;

	fn call(&'a self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();

			if let MockHttpClient::Offline { host } = self.behavior {
				// `Reqwest` is the oauth2 variant for boxed transport errors of any kind.
				return Err(HttpClientError::Reqwest(Box::new(MockTransportError::DnsFailure {
					host,
				})));
			}

			let body = match request.uri().path() {
				"/realms/demo/.well-known/openid-configuration" => json!({
					"issuer": ISSUER,
					"authorization_endpoint": format!("{ISSUER}/protocol/openid-connect/auth"),
					"token_endpoint": format!("{ISSUER}/protocol/openid-connect/token"),
					"userinfo_endpoint": format!("{ISSUER}/protocol/openid-connect/userinfo")
				}),
				"/realms/demo/protocol/openid-connect/userinfo" =>
					json!({ "sub": "7d1c", "preferred_username": "ada" }),
				other =>
					return Err(HttpClientError::Reqwest(Box::new(
						MockTransportError::UnknownRoute(other.to_owned()),
					))),
			};

			self.slot.store(ResponseMetadata { status: Some(200) });

			Ok(HttpResponse::new(body.to_string().into_bytes()))
		})
	}
}

#[derive(Clone, Default)]
struct MockTransportErrorMapper;
impl TransportErrorMapper<MockTransportError> for MockTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: Endpoint,
		_metadata: Option<&ResponseMetadata>,
		error: HttpClientError<MockTransportError>,
	) -> Error {
		match error {
			HttpClientError::Reqwest(inner) => TransportError::network(endpoint, *inner).into(),
			other => TransportError::network(endpoint, other.to_string()).into(),
		}
	}
}
