//! Request plumbing shared by the flows: discovery, dispatch, and response decoding.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest, HttpResponse,
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use serde::de::DeserializeOwned;
use url::form_urlencoded::Serializer;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, DecodeError, ProviderError},
	flows::{FlowContext, OidcClient},
	http::{ProviderHttpClient, ResponseMetadataSlot},
	oauth::TransportErrorMapper,
	provider::{Endpoint, ProviderDescriptor, ProviderMetadata, discovery_url},
};

const BODY_PREVIEW_LIMIT: usize = 256;

/// OAuth error body (`error`, `error_description`) as returned by token-style endpoints.
#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct OAuthErrorBody {
	#[serde(default)]
	pub(crate) error: Option<String>,
	#[serde(default)]
	pub(crate) error_description: Option<String>,
}

impl<C, M> OidcClient<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Fetches the discovery document and validates it against the configured issuer.
	pub async fn discover(&self, ctx: &FlowContext) -> Result<ProviderDescriptor> {
		let issuer = self.config.issuer()?;
		let url = discovery_url(issuer)?;
		let request = get_request(&url, None)?;
		let response = ctx.run(self.send(Endpoint::Discovery, request)).await?;
		let metadata: ProviderMetadata = decode_success(Endpoint::Discovery, &response)?;

		Ok(metadata.into_descriptor(issuer)?)
	}

	/// Sends `request` through the configured transport.
	pub(crate) async fn send(
		&self,
		endpoint: Endpoint,
		request: HttpRequest,
	) -> Result<HttpResponse> {
		let slot = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(slot.clone());

		handle.call(request).await.map_err(|err| {
			self.transport_mapper.map_transport_error(endpoint, slot.take().as_ref(), err)
		})
	}
}

/// Builds a JSON `GET`, optionally carrying an `Authorization` header.
pub(crate) fn get_request(url: &Url, authorization: Option<&str>) -> Result<HttpRequest> {
	let mut builder =
		Request::builder().method(Method::GET).uri(url.as_str()).header(ACCEPT, "application/json");

	if let Some(value) = authorization {
		builder = builder.header(AUTHORIZATION, value);
	}

	Ok(builder.body(Vec::new()).map_err(ConfigError::from)?)
}

/// Builds a form-encoded `POST`.
pub(crate) fn form_request(url: &Url, pairs: &[(&str, &str)]) -> Result<HttpRequest> {
	let body = Serializer::new(String::new()).extend_pairs(pairs.iter().copied()).finish();

	Ok(Request::builder()
		.method(Method::POST)
		.uri(url.as_str())
		.header(ACCEPT, "application/json")
		.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
		.body(body.into_bytes())
		.map_err(ConfigError::from)?)
}

/// Decodes a JSON body regardless of status.
pub(crate) fn decode_json<T>(endpoint: Endpoint, response: &HttpResponse) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(response.body());

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
		DecodeError::Json { endpoint, source, status: Some(response.status().as_u16()) }.into()
	})
}

/// Decodes a JSON body after checking for a success status.
pub(crate) fn decode_success<T>(endpoint: Endpoint, response: &HttpResponse) -> Result<T>
where
	T: DeserializeOwned,
{
	if !response.status().is_success() {
		return Err(provider_error(endpoint, response));
	}

	decode_json(endpoint, response)
}

/// Classifies a non-success response, preferring the OAuth error body when present.
pub(crate) fn provider_error(endpoint: Endpoint, response: &HttpResponse) -> Error {
	let status = response.status().as_u16();

	match serde_json::from_slice::<OAuthErrorBody>(response.body()) {
		Ok(OAuthErrorBody { error: Some(error), error_description }) =>
			ProviderError { endpoint, error, description: error_description, status: Some(status) }
				.into(),
		_ => ProviderError {
			endpoint,
			error: format!("http_{status}"),
			description: body_preview(response.body()),
			status: Some(status),
		}
		.into(),
	}
}

fn body_preview(body: &[u8]) -> Option<String> {
	let text = String::from_utf8_lossy(body);
	let text = text.trim();

	if text.is_empty() {
		return None;
	}
	if text.chars().count() <= BODY_PREVIEW_LIMIT {
		return Some(text.to_owned());
	}

	let mut preview: String = text.chars().take(BODY_PREVIEW_LIMIT).collect();

	preview.push('…');

	Some(preview)
}
