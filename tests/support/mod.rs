#![allow(dead_code)]

// std
use std::{
	collections::{HashMap, VecDeque},
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
	sync::Arc,
};
// crates.io
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::time::Instant;
// self
use oidc_login::{
	Error, OidcClient, OidcConfig,
	error::TransportError,
	http::{ProviderHttpClient, ResponseMetadata, ResponseMetadataSlot},
	oauth::{
		TransportErrorMapper,
		oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse, http::StatusCode},
	},
	provider::Endpoint,
};

pub const ISSUER: &str = "https://idp";
pub const CLIENT_ID: &str = "cli";

/// Request observed by [`ScriptedProvider`].
#[derive(Clone, Debug)]
pub struct Recorded {
	pub path: String,
	pub at: Instant,
	pub body: String,
	pub authorization: Option<String>,
}

/// In-memory provider answering from per-path response queues.
///
/// The last queued response for a path is repeated once the queue drains.
#[derive(Debug, Default)]
pub struct ScriptedProvider(Arc<Script>);
impl ScriptedProvider {
	pub fn new() -> Arc<Self> {
		let provider = Arc::new(Self::default());

		provider.respond("/.well-known/openid-configuration", 200, discovery_document(ISSUER));

		provider
	}

	pub fn respond(&self, path: &str, status: u16, body: Value) {
		self.0.routes.lock().entry(path.to_owned()).or_default().push_back((status, body));
	}

	pub fn calls(&self, path: &str) -> Vec<Recorded> {
		self.0.calls.lock().iter().filter(|call| call.path == path).cloned().collect()
	}
}
impl ProviderHttpClient for ScriptedProvider {
	type Handle = ScriptedHandle;
	type TransportError = ScriptExhausted;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		ScriptedHandle { script: Arc::clone(&self.0), slot }
	}
}

#[derive(Debug, Default)]
struct Script {
	routes: Mutex<HashMap<String, VecDeque<(u16, Value)>>>,
	calls: Mutex<Vec<Recorded>>,
}
impl Script {
	fn answer(&self, request: &HttpRequest) -> Result<HttpResponse, ScriptExhausted> {
		let path = request.uri().path().to_owned();

		self.calls.lock().push(Recorded {
			path: path.clone(),
			at: Instant::now(),
			body: String::from_utf8_lossy(request.body()).into_owned(),
			authorization: request
				.headers()
				.get("authorization")
				.and_then(|value| value.to_str().ok())
				.map(str::to_owned),
		});

		let mut routes = self.routes.lock();
		let queue = routes.get_mut(&path).ok_or_else(|| ScriptExhausted(path.clone()))?;
		let next = if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() };
		let (status, body) = next.ok_or_else(|| ScriptExhausted(path.clone()))?;
		let mut response = HttpResponse::new(body.to_string().into_bytes());

		*response.status_mut() = StatusCode::from_u16(status).map_err(|_| ScriptExhausted(path))?;

		Ok(response)
	}
}

/// Handle returned by [`ScriptedProvider::with_metadata`].
pub struct ScriptedHandle {
	script: Arc<Script>,
	slot: ResponseMetadataSlot,
}
impl<'c> AsyncHttpClient<'c> for ScriptedHandle {
	type Error = HttpClientError<ScriptExhausted>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			let response = self
				.script
				.answer(&request)
				.map_err(|err| HttpClientError::Other(err.to_string()))?;

			self.slot.store(ResponseMetadata { status: Some(response.status().as_u16()) });

			Ok(response)
		})
	}
}

/// No response was scripted for a path.
#[derive(Debug)]
pub struct ScriptExhausted(pub String);
impl Display for ScriptExhausted {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "no scripted response for {}", self.0)
	}
}
impl StdError for ScriptExhausted {}

/// Maps every transport failure to a network error.
#[derive(Debug, Default)]
pub struct ScriptedMapper;
impl TransportErrorMapper<ScriptExhausted> for ScriptedMapper {
	fn map_transport_error(
		&self,
		endpoint: Endpoint,
		_metadata: Option<&ResponseMetadata>,
		error: HttpClientError<ScriptExhausted>,
	) -> Error {
		TransportError::network(endpoint, error).into()
	}
}

pub type ScriptedClient = OidcClient<ScriptedProvider, ScriptedMapper>;

pub fn client(provider: &Arc<ScriptedProvider>) -> ScriptedClient {
	client_with(OidcConfig::new(ISSUER, CLIENT_ID), provider)
}

pub fn client_with(config: OidcConfig, provider: &Arc<ScriptedProvider>) -> ScriptedClient {
	OidcClient::with_http_client(config, Arc::clone(provider), Arc::new(ScriptedMapper))
}

pub fn discovery_document(issuer: &str) -> Value {
	json!({
		"issuer": issuer,
		"authorization_endpoint": format!("{issuer}/auth"),
		"token_endpoint": format!("{issuer}/token"),
		"device_authorization_endpoint": format!("{issuer}/device"),
		"userinfo_endpoint": format!("{issuer}/userinfo"),
		"jwks_uri": format!("{issuer}/certs"),
		"response_types_supported": ["code"],
		"scopes_supported": ["openid", "profile", "email"]
	})
}

pub fn device_authorization(
	device_code: &str,
	user_code: &str,
	interval: u64,
	expires_in: u64,
) -> Value {
	json!({
		"device_code": device_code,
		"user_code": user_code,
		"verification_uri": format!("{ISSUER}/activate"),
		"verification_uri_complete": format!("{ISSUER}/activate?user_code={user_code}"),
		"expires_in": expires_in,
		"interval": interval
	})
}

pub fn pending() -> Value {
	json!({ "error": "authorization_pending", "error_description": "waiting for the user" })
}

pub fn granted(access_token: &str) -> Value {
	json!({
		"access_token": access_token,
		"token_type": "Bearer",
		"expires_in": 300,
		"refresh_token": "RT1",
		"id_token": "ID1"
	})
}
