//! Loopback HTTP server that receives the authorization redirect.

// crates.io
use axum::{
	Router,
	extract::{Query, State},
	http::{
		HeaderMap, StatusCode,
		header::{AUTHORIZATION, LOCATION},
	},
	response::{Html, IntoResponse, Response},
	routing::get,
};
use tokio::{net::TcpListener, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	auth::Token,
	error::ProtocolError,
	flows::{browser::BrowserSession, signal::DeliverySlot},
	http::ProviderHttpClient,
	oauth::{CodeExchangeFacade, TransportErrorMapper},
	provider::IdTokenVerifier,
};

/// Login entry path; the published login URL points here.
pub const LOGIN_PATH: &str = "/auth";
/// Redirect target registered with the provider.
pub const CALLBACK_PATH: &str = "/auth/callback";

const SHUTDOWN_GRACE: StdDuration = StdDuration::from_millis(500);

/// Everything the handlers need for one attempt.
pub(crate) struct CallbackState<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) session: BrowserSession,
	pub(crate) facade: CodeExchangeFacade<C, M>,
	pub(crate) verifier: Arc<dyn IdTokenVerifier>,
	pub(crate) slot: DeliverySlot<Token>,
}

#[derive(Debug, Default, Deserialize)]
struct CallbackQuery {
	#[serde(default)]
	state: Option<String>,
	#[serde(default)]
	code: Option<String>,
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	error_description: Option<String>,
}

/// Builds the login and callback routes, with and without a trailing slash.
pub(crate) fn router<C, M>(state: Arc<CallbackState<C, M>>) -> Router
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	Router::new()
		.route(LOGIN_PATH, get(login::<C, M>))
		.route("/auth/", get(login::<C, M>))
		.route(CALLBACK_PATH, get(callback::<C, M>))
		.route("/auth/callback/", get(callback::<C, M>))
		.with_state(state)
}

async fn login<C, M>(State(state): State<Arc<CallbackState<C, M>>>, headers: HeaderMap) -> Response
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let Some(value) = headers.get(AUTHORIZATION) else {
		return redirect(&state.session.authorize_url);
	};
	let Some(credential) = value.to_str().ok().and_then(split_credential) else {
		return (StatusCode::BAD_REQUEST, ProtocolError::MalformedAuthorization.to_string())
			.into_response();
	};

	match state.verifier.verify(credential).await {
		Ok(_) => page(StatusCode::OK, "You are already signed in."),
		Err(err) => {
			flow_event!(debug, "Presented credential was rejected; restarting login.", error = err);

			redirect(&state.session.authorize_url)
		},
	}
}

async fn callback<C, M>(
	State(state): State<Arc<CallbackState<C, M>>>,
	Query(query): Query<CallbackQuery>,
) -> Response
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	if let Err(err) = state.session.validate_state(query.state.as_deref().unwrap_or_default()) {
		flow_event!(warn, "Callback rejected.", error = err);

		return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
	}
	if let Some(error) = query.error {
		let description = query.error_description.unwrap_or_default();

		flow_event!(warn, "Provider refused authorization.", error = error);

		return (StatusCode::BAD_REQUEST, format!("Authorization failed: {error} {description}"))
			.into_response();
	}

	let Some(code) = query.code.filter(|code| !code.is_empty()) else {
		return (StatusCode::BAD_REQUEST, ProtocolError::MissingCode.to_string()).into_response();
	};

	if !state.slot.is_open() {
		return page(StatusCode::GONE, "This login attempt has already finished.");
	}

	let token = match state.facade.exchange_code(&code, state.session.pkce_verifier()).await {
		Ok(token) => token,
		Err(err) => {
			flow_event!(warn, "Authorization code exchange failed.", error = err);

			return (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to exchange token: {err}"))
				.into_response();
		},
	};

	match state.slot.deliver(token) {
		Ok(()) => page(StatusCode::OK, "Hello. You can now close this window."),
		Err(_) => page(StatusCode::GONE, "This login attempt has already finished."),
	}
}

/// Splits `<scheme> <credential>`; anything but exactly two space-separated parts fails.
fn split_credential(value: &str) -> Option<&str> {
	let mut parts = value.split(' ');

	match (parts.next(), parts.next(), parts.next()) {
		(Some(_), Some(credential), None) => Some(credential),
		_ => None,
	}
}

fn redirect(url: &Url) -> Response {
	(StatusCode::FOUND, [(LOCATION, url.as_str().to_owned())]).into_response()
}

fn page(status: StatusCode, message: &str) -> Response {
	(
		status,
		Html(format!(
			"<!doctype html><html><head><title>oidc-login</title></head><body><p>{message}</p></body></html>"
		)),
	)
		.into_response()
}

/// Running callback server; stops when [`CallbackServer::stop`] is awaited or on drop.
pub(crate) struct CallbackServer {
	shutdown: CancellationToken,
	task: Option<JoinHandle<()>>,
}
impl CallbackServer {
	pub(crate) fn spawn(listener: TcpListener, router: Router) -> Self {
		let shutdown = CancellationToken::new();
		let signal = shutdown.clone().cancelled_owned();
		let task = tokio::spawn(async move {
			if let Err(err) = axum::serve(listener, router).with_graceful_shutdown(signal).await {
				flow_event!(warn, "Callback server failed.", error = err);
			}
		});

		Self { shutdown, task: Some(task) }
	}

	/// Stops accepting connections and waits briefly for in-flight responses.
	pub(crate) async fn stop(mut self) {
		self.shutdown.cancel();

		let Some(mut task) = self.task.take() else { return };

		if time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
			task.abort();

			let _ = task.await;
		}
	}
}
impl Drop for CallbackServer {
	fn drop(&mut self) {
		self.shutdown.cancel();

		if let Some(task) = self.task.take() {
			task.abort();
		}
	}
}
