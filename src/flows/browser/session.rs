// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, error::ProtocolError, provider::ProviderDescriptor};

/// Scopes requested by the browser flow.
pub const LOGIN_SCOPES: &str = "openid profile email";

const STATE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// Per-attempt browser login state: CSRF `state`, PKCE pair, and the URLs derived from them.
#[derive(Clone)]
pub struct BrowserSession {
	/// Opaque state value that must round-trip via the callback.
	pub state: String,
	/// Loopback callback URI registered with the provider for this attempt.
	pub redirect_uri: Url,
	/// Provider authorization URL the user is sent to.
	pub authorize_url: Url,
	pkce: PkcePair,
}
impl BrowserSession {
	/// Creates a session with a fresh state and PKCE pair.
	pub(crate) fn start(
		descriptor: &ProviderDescriptor,
		client_id: &str,
		redirect_uri: Url,
	) -> Self {
		let state = random_string(STATE_LEN);
		let pkce = PkcePair::generate();
		let authorize_url =
			build_authorize_url(descriptor, client_id, &redirect_uri, &state, &pkce);

		Self { state, redirect_uri, authorize_url, pkce }
	}

	/// PKCE code challenge derived from the secret verifier.
	pub fn code_challenge(&self) -> &str {
		&self.pkce.challenge
	}

	pub(crate) fn pkce_verifier(&self) -> &str {
		&self.pkce.verifier
	}

	/// Checks the `state` returned on the callback; comparison is exact.
	pub fn validate_state(&self, returned_state: &str) -> Result<(), ProtocolError> {
		if returned_state == self.state { Ok(()) } else { Err(ProtocolError::StateMismatch) }
	}
}
impl Debug for BrowserSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BrowserSession")
			.field("state", &self.state)
			.field("redirect_uri", &self.redirect_uri)
			.field("authorize_url", &self.authorize_url)
			.field("code_challenge", &self.pkce.challenge)
			.finish()
	}
}

#[derive(Clone)]
struct PkcePair {
	verifier: String,
	challenge: String,
}
impl PkcePair {
	fn generate() -> Self {
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = compute_pkce_challenge(&verifier);

		Self { verifier, challenge }
	}
}

fn build_authorize_url(
	descriptor: &ProviderDescriptor,
	client_id: &str,
	redirect_uri: &Url,
	state: &str,
	pkce: &PkcePair,
) -> Url {
	let mut url = descriptor.endpoints.authorization.clone();

	url.query_pairs_mut()
		.append_pair("response_type", "code")
		.append_pair("client_id", client_id)
		.append_pair("redirect_uri", redirect_uri.as_str())
		.append_pair("scope", LOGIN_SCOPES)
		.append_pair("state", state)
		.append_pair("code_challenge", &pkce.challenge)
		.append_pair("code_challenge_method", "S256");

	url
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
