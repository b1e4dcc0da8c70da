//! RFC 8628 wire types and per-attempt device session state.

// crates.io
use oauth2::HttpResponse;
use tokio::time::Instant;
// self
use crate::{
	_prelude::*,
	auth::{Token, TokenSecret},
	error::ProviderError,
	flows::common::{self, OAuthErrorBody},
	provider::Endpoint,
};

/// Poll interval used when the provider omits `interval` or sends zero.
pub const DEFAULT_POLL_INTERVAL: StdDuration = StdDuration::from_secs(5);
/// Grant type sent while polling the token endpoint.
pub const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";
/// Token type requested while polling, asking the provider to include an ID token.
pub const REQUESTED_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:id_token";

const AUTHORIZATION_PENDING: &str = "authorization_pending";

/// Device authorization response body.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DeviceAuthorizationResponse {
	/// Opaque code the client polls with; never shown to the user.
	pub device_code: TokenSecret,
	/// Short code the user types at the verification page.
	pub user_code: String,
	/// Page where the user enters `user_code`.
	pub verification_uri: String,
	/// Verification page with the user code pre-filled.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub verification_uri_complete: Option<String>,
	/// Lifetime of the device code in seconds.
	pub expires_in: u64,
	/// Minimum polling interval in seconds.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub interval: Option<u64>,
}

/// What the user needs to complete a device login.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAnnouncement {
	/// Code to type at the verification page.
	pub user_code: String,
	/// Verification page, after applying any configured override.
	pub verification_uri: String,
	/// Verification page with the user code pre-filled, when offered.
	pub verification_uri_complete: Option<String>,
}

/// Polling state for one device authorization.
#[derive(Debug)]
pub(crate) struct DeviceSession {
	pub(crate) device_code: TokenSecret,
	pub(crate) user_code: String,
	pub(crate) verification_uri: String,
	pub(crate) verification_uri_complete: Option<String>,
	pub(crate) poll_interval: StdDuration,
	pub(crate) expires_at: Option<Instant>,
}
impl DeviceSession {
	/// Starts the session clock at `issued_at`.
	///
	/// A lifetime too large to represent as an [`Instant`] means no local expiry.
	pub(crate) fn new(response: DeviceAuthorizationResponse, issued_at: Instant) -> Self {
		let poll_interval = match response.interval {
			Some(secs) if secs > 0 => StdDuration::from_secs(secs),
			_ => DEFAULT_POLL_INTERVAL,
		};
		let expires_at = match response.expires_in {
			0 => None,
			secs => issued_at.checked_add(StdDuration::from_secs(secs)),
		};

		Self {
			device_code: response.device_code,
			user_code: response.user_code,
			verification_uri: response.verification_uri,
			verification_uri_complete: response.verification_uri_complete,
			poll_interval,
			expires_at,
		}
	}

	/// Returns `true` when another interval would carry polling past expiry.
	pub(crate) fn expires_before_next_poll(&self, now: Instant) -> bool {
		let Some(expires_at) = self.expires_at else { return false };

		// An interval that overflows the clock lands after any representable expiry.
		now.checked_add(self.poll_interval).is_none_or(|next_poll| next_poll >= expires_at)
	}
}

/// Successful token endpoint response for the device grant.
#[derive(Clone, Deserialize)]
struct DeviceTokenResponse {
	access_token: String,
	#[serde(default)]
	token_type: Option<String>,
	#[serde(default)]
	refresh_token: Option<String>,
	#[serde(default)]
	id_token: Option<String>,
	#[serde(default)]
	expires_in: Option<i64>,
}
impl From<DeviceTokenResponse> for Token {
	fn from(response: DeviceTokenResponse) -> Self {
		let mut token = Token::new(response.access_token, response.token_type.unwrap_or_default());

		if let Some(refresh) = response.refresh_token {
			token = token.with_refresh_token(refresh);
		}
		if let Some(id_token) = response.id_token {
			token = token.with_id_token(id_token);
		}
		if let Some(expires_in) = response.expires_in {
			token = token.with_expires_in(Duration::seconds(expires_in));
		}

		token
	}
}

/// Result of one poll of the token endpoint.
#[derive(Debug)]
pub(crate) enum PollOutcome {
	Pending,
	Granted(Token),
}

/// Interprets a token endpoint response received while polling.
///
/// `authorization_pending` keeps polling; any other OAuth error ends the attempt.
pub(crate) fn interpret_poll_response(response: &HttpResponse) -> Result<PollOutcome> {
	let status = response.status().as_u16();
	let body: OAuthErrorBody = match common::decode_json(Endpoint::Token, response) {
		Ok(body) => body,
		Err(_) if !response.status().is_success() =>
			return Err(common::provider_error(Endpoint::Token, response)),
		Err(err) => return Err(err),
	};

	match body.error {
		Some(error) if error == AUTHORIZATION_PENDING => Ok(PollOutcome::Pending),
		Some(error) => Err(ProviderError {
			endpoint: Endpoint::Token,
			error,
			description: body.error_description,
			status: Some(status),
		}
		.into()),
		None if !response.status().is_success() =>
			Err(common::provider_error(Endpoint::Token, response)),
		None => {
			let token: DeviceTokenResponse = common::decode_json(Endpoint::Token, response)?;

			Ok(PollOutcome::Granted(token.into()))
		},
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::StatusCode;
	// self
	use super::*;
	use crate::error::DecodeError;

	fn response(status: u16, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() = StatusCode::from_u16(status).expect("Status should be valid.");

		response
	}

	fn authorization(interval: Option<u64>, expires_in: u64) -> DeviceAuthorizationResponse {
		DeviceAuthorizationResponse {
			device_code: TokenSecret::new("D1"),
			user_code: "U1".into(),
			verification_uri: "https://idp/verify".into(),
			verification_uri_complete: None,
			expires_in,
			interval,
		}
	}

	#[test]
	fn missing_or_zero_interval_defaults_to_five_seconds() {
		let now = Instant::now();

		assert_eq!(
			DeviceSession::new(authorization(None, 600), now).poll_interval,
			DEFAULT_POLL_INTERVAL
		);
		assert_eq!(
			DeviceSession::new(authorization(Some(0), 600), now).poll_interval,
			DEFAULT_POLL_INTERVAL
		);
		assert_eq!(
			DeviceSession::new(authorization(Some(2), 600), now).poll_interval,
			StdDuration::from_secs(2)
		);
	}

	#[test]
	fn expiry_is_checked_against_next_poll() {
		let now = Instant::now();
		let session = DeviceSession::new(authorization(Some(5), 12), now);

		assert!(!session.expires_before_next_poll(now));
		assert!(session.expires_before_next_poll(now + StdDuration::from_secs(8)));
		assert!(!DeviceSession::new(authorization(Some(5), 0), now)
			.expires_before_next_poll(now + StdDuration::from_secs(3600)));
	}

	#[test]
	fn oversized_lifetime_means_no_local_expiry() {
		let now = Instant::now();
		let session = DeviceSession::new(authorization(Some(5), u64::MAX), now);

		assert_eq!(session.expires_at, None);
		assert!(!session.expires_before_next_poll(now + StdDuration::from_secs(86_400)));
	}

	#[test]
	fn oversized_interval_expires_instead_of_overflowing() {
		let now = Instant::now();
		let session = DeviceSession::new(authorization(Some(u64::MAX), 600), now);

		assert_eq!(session.poll_interval, StdDuration::from_secs(u64::MAX));
		assert!(session.expires_before_next_poll(now));
		assert!(
			!DeviceSession::new(authorization(Some(u64::MAX), 0), now)
				.expires_before_next_poll(now)
		);
	}

	#[test]
	fn oversized_token_lifetime_leaves_expiry_unset() {
		let body = serde_json::json!({
			"access_token": "AT1",
			"token_type": "Bearer",
			"expires_in": i64::MAX
		})
		.to_string();
		let outcome =
			interpret_poll_response(&response(200, &body)).expect("Success should decode.");

		match outcome {
			PollOutcome::Granted(token) => {
				assert_eq!(token.access_token.expose(), "AT1");
				assert_eq!(token.expires_at, None);
			},
			PollOutcome::Pending => panic!("Success should not be pending."),
		}
	}

	#[test]
	fn pending_keeps_polling() {
		let outcome =
			interpret_poll_response(&response(400, r#"{"error":"authorization_pending"}"#))
				.expect("Pending should not fail.");

		assert!(matches!(outcome, PollOutcome::Pending));
	}

	#[test]
	fn other_oauth_errors_terminate() {
		for code in ["access_denied", "expired_token", "slow_down"] {
			let body = format!(r#"{{"error":"{code}","error_description":"stop"}}"#);
			let err = interpret_poll_response(&response(400, &body))
				.expect_err("Non-pending errors should terminate.");
			let provider = err.provider_error().expect("Error should carry provider details.");

			assert_eq!(provider.error, code);
			assert_eq!(provider.description.as_deref(), Some("stop"));
		}
	}

	#[test]
	fn success_yields_bearer_token() {
		let outcome = interpret_poll_response(&response(
			200,
			r#"{"access_token":"AT1","token_type":"","id_token":"ID1","expires_in":300}"#,
		))
		.expect("Success should decode.");

		match outcome {
			PollOutcome::Granted(token) => {
				assert_eq!(token.access_token.expose(), "AT1");
				assert_eq!(token.token_type, Token::BEARER);
				assert_eq!(token.id_token.as_ref().map(TokenSecret::expose), Some("ID1"));
			},
			PollOutcome::Pending => panic!("Success should not be pending."),
		}
	}

	#[test]
	fn malformed_success_body_is_a_decode_error() {
		let err = interpret_poll_response(&response(200, "not json"))
			.expect_err("Malformed body should fail.");

		assert!(matches!(err, Error::Decode(DecodeError::Json { endpoint: Endpoint::Token, .. })));
	}

	#[test]
	fn non_json_error_status_is_a_provider_error() {
		let err = interpret_poll_response(&response(503, "<html>maintenance</html>"))
			.expect_err("Gateway failure should fail.");

		assert_eq!(err.provider_error().map(|p| p.error.as_str()), Some("http_503"));
	}
}
