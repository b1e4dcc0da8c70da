//! OAuth token returned by login flows.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Token issued by the provider at the end of a login flow.
///
/// Only `access_token` is guaranteed to be non-empty. `token_type` is normalized to
/// [`Token::BEARER`] when the provider omits it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	/// Access credential presented to resource servers.
	pub access_token: TokenSecret,
	/// Token type as reported by the provider.
	pub token_type: String,
	/// Optional refresh credential.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
	/// Optional OIDC ID token (a signed JWT).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id_token: Option<TokenSecret>,
	/// Absolute expiry derived from `expires_in`, when the provider supplied one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires_at: Option<OffsetDateTime>,
}
impl Token {
	/// Canonical bearer token type.
	pub const BEARER: &'static str = "Bearer";

	/// Creates a token with the given type; an empty type becomes [`Token::BEARER`].
	pub fn new(access_token: impl Into<String>, token_type: impl Into<String>) -> Self {
		let token_type = token_type.into();

		Self {
			access_token: TokenSecret::new(access_token),
			token_type: if token_type.trim().is_empty() { Self::BEARER.into() } else { token_type },
			refresh_token: None,
			id_token: None,
			expires_at: None,
		}
	}

	/// Wraps a bare access token as a bearer token.
	pub fn bearer(access_token: impl Into<String>) -> Self {
		Self::new(access_token, Self::BEARER)
	}

	/// Attaches a refresh token.
	pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(refresh_token));

		self
	}

	/// Attaches an ID token.
	pub fn with_id_token(mut self, id_token: impl Into<String>) -> Self {
		self.id_token = Some(TokenSecret::new(id_token));

		self
	}

	/// Sets the expiry relative to now.
	///
	/// Non-positive lifetimes, and lifetimes that overflow the calendar, leave the expiry unset.
	pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
		if expires_in.is_positive() {
			self.expires_at = OffsetDateTime::now_utc().checked_add(expires_in);
		}

		self
	}

	/// Returns the scheme used in an `Authorization` header.
	///
	/// Any casing of `bearer` is rendered as `Bearer`; other schemes pass through.
	pub fn scheme(&self) -> &str {
		if self.token_type.eq_ignore_ascii_case(Self::BEARER) {
			Self::BEARER
		} else {
			&self.token_type
		}
	}

	/// Renders the `Authorization` header value for this token.
	pub fn authorization_header(&self) -> String {
		format!("{} {}", self.scheme(), self.access_token.expose())
	}

	/// Returns `true` when the token carries an expiry at or before `now`.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| expires_at <= now)
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("access_token", &self.access_token)
			.field("token_type", &self.token_type)
			.field("refresh_token", &self.refresh_token)
			.field("id_token", &self.id_token)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
