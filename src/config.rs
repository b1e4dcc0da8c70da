//! Client configuration shared by every flow.

// self
use crate::{_prelude::*, error::ConfigError, provider::ClientAuthMethod};

/// Identity provider coordinates and client credentials.
///
/// `issuer_url` is the provider's issuer identifier (for Keycloak, the realm URL such as
/// `https://iam.example.com/realms/dev`). Discovery appends
/// `/.well-known/openid-configuration` to it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcConfig {
	/// Issuer identifier of the provider.
	pub issuer_url: String,
	/// OAuth client identifier.
	pub client_id: String,
	/// Optional confidential-client secret.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub client_secret: Option<String>,
	/// Client authentication mode for token endpoint calls.
	#[serde(default)]
	pub client_auth: ClientAuthMethod,
}
impl OidcConfig {
	/// Creates a public-client configuration.
	pub fn new(issuer_url: impl Into<String>, client_id: impl Into<String>) -> Self {
		Self {
			issuer_url: issuer_url.into(),
			client_id: client_id.into(),
			client_secret: None,
			client_auth: ClientAuthMethod::default(),
		}
	}

	/// Sets the client secret.
	pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Overrides the client authentication mode.
	pub fn with_client_auth(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth = method;

		self
	}

	/// Returns the trimmed issuer, failing when it is blank.
	pub fn issuer(&self) -> Result<&str, ConfigError> {
		let issuer = self.issuer_url.trim();

		if issuer.is_empty() { Err(ConfigError::MissingIssuer) } else { Ok(issuer) }
	}

	/// Returns the client secret when one is configured and non-empty.
	pub fn client_secret(&self) -> Option<&str> {
		self.client_secret.as_deref().filter(|secret| !secret.is_empty())
	}
}
impl Debug for OidcConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OidcConfig")
			.field("issuer_url", &self.issuer_url)
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
			.field("client_auth", &self.client_auth)
			.finish()
	}
}
