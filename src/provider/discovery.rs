//! OpenID Provider metadata published at `/.well-known/openid-configuration`.

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	provider::{Endpoint, ProviderDescriptor, parse_endpoint},
};

/// Path appended to the issuer to locate the discovery document.
pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// Subset of the discovery document this crate consumes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
	/// Issuer identifier; must match the configured issuer.
	pub issuer: String,
	/// Authorization endpoint.
	pub authorization_endpoint: String,
	/// Token endpoint.
	pub token_endpoint: String,
	/// RFC 8628 device authorization endpoint.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub device_authorization_endpoint: Option<String>,
	/// Userinfo endpoint.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub userinfo_endpoint: Option<String>,
	/// JWKS endpoint.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub jwks_uri: Option<String>,
	/// Advertised scopes.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub scopes_supported: Vec<String>,
}
impl ProviderMetadata {
	/// Validates the document against `expected_issuer` and converts it into a descriptor.
	///
	/// Issuers are compared after stripping a single trailing slash from both sides.
	pub fn into_descriptor(self, expected_issuer: &str) -> Result<ProviderDescriptor, ConfigError> {
		if normalize_issuer(&self.issuer) != normalize_issuer(expected_issuer) {
			return Err(ConfigError::IssuerMismatch {
				expected: expected_issuer.to_owned(),
				found: self.issuer,
			});
		}

		let mut builder = ProviderDescriptor::builder(self.issuer)
			.authorization_endpoint(parse_endpoint(
				Endpoint::Authorization,
				&self.authorization_endpoint,
			)?)
			.token_endpoint(parse_endpoint(Endpoint::Token, &self.token_endpoint)?)
			.scopes_supported(self.scopes_supported);

		if let Some(raw) = self.device_authorization_endpoint.as_deref() {
			builder = builder
				.device_authorization_endpoint(parse_endpoint(Endpoint::DeviceAuthorization, raw)?);
		}
		if let Some(raw) = self.userinfo_endpoint.as_deref() {
			builder = builder.userinfo_endpoint(parse_endpoint(Endpoint::Userinfo, raw)?);
		}
		if let Some(raw) = self.jwks_uri.as_deref() {
			builder = builder.jwks_uri(parse_endpoint(Endpoint::Jwks, raw)?);
		}

		Ok(builder.build()?)
	}
}

/// Builds the discovery document URL for `issuer`.
pub fn discovery_url(issuer: &str) -> Result<Url, ConfigError> {
	let issuer = issuer.trim();

	if issuer.is_empty() {
		return Err(ConfigError::MissingIssuer);
	}

	Url::parse(&format!("{}{DISCOVERY_PATH}", normalize_issuer(issuer)))
		.map_err(|source| ConfigError::InvalidIssuer { source })
}

fn normalize_issuer(issuer: &str) -> &str {
	issuer.strip_suffix('/').unwrap_or(issuer)
}
