//! Validated provider metadata shared by every flow.

/// Builder API for assembling provider descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
	/// Public clients that prove possession via PKCE only.
	NoneWithPkce,
}

/// Provider endpoints the crate talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
	/// `/.well-known/openid-configuration`.
	Discovery,
	/// Browser-facing authorization endpoint.
	Authorization,
	/// Token endpoint used for code exchange and device polling.
	Token,
	/// RFC 8628 device authorization endpoint.
	DeviceAuthorization,
	/// OIDC userinfo endpoint.
	Userinfo,
	/// JSON Web Key Set published by the provider.
	Jwks,
}
impl Endpoint {
	/// Returns a stable label suitable for log fields and error messages.
	pub const fn as_str(self) -> &'static str {
		match self {
			Endpoint::Discovery => "discovery",
			Endpoint::Authorization => "authorization",
			Endpoint::Token => "token",
			Endpoint::DeviceAuthorization => "device authorization",
			Endpoint::Userinfo => "userinfo",
			Endpoint::Jwks => "jwks",
		}
	}
}
impl Display for Endpoint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint used by the browser flow.
	pub authorization: Url,
	/// Token endpoint used for code exchange and device polling.
	pub token: Url,
	/// Device authorization endpoint, when the provider supports RFC 8628.
	pub device_authorization: Option<Url>,
	/// Userinfo endpoint.
	pub userinfo: Option<Url>,
	/// JWKS endpoint used to verify ID tokens.
	pub jwks: Option<Url>,
}

/// Immutable provider descriptor consumed by flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Issuer identifier exactly as published by the provider.
	pub issuer: String,
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Scopes the provider advertises, if any.
	pub scopes_supported: Vec<String>,
}
impl ProviderDescriptor {
	/// Creates a new builder for the provided issuer.
	pub fn builder(issuer: impl Into<String>) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(issuer)
	}

	/// Returns the URL for `endpoint`, failing when the provider does not advertise it.
	pub fn endpoint(&self, endpoint: Endpoint) -> Result<&Url, ConfigError> {
		let url = match endpoint {
			Endpoint::Authorization => Some(&self.endpoints.authorization),
			Endpoint::Token => Some(&self.endpoints.token),
			Endpoint::DeviceAuthorization => self.endpoints.device_authorization.as_ref(),
			Endpoint::Userinfo => self.endpoints.userinfo.as_ref(),
			Endpoint::Jwks => self.endpoints.jwks.as_ref(),
			Endpoint::Discovery => None,
		};

		url.ok_or(ConfigError::MissingEndpoint { endpoint })
	}
}
