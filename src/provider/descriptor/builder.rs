// std
use std::net::IpAddr;
// crates.io
use url::Host;
// self
use crate::{
	_prelude::*,
	provider::{Endpoint, ProviderDescriptor, ProviderEndpoints},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderDescriptorError {
	/// Issuer identifier is empty.
	#[error("Missing issuer identifier.")]
	MissingIssuer,
	/// Authorization endpoint is mandatory for OIDC providers.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Token endpoint is mandatory for all flows.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Endpoint URL cannot be parsed.
	#[error("The {endpoint} endpoint is not a valid URL: {url}.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: Endpoint,
		/// Raw value published by the provider.
		url: String,
	},
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: Endpoint,
		/// Endpoint URL that failed validation.
		url: String,
	},
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	/// Issuer identifier for the descriptor being constructed.
	pub issuer: String,
	/// Authorization endpoint.
	pub authorization_endpoint: Option<Url>,
	/// Token endpoint.
	pub token_endpoint: Option<Url>,
	/// Optional device authorization endpoint.
	pub device_authorization_endpoint: Option<Url>,
	/// Optional userinfo endpoint.
	pub userinfo_endpoint: Option<Url>,
	/// Optional JWKS endpoint.
	pub jwks_uri: Option<Url>,
	/// Scopes advertised by the provider.
	pub scopes_supported: Vec<String>,
}
impl ProviderDescriptorBuilder {
	/// Creates a new builder seeded with the provided issuer.
	pub fn new(issuer: impl Into<String>) -> Self {
		Self {
			issuer: issuer.into(),
			authorization_endpoint: None,
			token_endpoint: None,
			device_authorization_endpoint: None,
			userinfo_endpoint: None,
			jwks_uri: None,
			scopes_supported: Vec::new(),
		}
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the device authorization endpoint.
	pub fn device_authorization_endpoint(mut self, url: Url) -> Self {
		self.device_authorization_endpoint = Some(url);

		self
	}

	/// Sets the userinfo endpoint.
	pub fn userinfo_endpoint(mut self, url: Url) -> Self {
		self.userinfo_endpoint = Some(url);

		self
	}

	/// Sets the JWKS endpoint.
	pub fn jwks_uri(mut self, url: Url) -> Self {
		self.jwks_uri = Some(url);

		self
	}

	/// Records the scopes advertised by the provider.
	pub fn scopes_supported<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes_supported = scopes.into_iter().map(Into::into).collect();

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		if self.issuer.trim().is_empty() {
			return Err(ProviderDescriptorError::MissingIssuer);
		}

		let authorization = self
			.authorization_endpoint
			.ok_or(ProviderDescriptorError::MissingAuthorizationEndpoint)?;
		let token = self.token_endpoint.ok_or(ProviderDescriptorError::MissingTokenEndpoint)?;
		let endpoints = ProviderEndpoints {
			authorization,
			token,
			device_authorization: self.device_authorization_endpoint,
			userinfo: self.userinfo_endpoint,
			jwks: self.jwks_uri,
		};
		let descriptor = ProviderDescriptor {
			issuer: self.issuer,
			endpoints,
			scopes_supported: self.scopes_supported,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ProviderDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), ProviderDescriptorError> {
		validate_endpoint(Endpoint::Authorization, &self.endpoints.authorization)?;
		validate_endpoint(Endpoint::Token, &self.endpoints.token)?;

		let optional = [
			(Endpoint::DeviceAuthorization, self.endpoints.device_authorization.as_ref()),
			(Endpoint::Userinfo, self.endpoints.userinfo.as_ref()),
			(Endpoint::Jwks, self.endpoints.jwks.as_ref()),
		];

		for (endpoint, url) in optional {
			if let Some(url) = url {
				validate_endpoint(endpoint, url)?;
			}
		}

		Ok(())
	}
}

/// Parses a provider-published endpoint string.
pub(crate) fn parse_endpoint(
	endpoint: Endpoint,
	raw: &str,
) -> Result<Url, ProviderDescriptorError> {
	Url::parse(raw)
		.map_err(|_| ProviderDescriptorError::InvalidEndpoint { endpoint, url: raw.to_owned() })
}

fn validate_endpoint(endpoint: Endpoint, url: &Url) -> Result<(), ProviderDescriptorError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(ProviderDescriptorError::InsecureEndpoint { endpoint, url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
		Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		None => false,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(raw: &str) -> Url {
		Url::parse(raw).expect("Test URL should parse.")
	}

	#[test]
	fn rejects_plain_http_for_remote_hosts() {
		let err = ProviderDescriptor::builder("http://idp.example.com")
			.authorization_endpoint(url("http://idp.example.com/auth"))
			.token_endpoint(url("https://idp.example.com/token"))
			.build()
			.expect_err("Remote plain-HTTP endpoints should be rejected.");

		assert_eq!(err, ProviderDescriptorError::InsecureEndpoint {
			endpoint: Endpoint::Authorization,
			url: "http://idp.example.com/auth".into(),
		});
	}

	#[test]
	fn allows_loopback_http_endpoints() {
		let descriptor = ProviderDescriptor::builder("http://127.0.0.1:8080")
			.authorization_endpoint(url("http://127.0.0.1:8080/auth"))
			.token_endpoint(url("http://localhost:8080/token"))
			.jwks_uri(url("http://[::1]:8080/certs"))
			.build()
			.expect("Loopback endpoints should be accepted.");

		assert_eq!(
			descriptor.endpoints.jwks.as_ref().map(Url::as_str),
			Some("http://[::1]:8080/certs")
		);
	}

	#[test]
	fn validates_optional_endpoints() {
		let err = ProviderDescriptor::builder("https://idp.example.com")
			.authorization_endpoint(url("https://idp.example.com/auth"))
			.token_endpoint(url("https://idp.example.com/token"))
			.device_authorization_endpoint(url("http://idp.example.com/device"))
			.build()
			.expect_err("Insecure device endpoint should be rejected.");

		assert!(matches!(err, ProviderDescriptorError::InsecureEndpoint {
			endpoint: Endpoint::DeviceAuthorization,
			..
		}));
	}

	#[test]
	fn requires_token_endpoint() {
		let err = ProviderDescriptor::builder("https://idp.example.com")
			.authorization_endpoint(url("https://idp.example.com/auth"))
			.build()
			.expect_err("Token endpoint is mandatory.");

		assert_eq!(err, ProviderDescriptorError::MissingTokenEndpoint);
	}
}
