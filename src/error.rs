//! Crate-level error types shared across discovery, login flows, verification, and relay.

// self
use crate::{_prelude::*, provider::Endpoint};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, local listener).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Provider payload could not be decoded.
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// Provider answered with an OAuth error or a non-success status.
	#[error(transparent)]
	Provider(#[from] ProviderError),
	/// Peer violated the login or relay protocol.
	#[error(transparent)]
	Protocol(#[from] ProtocolError),
	/// ID token signature or claim validation failed.
	#[error(transparent)]
	Verification(#[from] VerificationError),

	/// Device code lapsed before the user approved it.
	#[error("Device code expired before the user completed authorization.")]
	DeviceCodeExpired,
	/// Caller cancelled the attempt or its deadline elapsed.
	#[error("Login attempt stopped: {0}.")]
	Cancelled(CancelReason),
}
impl Error {
	/// Returns `true` when the attempt ended because of cancellation or a deadline.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled(_))
	}

	/// Returns the provider rejection details, if the provider refused the request.
	pub fn provider_error(&self) -> Option<&ProviderError> {
		match self {
			Self::Provider(err) => Some(err),
			_ => None,
		}
	}
}

/// Why a [`FlowContext`](crate::flows::FlowContext) stopped an attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CancelReason {
	/// Explicit cancellation through the context's token.
	Cancelled,
	/// The context deadline elapsed.
	DeadlineExceeded,
}
impl Display for CancelReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Cancelled => f.write_str("context cancelled"),
			Self::DeadlineExceeded => f.write_str("context deadline exceeded"),
		}
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Issuer URL is empty.
	#[error("Issuer URL is not configured.")]
	MissingIssuer,
	/// Issuer URL cannot be parsed.
	#[error("Issuer URL is invalid.")]
	InvalidIssuer {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Discovery metadata advertised a different issuer than configured.
	#[error("Discovery document issuer `{found}` does not match the configured issuer `{expected}`.")]
	IssuerMismatch {
		/// Issuer the client was configured with.
		expected: String,
		/// Issuer reported by the provider.
		found: String,
	},
	/// Provider metadata is unusable.
	#[error(transparent)]
	InvalidDescriptor(#[from] crate::provider::ProviderDescriptorError),
	/// Provider does not advertise an endpoint the operation needs.
	#[error("Provider does not advertise a {endpoint} endpoint.")]
	MissingEndpoint {
		/// Endpoint that is required but absent.
		endpoint: Endpoint,
	},
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, loopback listener).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the {endpoint} endpoint.")]
	Network {
		/// Endpoint being called.
		endpoint: Endpoint,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure, including loopback listener setup.
	#[error("I/O error occurred during the login attempt.")]
	Io(#[from] std::io::Error),
	/// Loopback callback server stopped before a token was delivered.
	#[error("Callback server stopped before a token was delivered.")]
	CallbackServerStopped,
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(endpoint: Endpoint, src: impl Into<BoxError>) -> Self {
		Self::Network { endpoint, source: src.into() }
	}
}

/// Provider payloads that could not be decoded.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// Response body is not the expected JSON document.
	#[error("The {endpoint} endpoint returned malformed JSON.")]
	Json {
		/// Endpoint that produced the payload.
		endpoint: Endpoint,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Response could not be interpreted at all.
	#[error("The {endpoint} endpoint returned an unexpected response: {message}.")]
	Unexpected {
		/// Endpoint that produced the payload.
		endpoint: Endpoint,
		/// Summary of what went wrong.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// OAuth error payload or non-success status returned by the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderError {
	/// Endpoint that rejected the request.
	pub endpoint: Endpoint,
	/// OAuth `error` code, or `http_<status>` when the body carried none.
	pub error: String,
	/// Optional human-readable `error_description`.
	pub description: Option<String>,
	/// HTTP status code, when available.
	pub status: Option<u16>,
}
impl Display for ProviderError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match &self.description {
			Some(description) => write!(
				f,
				"The {} endpoint rejected the request ({}): {description}.",
				self.endpoint, self.error
			),
			None =>
				write!(f, "The {} endpoint rejected the request: {}.", self.endpoint, self.error),
		}
	}
}
impl StdError for ProviderError {}

/// Peer behavior that violates the login or relay protocol.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ProtocolError {
	/// Callback `state` did not match the attempt's state.
	#[error("state did not match")]
	StateMismatch,
	/// Callback carried no authorization code.
	#[error("authorization code is missing")]
	MissingCode,
	/// Authorization header is not `<scheme> <credential>`.
	#[error("authorization header is malformed")]
	MalformedAuthorization,
	/// RPC call carried no metadata.
	#[error("metadata is missing")]
	MetadataMissing,
	/// RPC metadata did not carry exactly one token value.
	#[error("token is missing")]
	TokenMissing,
	/// Token cannot be encoded as a metadata value.
	#[error("token is not a valid metadata value")]
	InvalidTokenValue,
}

/// ID token verification failures.
#[derive(Debug, ThisError)]
pub enum VerificationError {
	/// Token header has no `kid` and the key set holds more than one key.
	#[error("ID token header has no key id and the key set is ambiguous.")]
	MissingKeyId,
	/// No key in the provider key set matches the token's `kid`.
	#[error("No signing key matches key id `{kid}`.")]
	UnknownSigningKey {
		/// Key id carried by the token header.
		kid: String,
	},
	/// Signature, algorithm, or registered-claim validation failed.
	#[error("ID token is invalid.")]
	Jwt(#[from] jsonwebtoken::errors::Error),
}
