//! Access token relay across RPC boundaries.
//!
//! RPC metadata is modelled as an HTTP header map (gRPC metadata travels as HTTP/2
//! headers). The caller appends its access token under [`TOKEN_METADATA_KEY`]; the callee
//! extracts it and resolves it into identity claims through a [`Verifier`].

// crates.io
use oauth2::http::{HeaderMap, HeaderValue};
// self
use crate::{
	_prelude::*,
	auth::{IdentityClaims, Token},
	error::ProtocolError,
	flows::Verifier,
	verifier,
};

/// Metadata key carrying the access token.
pub const TOKEN_METADATA_KEY: &str = "token";

/// Returns the single token carried by `metadata`.
///
/// Absent metadata, a missing entry, more than one entry, or a value that is not visible
/// ASCII are all rejected.
pub fn extract_token(metadata: Option<&HeaderMap>) -> Result<&str> {
	let metadata = metadata.ok_or(ProtocolError::MetadataMissing)?;
	let mut values = metadata.get_all(TOKEN_METADATA_KEY).iter();

	match (values.next(), values.next()) {
		(Some(value), None) => Ok(value.to_str().map_err(|_| ProtocolError::TokenMissing)?),
		_ => Err(ProtocolError::TokenMissing.into()),
	}
}

/// Extracts the relayed token and verifies it.
pub async fn verify_metadata<V>(
	metadata: Option<&HeaderMap>,
	verifier: &V,
) -> Result<IdentityClaims>
where
	V: ?Sized + Verifier,
{
	let access_token = extract_token(metadata)?;

	verifier::verify(access_token, verifier).await
}

/// Appends `token`'s access token to outgoing metadata.
pub fn append_token(metadata: &mut HeaderMap, token: &Token) -> Result<()> {
	let value = HeaderValue::from_str(token.access_token.expose())
		.map_err(|_| ProtocolError::InvalidTokenValue)?;

	metadata.append(TOKEN_METADATA_KEY, value);

	Ok(())
}
