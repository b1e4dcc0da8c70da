//! Identity claims returned by the userinfo endpoint or carried in ID tokens.

// crates.io
use serde_json::{Map, Value};
// self
use crate::_prelude::*;

/// Arbitrary JSON claim set keyed by claim name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityClaims(Map<String, Value>);
impl IdentityClaims {
	/// Creates an empty claim set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the raw claim value.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.0.get(name)
	}

	/// Returns the claim as a string, or `""` when it is absent or not a string.
	pub fn string(&self, name: &str) -> &str {
		self.0.get(name).and_then(Value::as_str).unwrap_or_default()
	}

	/// Returns the claim as a boolean, or `false` when it is absent or not a boolean.
	pub fn flag(&self, name: &str) -> bool {
		self.0.get(name).and_then(Value::as_bool).unwrap_or_default()
	}

	/// Inserts or replaces a claim.
	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
		self.0.insert(name.into(), value.into())
	}

	/// Number of claims.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when no claims are present.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Borrows the underlying JSON object.
	pub fn as_map(&self) -> &Map<String, Value> {
		&self.0
	}

	/// Consumes the claim set and returns the underlying JSON object.
	pub fn into_map(self) -> Map<String, Value> {
		self.0
	}
}
impl From<Map<String, Value>> for IdentityClaims {
	fn from(map: Map<String, Value>) -> Self {
		Self(map)
	}
}
