//! Accessors for the claims a Keycloak realm returns from userinfo.
//!
//! Every accessor returns `""` (or `false`) when the claim is absent or has another type.

// self
use crate::auth::IdentityClaims;

impl IdentityClaims {
	/// Stable subject identifier (`sub`).
	pub fn id(&self) -> &str {
		self.string("sub")
	}

	/// Login name (`preferred_username`).
	pub fn username(&self) -> &str {
		self.string("preferred_username")
	}

	/// Email address (`email`).
	pub fn email(&self) -> &str {
		self.string("email")
	}

	/// Whether the realm verified the email address (`email_verified`).
	pub fn email_verified(&self) -> bool {
		self.flag("email_verified")
	}

	/// Display name (`name`).
	pub fn full_name(&self) -> &str {
		self.string("name")
	}

	/// Given name (`given_name`).
	pub fn given_name(&self) -> &str {
		self.string("given_name")
	}

	/// Family name (`family_name`).
	pub fn family_name(&self) -> &str {
		self.string("family_name")
	}
}
