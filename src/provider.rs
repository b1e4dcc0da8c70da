//! Provider-facing metadata and ID token verification.
//!
//! `discovery` fetches and validates `/.well-known/openid-configuration`, `descriptor`
//! holds the validated endpoint set produced from it, and `verifier` checks ID token
//! signatures against the provider's published key set.

pub mod descriptor;
pub mod discovery;
pub mod verifier;

pub use descriptor::*;
pub use discovery::*;
pub use verifier::*;
