//! Token and identity models returned by login flows and verifiers.

pub mod claims;
pub mod keycloak;
pub mod secret;
pub mod token;

pub use claims::*;
pub use secret::*;
pub use token::*;
