//! Client-side OpenID Connect login for CLIs and backend services: device-code and loopback
//! browser flows, userinfo-backed identity verification, and RPC token relay.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

// Emits a `tracing` event when the feature is enabled; compiles to a borrow of the fields
// otherwise so call sites stay warning-free.
macro_rules! flow_event {
	($level:ident, $message:literal $(, $field:ident = $value:expr)* $(,)?) => {{
		#[cfg(feature = "tracing")]
		{
			tracing::$level!($($field = %$value,)* $message);
		}
		#[cfg(not(feature = "tracing"))]
		{
			$(let _ = &$value;)*
		}
	}};
}

pub mod auth;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod relay;
pub mod verifier;

pub use auth::{IdentityClaims, Token};
pub use config::OidcConfig;
pub use error::{Error, Result};
pub use flows::{Authenticator, BrowserFlow, DeviceFlow, FlowContext, OidcClient, Verifier};
pub use provider::{IdTokenVerifier, JwksVerifier};
pub use verifier::{UserInfoVerifier, verify};

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::OnceCell as AsyncOnceCell;
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
