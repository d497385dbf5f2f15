//! # Security Module
//!
//! Authentication strategies a route can require before one of its responses
//! is returned.
//!
//! Every strategy implements [`Authenticator`]. Routes hold the closed
//! [`Auth`] enum, resolved from the `method` field of the route's `auth`
//! object at deserialization time:
//!
//! | `method` | Provider | Checks |
//! |---|---|---|
//! | *(absent / null)* | [`Auth::None`] | nothing |
//! | `token` | [`TokenAuth`] | `Authorization: Bearer <token>` |
//! | `basic` | [`BasicAuth`] | `Authorization: [Basic ]<base64(user:password)>` |
//! | `form` | [`FormAuth`] | urlencoded form fields |
//! | `cookie` | [`CookieAuth`] | one named cookie |
//! | `hmac` | [`HmacAuth`] | `hmac_timestamp` + `hmac_sign` query parameters |
//!
//! Each provider may carry an `unauthorized_response` that the service returns
//! when authentication fails. Failures are never surfaced to the end client as
//! errors; they resolve to that response (or a router-level 401 fallback).
//!
//! ```rust
//! use decoy::security::{Auth, Authenticator};
//! use decoy::request::MockRequest;
//! use http::Method;
//!
//! let auth: Auth = serde_json::from_str(r#"{"method": "token", "token": "abc"}"#).unwrap();
//! let request = MockRequest::new(Method::GET, "/").with_header("Authorization", "Bearer abc");
//! assert!(auth.authenticate(&request).is_ok());
//! ```

use crate::error::Result;
use crate::request::MockRequest;
use crate::response::Response;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

/// Common contract of every authentication strategy.
pub trait Authenticator: Send + Sync {
    /// Check the request.
    ///
    /// # Errors
    ///
    /// [`crate::error::EngineError::Authentication`] with a human readable
    /// reason when the request does not carry valid credentials.
    fn authenticate(&self, request: &MockRequest) -> Result<()>;
}

/// Authentication policy of a route.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum Auth {
    /// No authentication; every request passes
    #[default]
    None,
    /// Bearer token
    Token(TokenAuth),
    /// HTTP basic credentials
    Basic(BasicAuth),
    /// Form fields
    Form(FormAuth),
    /// Cookie value
    Cookie(CookieAuth),
    /// HMAC-SHA1 signed URL
    Hmac(HmacAuth),
}

impl Auth {
    /// Configuration name of the strategy.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Auth::None => "none",
            Auth::Token(_) => "token",
            Auth::Basic(_) => "basic",
            Auth::Form(_) => "form",
            Auth::Cookie(_) => "cookie",
            Auth::Hmac(_) => "hmac",
        }
    }

    /// Whether this is [`Auth::None`].
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Auth::None)
    }

    /// Response to return when authentication fails, if configured.
    #[must_use]
    pub fn unauthorized_response(&self) -> Option<&Arc<Response>> {
        match self {
            Auth::None => None,
            Auth::Token(p) => p.unauthorized_response.as_ref(),
            Auth::Basic(p) => p.unauthorized_response.as_ref(),
            Auth::Form(p) => p.unauthorized_response.as_ref(),
            Auth::Cookie(p) => p.unauthorized_response.as_ref(),
            Auth::Hmac(p) => p.unauthorized_response.as_ref(),
        }
    }

    /// Fill in HMAC tolerances that were not set explicitly.
    pub fn apply_hmac_defaults(&mut self, defaults: HmacTolerance) {
        if let Auth::Hmac(p) = self {
            p.apply_defaults(defaults);
        }
    }
}

impl Authenticator for Auth {
    fn authenticate(&self, request: &MockRequest) -> Result<()> {
        match self {
            Auth::None => Ok(()),
            Auth::Token(p) => p.authenticate(request),
            Auth::Basic(p) => p.authenticate(request),
            Auth::Form(p) => p.authenticate(request),
            Auth::Cookie(p) => p.authenticate(request),
            Auth::Hmac(p) => p.authenticate(request),
        }
    }
}

/// Deserialize an `auth` field where `null` means [`Auth::None`].
pub(crate) fn deserialize_nullable<'de, D>(deserializer: D) -> std::result::Result<Auth, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Auth>::deserialize(deserializer)?.unwrap_or_default())
}

// Re-export all providers
pub use basic::BasicAuth;
pub use cookie::CookieAuth;
pub use form::FormAuth;
pub use hmac_url::{HmacAuth, HmacTolerance};
pub use token::TokenAuth;

// Provider modules
mod basic;
mod cookie;
mod form;
mod hmac_url;
mod token;
