use crate::error::{EngineError, Result};
use crate::request::MockRequest;
use crate::response::Response;
use crate::security::Authenticator;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// HTTP basic credentials carried in the `Authorization` header.
///
/// The header value is the base64 encoding of `username:password`,
/// optionally prefixed by `Basic `.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicAuth {
    /// Expected user name
    pub username: String,
    /// Expected password
    pub password: String,
    /// Response returned when authentication fails
    #[serde(default, alias = "error_response", skip_serializing_if = "Option::is_none")]
    pub unauthorized_response: Option<Arc<Response>>,
}

impl BasicAuth {
    /// Require the given credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            unauthorized_response: None,
        }
    }

    /// Set the response returned on failure.
    #[must_use]
    pub fn with_unauthorized_response(mut self, response: Response) -> Self {
        self.unauthorized_response = Some(Arc::new(response));
        self
    }

    fn decode(header: &str) -> Result<(String, String)> {
        let invalid = || EngineError::auth(format!("Invalid authentication header {header}."));
        let encoded = match header.split_once(' ') {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("basic") => rest.trim(),
            Some(_) => return Err(invalid()),
            None => header.trim(),
        };
        let bytes = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| invalid())?;
        let decoded = String::from_utf8(bytes).map_err(|_| invalid())?;
        let (username, password) = decoded.split_once(':').ok_or_else(invalid)?;
        Ok((username.to_string(), password.to_string()))
    }
}

impl Authenticator for BasicAuth {
    fn authenticate(&self, request: &MockRequest) -> Result<()> {
        let header = request
            .header("authorization")
            .filter(|h| !h.is_empty())
            .ok_or_else(|| EngineError::auth("Missing authentication header \"Authorization\"."))?;
        let (username, password) = Self::decode(header)?;
        if username != self.username || password != self.password {
            return Err(EngineError::auth(format!(
                "Authentication {username}:{password} doesn't match."
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn request(header: &str) -> MockRequest {
        MockRequest::new(Method::GET, "/").with_header("Authorization", header)
    }

    #[test]
    fn test_basic_auth_with_and_without_scheme() {
        let auth = BasicAuth::new("user", "pass");
        let encoded = general_purpose::STANDARD.encode("user:pass");
        assert!(auth.authenticate(&request(&encoded)).is_ok());
        assert!(auth.authenticate(&request(&format!("Basic {encoded}"))).is_ok());
    }

    #[test]
    fn test_basic_auth_failures() {
        let auth = BasicAuth::new("user", "pass");
        let wrong = general_purpose::STANDARD.encode("user:nope");
        assert!(auth.authenticate(&request(&wrong)).is_err());
        assert!(auth.authenticate(&request("!!not base64!!")).is_err());
        let no_colon = general_purpose::STANDARD.encode("userpass");
        assert!(auth.authenticate(&request(&no_colon)).is_err());
        assert!(auth
            .authenticate(&MockRequest::new(Method::GET, "/"))
            .is_err());
    }
}
