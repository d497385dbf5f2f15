use crate::error::{EngineError, Result};
use crate::request::MockRequest;
use crate::response::Response;
use crate::security::Authenticator;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A named cookie that must carry a given value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieAuth {
    /// Cookie name
    pub name: String,
    /// Expected value
    pub value: String,
    /// Response returned when authentication fails
    #[serde(default, alias = "error_response", skip_serializing_if = "Option::is_none")]
    pub unauthorized_response: Option<Arc<Response>>,
}

impl CookieAuth {
    /// Require cookie `name` to equal `value`.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            unauthorized_response: None,
        }
    }

    /// Set the response returned on failure.
    #[must_use]
    pub fn with_unauthorized_response(mut self, response: Response) -> Self {
        self.unauthorized_response = Some(Arc::new(response));
        self
    }
}

impl Authenticator for CookieAuth {
    fn authenticate(&self, request: &MockRequest) -> Result<()> {
        let sent = request.cookie(&self.name).ok_or_else(|| {
            EngineError::auth(format!("Missing authentication cookie \"{}\".", self.name))
        })?;
        if sent != self.value {
            return Err(EngineError::auth(format!(
                "Incorrect value \"{sent}\" of cookie \"{}\", expected \"{}\".",
                self.name, self.value
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_cookie_auth() {
        let auth = CookieAuth::new("session", "abc");
        let ok = MockRequest::new(Method::GET, "/").with_header("Cookie", "theme=dark; session=abc");
        assert!(auth.authenticate(&ok).is_ok());
        let wrong = MockRequest::new(Method::GET, "/").with_cookie("session", "xyz");
        assert!(auth.authenticate(&wrong).is_err());
        assert!(auth.authenticate(&MockRequest::new(Method::GET, "/")).is_err());
    }
}
