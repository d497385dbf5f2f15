use crate::error::{EngineError, Result};
use crate::request::MockRequest;
use crate::response::Response;
use crate::security::Authenticator;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Bearer token carried in the `Authorization` header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenAuth {
    /// Expected token
    pub token: String,
    /// Response returned when authentication fails
    #[serde(default, alias = "error_response", skip_serializing_if = "Option::is_none")]
    pub unauthorized_response: Option<Arc<Response>>,
}

impl TokenAuth {
    /// Require `Authorization: Bearer <token>`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
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

impl Authenticator for TokenAuth {
    fn authenticate(&self, request: &MockRequest) -> Result<()> {
        let header = request
            .header("authorization")
            .filter(|h| !h.is_empty())
            .ok_or_else(|| EngineError::auth("Missing authentication header \"Authorization\"."))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| EngineError::auth(format!("Invalid authentication header {header}.")))?;
        if token != self.token {
            debug!("Bearer token mismatch");
            return Err(EngineError::auth(format!(
                "Authentication token {token} doesn't match."
            )));
        }
        Ok(())
    }
}
