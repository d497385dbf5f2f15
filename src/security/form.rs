use crate::error::{EngineError, Result};
use crate::request::MockRequest;
use crate::response::Response;
use crate::security::Authenticator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Required form fields with their expected values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormAuth {
    /// Field name to expected value
    pub fields: BTreeMap<String, String>,
    /// Response returned when authentication fails
    #[serde(default, alias = "error_response", skip_serializing_if = "Option::is_none")]
    pub unauthorized_response: Option<Arc<Response>>,
}

impl FormAuth {
    /// Require every `(field, value)` pair.
    pub fn new<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
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

impl Authenticator for FormAuth {
    fn authenticate(&self, request: &MockRequest) -> Result<()> {
        for (field, expected) in &self.fields {
            let sent = request
                .form_field(field)
                .ok_or_else(|| EngineError::auth(format!("Missing authentication field \"{field}\".")))?;
            if sent != expected {
                return Err(EngineError::auth(format!(
                    "Incorrect value \"{sent}\" in field \"{field}\", expected \"{expected}\"."
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_form_auth_requires_every_field() {
        let auth = FormAuth::new([("user", "jo"), ("pass", "pw")]);
        let ok = MockRequest::new(Method::POST, "/login")
            .with_form_field("user", "jo")
            .with_form_field("pass", "pw")
            .with_form_field("extra", "ignored");
        assert!(auth.authenticate(&ok).is_ok());

        let missing = MockRequest::new(Method::POST, "/login").with_form_field("user", "jo");
        let err = auth.authenticate(&missing).unwrap_err();
        assert!(err.to_string().contains("\"pass\""));

        let wrong = MockRequest::new(Method::POST, "/login")
            .with_form_field("user", "jo")
            .with_form_field("pass", "bad");
        assert!(auth.authenticate(&wrong).is_err());
    }
}
