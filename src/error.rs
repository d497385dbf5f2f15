//! Engine error kinds.
//!
//! Every fallible engine operation returns [`EngineError`]. Construction and
//! validation errors are raised to the management caller and never partially
//! apply; authentication and match failures are resolved by
//! [`crate::service::MockService`] into fallback responses instead of reaching
//! the end client as errors.

use http::StatusCode;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;

/// All recoverable error kinds raised by the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// A path pattern contains an unknown placeholder type or does not compile.
    #[error("invalid path pattern '{pattern}': {reason}")]
    PathPattern {
        /// The offending pattern as supplied
        pattern: String,
        /// What is wrong with it
        reason: String,
    },

    /// `min_delay > max_delay`, or a negative/non-finite bound.
    #[error("invalid delay: {0}")]
    DelayRange(String),

    /// A response does not satisfy any validator, or removing/adding a
    /// validator would orphan an existing response.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A definition (method name, status code, JSON schema, ...) is malformed.
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    /// Route id collision.
    #[error("route id \"{0}\" already exists")]
    DuplicateRoute(String),

    /// Response id collision within one route.
    #[error("response id \"{0}\" already exists")]
    DuplicateResponse(String),

    /// Validator id collision within one route.
    #[error("response validator id \"{0}\" already exists")]
    DuplicateValidator(String),

    /// Operation referenced a route id that does not exist.
    #[error("route \"{0}\" was not found")]
    MissingRoute(String),

    /// Operation referenced a response id that does not exist.
    #[error("response \"{0}\" was not found")]
    MissingResponse(String),

    /// Operation referenced a validator id that does not exist.
    #[error("response validator \"{0}\" was not found")]
    MissingValidator(String),

    /// The request did not pass the route's authentication strategy.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A selection was attempted with no eligible candidate.
    #[error("no suitable response found")]
    NoSuitableResponse,
}

impl EngineError {
    /// Shorthand for [`EngineError::Authentication`].
    pub fn auth(reason: impl Into<String>) -> Self {
        EngineError::Authentication(reason.into())
    }

    /// HTTP status the management layer should answer with for this error.
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        match self {
            EngineError::PathPattern { .. }
            | EngineError::DelayRange(_)
            | EngineError::Validation(_)
            | EngineError::InvalidDefinition(_) => StatusCode::BAD_REQUEST,
            EngineError::DuplicateRoute(_)
            | EngineError::DuplicateResponse(_)
            | EngineError::DuplicateValidator(_) => StatusCode::CONFLICT,
            EngineError::MissingRoute(_)
            | EngineError::MissingResponse(_)
            | EngineError::MissingValidator(_)
            | EngineError::NoSuitableResponse => StatusCode::NOT_FOUND,
            EngineError::Authentication(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            EngineError::DuplicateRoute("a".into()).http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            EngineError::MissingResponse("a".into()).http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            EngineError::DelayRange("x".into()).http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(EngineError::auth("nope").http_status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_display_carries_detail() {
        let err = EngineError::PathPattern {
            pattern: "/a/{x:float}".into(),
            reason: "unknown placeholder type 'float'".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid path pattern '/a/{x:float}': unknown placeholder type 'float'"
        );
    }
}
