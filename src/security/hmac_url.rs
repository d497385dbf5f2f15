use crate::error::{EngineError, Result};
use crate::request::MockRequest;
use crate::response::Response;
use crate::security::Authenticator;
use ::hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;
use tracing::debug;

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_PARAM: &str = "hmac_sign";
const TIMESTAMP_PARAM: &str = "hmac_timestamp";

/// Accepted distance between a signed timestamp and the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HmacTolerance {
    /// How old a timestamp may be, in seconds
    pub past_seconds: u64,
    /// How far in the future a timestamp may be, in seconds
    pub future_seconds: u64,
}

impl Default for HmacTolerance {
    fn default() -> Self {
        Self {
            past_seconds: 3600,
            future_seconds: 5,
        }
    }
}

/// URL signed with HMAC-SHA1.
///
/// The client appends `hmac_timestamp=<unix seconds>` to the query, signs
/// `path + "?" + query` with the shared key and appends the lowercase hex
/// digest as the final `hmac_sign` parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HmacAuth {
    /// Shared secret
    pub key: String,
    /// Seconds a timestamp may lie in the past; router default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub past_tolerance: Option<u64>,
    /// Seconds a timestamp may lie in the future; router default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub future_tolerance: Option<u64>,
    /// Response returned when authentication fails
    #[serde(default, alias = "error_response", skip_serializing_if = "Option::is_none")]
    pub unauthorized_response: Option<Arc<Response>>,
}

impl HmacAuth {
    /// Verify URLs signed with `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            past_tolerance: None,
            future_tolerance: None,
            unauthorized_response: None,
        }
    }

    /// Set an explicit tolerance window.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: HmacTolerance) -> Self {
        self.past_tolerance = Some(tolerance.past_seconds);
        self.future_tolerance = Some(tolerance.future_seconds);
        self
    }

    /// Set the response returned on failure.
    #[must_use]
    pub fn with_unauthorized_response(mut self, response: Response) -> Self {
        self.unauthorized_response = Some(Arc::new(response));
        self
    }

    /// Effective tolerance window.
    #[must_use]
    pub fn tolerance(&self) -> HmacTolerance {
        let defaults = HmacTolerance::default();
        HmacTolerance {
            past_seconds: self.past_tolerance.unwrap_or(defaults.past_seconds),
            future_seconds: self.future_tolerance.unwrap_or(defaults.future_seconds),
        }
    }

    pub(crate) fn apply_defaults(&mut self, defaults: HmacTolerance) {
        self.past_tolerance.get_or_insert(defaults.past_seconds);
        self.future_tolerance.get_or_insert(defaults.future_seconds);
    }

    /// Hex signature of `path?query`, where `query` is the raw query string
    /// without a trailing `hmac_sign` parameter.
    ///
    /// # Errors
    ///
    /// [`EngineError::Authentication`] if the key cannot initialise the MAC.
    pub fn sign(&self, path: &str, query: &str) -> Result<String> {
        let mut mac = HmacSha1::new_from_slice(self.key.as_bytes())
            .map_err(|e| EngineError::auth(format!("HMAC key rejected: {e}")))?;
        mac.update(path.as_bytes());
        mac.update(b"?");
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Raw query with everything from `&hmac_sign=` on removed.
    fn signed_part(query: &str) -> &str {
        match query.find("&hmac_sign=") {
            Some(index) => &query[..index],
            None => query,
        }
    }

    fn check_time(&self, timestamp: f64) -> Result<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        let tolerance = self.tolerance();
        if timestamp > now + tolerance.future_seconds as f64 {
            return Err(EngineError::auth(format!(
                "HMAC authentication failed, URL contains hmac_timestamp more than {} seconds in the future: {timestamp}",
                tolerance.future_seconds
            )));
        }
        if timestamp < now - tolerance.past_seconds as f64 {
            return Err(EngineError::auth(format!(
                "HMAC authentication failed, URL contains hmac_timestamp more than {} seconds in the past: {timestamp}",
                tolerance.past_seconds
            )));
        }
        Ok(())
    }
}

impl Authenticator for HmacAuth {
    fn authenticate(&self, request: &MockRequest) -> Result<()> {
        let timestamp = request.query_param(TIMESTAMP_PARAM).ok_or_else(|| {
            EngineError::auth(
                "HMAC authentication failed, URL is missing required parameter: \"hmac_timestamp\".",
            )
        })?;
        let signature = request.query_param(SIGNATURE_PARAM).ok_or_else(|| {
            EngineError::auth(
                "HMAC authentication failed, URL is missing a required parameter: \"hmac_sign\".",
            )
        })?;
        let timestamp: f64 = timestamp
            .trim()
            .parse()
            .ok()
            .filter(|t: &f64| t.is_finite())
            .ok_or_else(|| {
                EngineError::auth(format!(
                    "HMAC authentication failed, hmac_timestamp is not a number: {timestamp}"
                ))
            })?;

        let expected = self.sign(&request.path, Self::signed_part(&request.query))?;
        let provided = signature.to_ascii_lowercase();
        if !bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
            debug!(path = %request.path, "HMAC signature mismatch");
            return Err(EngineError::auth(
                "HMAC authentication failed, hash in URL parameter \"hmac_sign\" is invalid.",
            ));
        }
        self.check_time(timestamp)
    }
}
