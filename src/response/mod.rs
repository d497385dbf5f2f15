//! # Response Module
//!
//! Candidate replies a route (or the router, for global error responses) can
//! return, and the strategies that pick one of them per request.
//!
//! A [`Response`] is shared behind an `Arc` between the owning collection and
//! any in-flight request that selected it; its counters are atomic so
//! concurrent deliveries never tear an increment and never contend on a lock.
//!
//! Two counters are kept: `hits` (completed deliveries) and `uses`
//! (completed plus in-flight). `max_uses` is enforced on `uses`, which a
//! request reserves with [`Response::try_claim`] before it starts waiting on
//! the delay, so concurrent requests cannot overshoot the limit.
//!
//! ## JSON shape
//!
//! ```json
//! {
//!   "id": "ok",
//!   "status_code": 200,
//!   "body": {"name": "{{name}}"},
//!   "headers": {"x-mock": "1"},
//!   "weight": 0.5,
//!   "delay": [0.1, 0.3],
//!   "max_uses": 10
//! }
//! ```
//!
//! Only `status_code` is required. `hits` is included when serializing.

mod selector;
mod template;

pub use selector::ResponseSelector;
pub use template::{render_body, TemplateContext};

use crate::collections::Identified;
use crate::delay::Delay;
use crate::error::{EngineError, Result};
use crate::ids::ResponseId;
use http::StatusCode;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

const JSON_CONTENT_TYPE: &str = "application/json";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

fn default_weight() -> f64 {
    1.0
}

/// A concrete reply a route may return.
#[derive(Debug, Deserialize)]
#[serde(try_from = "ResponseDef")]
pub struct Response {
    id: ResponseId,
    status: StatusCode,
    body: Value,
    headers: BTreeMap<String, String>,
    weight: f64,
    delay: Delay,
    max_uses: Option<u64>,
    hits: AtomicU64,
    uses: AtomicU64,
}

/// Wire shape accepted when deserializing a [`Response`].
#[derive(Debug, Deserialize)]
struct ResponseDef {
    #[serde(default)]
    id: Option<ResponseId>,
    #[serde(alias = "status")]
    status_code: u16,
    #[serde(default)]
    body: Value,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default = "default_weight")]
    weight: f64,
    #[serde(default, deserialize_with = "crate::delay::deserialize_nullable")]
    delay: Delay,
    #[serde(default)]
    max_uses: Option<u64>,
    #[serde(default, alias = "used_count")]
    hits: u64,
}

impl TryFrom<ResponseDef> for Response {
    type Error = EngineError;

    fn try_from(def: ResponseDef) -> Result<Self> {
        let response = Response::new(def.status_code, def.body)?
            .with_id(def.id.unwrap_or_default())
            .with_weight(def.weight)?
            .with_delay(def.delay)
            .with_headers(def.headers);
        let response = match def.max_uses {
            Some(max) => response.with_max_uses(max),
            None => response,
        };
        response.hits.store(def.hits, Ordering::Relaxed);
        response.uses.store(def.hits, Ordering::Relaxed);
        Ok(response)
    }
}

impl Response {
    /// Create a response with a generated id, weight 1.0 and no delay.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidDefinition`] if `status_code` is not a valid
    /// HTTP status (100-999).
    pub fn new(status_code: u16, body: Value) -> Result<Self> {
        let status = StatusCode::from_u16(status_code).map_err(|_| {
            EngineError::InvalidDefinition(format!("invalid status code {status_code}"))
        })?;
        Ok(Self {
            id: ResponseId::generate(),
            status,
            body,
            headers: BTreeMap::new(),
            weight: default_weight(),
            delay: Delay::NONE,
            max_uses: None,
            hits: AtomicU64::new(0),
            uses: AtomicU64::new(0),
        })
    }

    /// Replace the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<ResponseId>) -> Self {
        self.id = id.into();
        self
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Replace all headers.
    #[must_use]
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Set the random-selection weight.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidDefinition`] if `weight` is negative or not finite.
    pub fn with_weight(mut self, weight: f64) -> Result<Self> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(EngineError::InvalidDefinition(format!(
                "response weight must be a non-negative number, got {weight}"
            )));
        }
        self.weight = weight;
        Ok(self)
    }

    /// Set the delay.
    #[must_use]
    pub fn with_delay(mut self, delay: Delay) -> Self {
        self.delay = delay;
        self
    }

    /// Limit how many times the response can be delivered.
    #[must_use]
    pub fn with_max_uses(mut self, max_uses: u64) -> Self {
        self.max_uses = Some(max_uses);
        self
    }

    /// Unique identifier.
    #[must_use]
    pub fn id(&self) -> &ResponseId {
        &self.id
    }

    /// HTTP status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// HTTP status as a number.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Configured body (JSON value or string).
    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Configured headers.
    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Random-selection weight.
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Delay applied before delivery.
    #[must_use]
    pub fn delay(&self) -> Delay {
        self.delay
    }

    /// Delivery limit, if any.
    #[must_use]
    pub fn max_uses(&self) -> Option<u64> {
        self.max_uses
    }

    /// How many times the response has been delivered.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Deliveries completed or in flight.
    #[must_use]
    pub fn uses(&self) -> u64 {
        self.uses.load(Ordering::Acquire)
    }

    /// Count one delivery. A delivery that was not claimed first also
    /// counts as a use.
    pub fn record_hit(&self) {
        let hits = self.hits.fetch_add(1, Ordering::AcqRel) + 1;
        self.uses.fetch_max(hits, Ordering::AcqRel);
    }

    /// Reserve one use; `false` once `max_uses` uses are taken.
    #[must_use]
    pub fn try_claim(&self) -> bool {
        match self.max_uses {
            None => {
                self.uses.fetch_add(1, Ordering::AcqRel);
                true
            }
            Some(max) => self
                .uses
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |uses| {
                    (uses < max).then_some(uses + 1)
                })
                .is_ok(),
        }
    }

    /// Give back a use reserved by [`Response::try_claim`] that was never
    /// delivered.
    pub fn release_claim(&self) {
        let hits = self.hits();
        let released = self
            .uses
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |uses| {
                (uses > hits).then(|| uses - 1)
            })
            .is_ok();
        if !released {
            debug!(response_id = %self.id, "No reserved use to release");
        }
    }

    /// Whether the response can still be selected.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.max_uses.map_or(true, |max| self.uses() < max)
    }

    /// Produce the bytes a transport writes, resolving `{{name}}` markers
    /// against `context`.
    #[must_use]
    pub fn render(&self, context: &TemplateContext) -> RenderedResponse {
        let body = render_body(&self.body, context);
        let (bytes, default_content_type) = match &body {
            Value::String(text) => (text.clone().into_bytes(), TEXT_CONTENT_TYPE),
            Value::Null => (Vec::new(), JSON_CONTENT_TYPE),
            other => (other.to_string().into_bytes(), JSON_CONTENT_TYPE),
        };

        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("content-type"))
        {
            headers.push(("content-type".to_string(), default_content_type.to_string()));
        }

        RenderedResponse {
            status: self.status,
            headers,
            body: bytes,
        }
    }
}

impl Clone for Response {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            status: self.status,
            body: self.body.clone(),
            headers: self.headers.clone(),
            weight: self.weight,
            delay: self.delay,
            max_uses: self.max_uses,
            hits: AtomicU64::new(self.hits()),
            uses: AtomicU64::new(self.hits()),
        }
    }
}

impl Identified for Response {
    type Id = ResponseId;

    fn id(&self) -> &ResponseId {
        &self.id
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let fields = if self.max_uses.is_some() { 8 } else { 7 };
        let mut state = serializer.serialize_struct("Response", fields)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("status_code", &self.status_code())?;
        state.serialize_field("body", &self.body)?;
        state.serialize_field("headers", &self.headers)?;
        state.serialize_field("weight", &self.weight)?;
        state.serialize_field("delay", &self.delay)?;
        if let Some(max_uses) = self.max_uses {
            state.serialize_field("max_uses", &max_uses)?;
        }
        state.serialize_field("hits", &self.hits())?;
        state.end()
    }
}

/// A fully rendered reply, ready for a transport to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Headers in configured order; always carries a content type
    pub headers: Vec<(String, String)>,
    /// Body bytes
    pub body: Vec<u8>,
}

impl RenderedResponse {
    /// Bare JSON reply `{"detail": ...}` used when nothing was configured.
    #[must_use]
    pub fn detail(status: StatusCode, detail: &str) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), JSON_CONTENT_TYPE.to_string())],
            body: serde_json::json!({ "detail": detail }).to_string().into_bytes(),
        }
    }

    /// Header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body as UTF-8 text, replacing invalid sequences.
    #[must_use]
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_defaults() {
        let r: Response = serde_json::from_value(json!({"status_code": 201})).unwrap();
        assert_eq!(r.status_code(), 201);
        assert_eq!(r.weight(), 1.0);
        assert!(r.delay().is_zero());
        assert_eq!(r.hits(), 0);
        assert!(r.body().is_null());
        assert!(r.is_active());
        assert!(ulid::Ulid::from_string(r.id().as_str()).is_ok());
    }

    #[test]
    fn test_deserialize_rejects_bad_values() {
        assert!(serde_json::from_value::<Response>(json!({"status_code": 42})).is_err());
        assert!(
            serde_json::from_value::<Response>(json!({"status_code": 200, "weight": -1.0}))
                .is_err()
        );
        assert!(
            serde_json::from_value::<Response>(json!({"status_code": 200, "delay": [2, 1]}))
                .is_err()
        );
        assert!(serde_json::from_value::<Response>(json!({"body": {}})).is_err());
        assert!(
            serde_json::from_value::<Response>(json!({"status_code": 200, "delay": 1e20}))
                .is_err()
        );
    }

    #[test]
    fn test_null_delay_means_none() {
        let r: Response =
            serde_json::from_value(json!({"status_code": 200, "delay": null})).unwrap();
        assert!(r.delay().is_zero());
    }

    #[test]
    fn test_serialize_includes_hits() {
        let r = Response::new(200, json!({"ok": true}))
            .unwrap()
            .with_id("r1")
            .with_max_uses(2);
        r.record_hit();
        let value = serde_json::to_value(&r).unwrap();
        assert_eq!(value["id"], "r1");
        assert_eq!(value["status_code"], 200);
        assert_eq!(value["hits"], 1);
        assert_eq!(value["max_uses"], 2);
        assert_eq!(value["delay"], json!(0.0));
    }

    #[test]
    fn test_max_uses_exhausts_response() {
        let r = Response::new(200, Value::Null).unwrap().with_max_uses(2);
        assert!(r.is_active());
        r.record_hit();
        assert!(r.is_active());
        r.record_hit();
        assert!(!r.is_active());
    }

    #[test]
    fn test_claims_reserve_uses_until_released() {
        let r = Response::new(200, Value::Null).unwrap().with_max_uses(2);
        assert!(r.try_claim());
        assert!(r.try_claim());
        assert!(!r.try_claim());
        assert!(!r.is_active());
        assert_eq!(r.hits(), 0);

        r.record_hit();
        r.release_claim();
        assert_eq!((r.hits(), r.uses()), (1, 1));
        assert!(r.is_active());

        // nothing in flight: release is a no-op
        r.release_claim();
        r.release_claim();
        assert_eq!(r.uses(), 1);
    }

    #[test]
    fn test_concurrent_claims_never_exceed_max_uses() {
        let r = std::sync::Arc::new(Response::new(200, Value::Null).unwrap().with_max_uses(3));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let r = std::sync::Arc::clone(&r);
                std::thread::spawn(move || r.try_claim())
            })
            .collect();
        let granted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(granted, 3);
        assert_eq!(r.uses(), 3);
    }

    #[test]
    fn test_render_json_body_sets_content_type() {
        let r = Response::new(200, json!({"a": 1})).unwrap();
        let rendered = r.render(&TemplateContext::default());
        assert_eq!(rendered.status, StatusCode::OK);
        assert_eq!(rendered.header("Content-Type"), Some("application/json"));
        assert_eq!(rendered.body, br#"{"a":1}"#.to_vec());
    }

    #[test]
    fn test_render_string_body_keeps_explicit_content_type() {
        let r = Response::new(200, json!("<xml/>"))
            .unwrap()
            .with_header("Content-Type", "application/xml");
        let rendered = r.render(&TemplateContext::default());
        assert_eq!(rendered.body_text(), "<xml/>");
        assert_eq!(rendered.header("content-type"), Some("application/xml"));
        assert_eq!(rendered.headers.len(), 1);
    }

    #[test]
    fn test_detail_response() {
        let rendered = RenderedResponse::detail(StatusCode::NOT_FOUND, "nothing here");
        let body: Value = serde_json::from_slice(&rendered.body).unwrap();
        assert_eq!(body, json!({"detail": "nothing here"}));
    }
}
