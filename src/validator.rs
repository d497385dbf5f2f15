//! JSON Schema checks constraining the responses a route accepts.

use crate::collections::Identified;
use crate::error::{EngineError, Result};
use crate::ids::ValidatorId;
use crate::response::Response;
use crate::validator_cache::SchemaCache;
use http::StatusCode;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Validator scoped to one status code.
///
/// A response is checked against a validator only when their status codes
/// match; a mismatch is itself a validation failure.
#[derive(Clone, Deserialize)]
#[serde(try_from = "ValidatorDef")]
pub struct ResponseValidator {
    id: ValidatorId,
    status: StatusCode,
    json_schema: Arc<Value>,
    compiled: Arc<jsonschema::Validator>,
}

#[derive(Deserialize)]
struct ValidatorDef {
    #[serde(default)]
    id: Option<ValidatorId>,
    status_code: u16,
    json_schema: Value,
}

impl TryFrom<ValidatorDef> for ResponseValidator {
    type Error = EngineError;

    fn try_from(def: ValidatorDef) -> Result<Self> {
        let validator = ResponseValidator::new(def.status_code, def.json_schema)?;
        Ok(match def.id {
            Some(id) => validator.with_id(id),
            None => validator,
        })
    }
}

impl ResponseValidator {
    /// Compile a validator (through the shared schema cache).
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidDefinition`] for an invalid status code or a
    /// schema that does not compile.
    pub fn new(status_code: u16, json_schema: Value) -> Result<Self> {
        let status = StatusCode::from_u16(status_code).map_err(|_| {
            EngineError::InvalidDefinition(format!("invalid status code {status_code}"))
        })?;
        let compiled = SchemaCache::global()
            .get_or_compile(&json_schema)
            .map_err(|e| EngineError::InvalidDefinition(format!("invalid JSON schema: {e}")))?;
        Ok(Self {
            id: ValidatorId::generate(),
            status,
            json_schema: Arc::new(json_schema),
            compiled,
        })
    }

    /// Replace the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<ValidatorId>) -> Self {
        self.id = id.into();
        self
    }

    /// Unique identifier.
    #[must_use]
    pub fn id(&self) -> &ValidatorId {
        &self.id
    }

    /// Status code the validator applies to.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// The schema as supplied.
    #[must_use]
    pub fn json_schema(&self) -> &Value {
        &self.json_schema
    }

    /// Check a response.
    ///
    /// # Errors
    ///
    /// [`EngineError::Validation`] if the status codes differ or the body
    /// does not conform to the schema.
    pub fn validate(&self, response: &Response) -> Result<()> {
        if response.status() != self.status {
            return Err(EngineError::Validation(format!(
                "status code {} does not match validator status code {}",
                response.status_code(),
                self.status_code()
            )));
        }
        self.compiled.validate(response.body()).map_err(|e| {
            EngineError::Validation(format!("JSON schema validation failed: {e}"))
        })
    }

    /// Whether [`ResponseValidator::validate`] would succeed.
    #[must_use]
    pub fn accepts(&self, response: &Response) -> bool {
        response.status() == self.status && self.compiled.is_valid(response.body())
    }
}

impl Identified for ResponseValidator {
    type Id = ValidatorId;

    fn id(&self) -> &ValidatorId {
        &self.id
    }
}

impl fmt::Debug for ResponseValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseValidator")
            .field("id", &self.id)
            .field("status_code", &self.status_code())
            .field("json_schema", &self.json_schema)
            .finish()
    }
}

impl Serialize for ResponseValidator {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ResponseValidator", 3)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("status_code", &self.status_code())?;
        state.serialize_field("json_schema", self.json_schema.as_ref())?;
        state.end()
    }
}
