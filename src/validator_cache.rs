//! # Schema Validator Cache
//!
//! Compiled JSON Schema validators shared by every [`crate::validator::ResponseValidator`].
//!
//! Compiling a schema is far more expensive than evaluating it, and the same
//! schema tends to appear many times (one validator per status code per
//! route, re-created on every configuration reload). Validators are keyed by
//! the SHA-256 of the schema's canonical JSON text and shared through `Arc`.
//!
//! The cache is process-wide; [`crate::router::Router::reset`] calls
//! [`SchemaCache::clear`] so that a full reset never keeps stale compiled state.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info};

static GLOBAL: Lazy<SchemaCache> = Lazy::new(SchemaCache::new);

/// Thread-safe cache of compiled validators keyed by schema content.
#[derive(Default)]
pub struct SchemaCache {
    validators: DashMap<String, Arc<jsonschema::Validator>>,
}

impl SchemaCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache.
    #[must_use]
    pub fn global() -> &'static SchemaCache {
        &GLOBAL
    }

    /// Cache key of a schema.
    #[must_use]
    pub fn key(schema: &Value) -> String {
        let mut hasher = Sha256::new();
        hasher.update(schema.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Get the compiled validator for `schema`, compiling it on first use.
    ///
    /// # Errors
    ///
    /// The compiler's message when `schema` is not a valid JSON Schema.
    pub fn get_or_compile(&self, schema: &Value) -> Result<Arc<jsonschema::Validator>, String> {
        let key = Self::key(schema);
        if let Some(found) = self.validators.get(&key) {
            return Ok(Arc::clone(found.value()));
        }
        let compiled = Arc::new(jsonschema::validator_for(schema).map_err(|e| e.to_string())?);
        debug!(schema_key = %&key[..16], "Compiled response schema");
        Ok(Arc::clone(
            self.validators.entry(key).or_insert(compiled).value(),
        ))
    }

    /// Number of compiled validators held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Drop every compiled validator.
    pub fn clear(&self) {
        let dropped = self.validators.len();
        self.validators.clear();
        info!(dropped, "Schema cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_same_schema_compiles_once() {
        let cache = SchemaCache::new();
        let schema = json!({"type": "object"});
        let a = cache.get_or_compile(&schema).unwrap();
        let b = cache.get_or_compile(&schema).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
        cache.get_or_compile(&json!({"type": "array"})).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_invalid_schema_is_error_and_not_cached() {
        let cache = SchemaCache::new();
        assert!(cache.get_or_compile(&json!({"type": 12})).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear() {
        let cache = SchemaCache::new();
        cache.get_or_compile(&json!({"type": "string"})).unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }
}
