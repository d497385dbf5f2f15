//! `{{name}}` substitution in response bodies.

use crate::matcher::PathParams;
use crate::request::MockRequest;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;

#[allow(clippy::expect_used)]
static MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("template marker regex is valid")
});

/// Values available to `{{name}}` markers for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateContext {
    values: HashMap<String, String>,
}

impl TemplateContext {
    /// Path parameters shadow query parameters of the same name; for
    /// repeated query keys the first occurrence wins.
    #[must_use]
    pub fn from_request(params: &PathParams, request: &MockRequest) -> Self {
        let mut values = HashMap::new();
        for (name, value) in request.query_params() {
            values.entry(name).or_insert(value);
        }
        for (name, value) in params.iter() {
            values.insert(name.to_string(), value.to_string());
        }
        Self { values }
    }

    /// Set a value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Value of a marker.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Whether no values are available.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Render every string leaf of `body`; markers without a value are kept.
#[must_use]
pub fn render_body(body: &Value, context: &TemplateContext) -> Value {
    if context.is_empty() {
        return body.clone();
    }
    match body {
        Value::String(text) => Value::String(render_str(text, context)),
        Value::Array(items) => Value::Array(items.iter().map(|v| render_body(v, context)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_body(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn render_str(text: &str, context: &TemplateContext) -> String {
    if !text.contains("{{") {
        return text.to_string();
    }
    MARKER
        .replace_all(text, |caps: &Captures<'_>| match context.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
