//! OpenAPI 3.x ingestion.
//!
//! Derives one [`RouteDef`] per `(path, operation)` of a document. Only the
//! shape of the API is derived: typed path placeholders, the method, the
//! `operationId` as route id, and one [`ResponseValidator`] per documented
//! response with a schema. Responses and authentication are left for the
//! operator to configure.

use crate::matcher::PlaceholderType;
use crate::route::RouteDef;
use crate::validator::ResponseValidator;
use anyhow::{anyhow, bail, Context};
use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info};

/// Dialect stamped on every derived validator schema.
pub const JSON_SCHEMA_DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

const VERBS: [(&str, Method); 8] = [
    ("get", Method::GET),
    ("put", Method::PUT),
    ("post", Method::POST),
    ("delete", Method::DELETE),
    ("options", Method::OPTIONS),
    ("head", Method::HEAD),
    ("patch", Method::PATCH),
    ("trace", Method::TRACE),
];

const MAX_REF_DEPTH: usize = 64;

#[allow(clippy::expect_used)]
static UNTYPED_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("untyped placeholder regex is valid")
});

/// Read a JSON or YAML OpenAPI document and derive its routes.
///
/// # Errors
///
/// Fails if the file cannot be read or parsed, or if a derived route or
/// validator is invalid.
pub fn load_routes(path: &Path) -> anyhow::Result<Vec<RouteDef>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("OpenAPI document {} cannot be read", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    let doc: Value = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("OpenAPI document {} is not valid YAML", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("OpenAPI document {} is not valid JSON", path.display()))?
    };
    let routes = routes_from_value(&doc)
        .with_context(|| format!("OpenAPI document {} cannot be converted", path.display()))?;
    info!(
        document = %path.display(),
        routes_count = routes.len(),
        "Routes derived from OpenAPI document"
    );
    Ok(routes)
}

/// Derive routes from an already parsed document, in document order.
///
/// # Errors
///
/// Fails on a missing `paths` object, unresolvable `$ref`s or invalid
/// response schemas.
pub fn routes_from_value(doc: &Value) -> anyhow::Result<Vec<RouteDef>> {
    let paths = doc
        .get("paths")
        .and_then(Value::as_object)
        .ok_or_else(|| anyhow!("document has no `paths` object"))?;

    let mut routes = Vec::new();
    for (url, item) in paths {
        let item = resolve(doc, item)?;
        let shared_params = item.get("parameters");
        for (verb, method) in &VERBS {
            let Some(operation) = item.get(*verb) else {
                continue;
            };
            let operation = resolve(doc, operation)?;
            let path = typed_path(doc, url, shared_params, operation.get("parameters"))
                .with_context(|| format!("{} {url}", method.as_str()))?;
            let validators = response_validators(doc, operation)
                .with_context(|| format!("{} {url}", method.as_str()))?;
            debug!(
                method = %method,
                path = %path,
                validators_count = validators.len(),
                "OpenAPI operation converted"
            );

            let mut def = RouteDef::new(path).with_methods([method.clone()]);
            if let Some(operation_id) = operation
                .get("operationId")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
            {
                def = def.with_id(operation_id);
            }
            def.response_validators = validators;
            routes.push(def);
        }
    }
    Ok(routes)
}

/// Follow a local `$ref` chain (`#/components/...`) to the referenced value.
fn resolve<'a>(doc: &'a Value, value: &'a Value) -> anyhow::Result<&'a Value> {
    let mut current = value;
    for _ in 0..MAX_REF_DEPTH {
        let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
            return Ok(current);
        };
        let pointer = reference
            .strip_prefix('#')
            .ok_or_else(|| anyhow!("only local references are supported, got '{reference}'"))?;
        current = doc
            .pointer(pointer)
            .ok_or_else(|| anyhow!("reference '{reference}' cannot be resolved"))?;
    }
    bail!("reference chain is deeper than {MAX_REF_DEPTH}")
}

/// Copy of `schema` with every local `$ref` replaced by its target.
fn inline_refs(doc: &Value, schema: &Value, depth: usize) -> anyhow::Result<Value> {
    if depth > MAX_REF_DEPTH {
        bail!("schema references nest deeper than {MAX_REF_DEPTH} (recursive schema?)");
    }
    match schema {
        Value::Object(map) if map.get("$ref").is_some_and(Value::is_string) => {
            let target = resolve(doc, schema)?;
            inline_refs(doc, target, depth + 1)
        }
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key.clone(), inline_refs(doc, value, depth)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| inline_refs(doc, item, depth))
            .collect::<anyhow::Result<Vec<_>>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

/// Placeholder type for a parameter schema.
fn placeholder_type(schema: Option<&Value>) -> PlaceholderType {
    let Some(schema) = schema else {
        return PlaceholderType::String;
    };
    match schema.get("type").and_then(Value::as_str) {
        Some("integer") => PlaceholderType::Integer,
        Some("number") => PlaceholderType::Number,
        Some("boolean") => PlaceholderType::Boolean,
        Some("string") if schema.get("format").and_then(Value::as_str) == Some("uuid") => {
            PlaceholderType::Uuid4
        }
        _ => PlaceholderType::String,
    }
}

/// Rewrite `{name}` segments of `url` into `{name:type}` using the path
/// parameters of the path item and the operation (operation wins).
fn typed_path(
    doc: &Value,
    url: &str,
    shared: Option<&Value>,
    own: Option<&Value>,
) -> anyhow::Result<String> {
    let mut types: Vec<(String, PlaceholderType)> = Vec::new();
    for list in [shared, own].into_iter().flatten() {
        let Some(params) = list.as_array() else {
            continue;
        };
        for param in params {
            let param = resolve(doc, param)?;
            if param.get("in").and_then(Value::as_str) != Some("path") {
                continue;
            }
            let Some(name) = param.get("name").and_then(Value::as_str) else {
                continue;
            };
            let schema = match param.get("schema") {
                Some(schema) => Some(resolve(doc, schema)?),
                None => None,
            };
            let kind = placeholder_type(schema);
            match types.iter_mut().find(|(n, _)| n == name) {
                Some(entry) => entry.1 = kind,
                None => types.push((name.to_string(), kind)),
            }
        }
    }

    let mut path = url.to_string();
    for (name, kind) in &types {
        path = path.replace(&format!("{{{name}}}"), &format!("{{{name}:{kind}}}"));
    }
    // undeclared parameters
    Ok(UNTYPED_PLACEHOLDER
        .replace_all(&path, "{${1}:string}")
        .into_owned())
}

/// One validator per numeric response code carrying a schema.
fn response_validators(doc: &Value, operation: &Value) -> anyhow::Result<Vec<ResponseValidator>> {
    let Some(responses) = operation.get("responses").and_then(Value::as_object) else {
        return Ok(Vec::new());
    };

    let mut validators = Vec::new();
    for (code, response) in responses {
        let Ok(status) = code.parse::<u16>() else {
            debug!(code = %code, "Skipping non-numeric response code");
            continue;
        };
        let response = resolve(doc, response)?;
        let Some(content) = response.get("content").and_then(Value::as_object) else {
            continue;
        };
        let media = content
            .get("application/json")
            .or_else(|| content.values().next());
        let Some(schema) = media.and_then(|m| m.get("schema")) else {
            continue;
        };

        let mut schema = inline_refs(doc, schema, 0)?;
        if let Value::Object(map) = &mut schema {
            map.insert(
                "$schema".to_string(),
                Value::String(JSON_SCHEMA_DIALECT.to_string()),
            );
        }
        let validator = ResponseValidator::new(status, schema)
            .with_context(|| format!("response {code} has an invalid schema"))?;
        validators.push(validator);
    }
    Ok(validators)
}
