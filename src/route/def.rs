use crate::ids::RouteId;
use crate::response::{Response, ResponseSelector};
use crate::security::Auth;
use crate::validator::ResponseValidator;
use http::Method;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Methods a route may list.
pub const SUPPORTED_METHODS: [Method; 9] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::CONNECT,
    Method::OPTIONS,
    Method::TRACE,
    Method::PATCH,
];

fn default_methods() -> Vec<Method> {
    vec![Method::GET]
}

/// Plain definition of a route, as received from configuration, the
/// management layer or OpenAPI ingestion.
///
/// Turning it into a [`crate::route::Route`] compiles the path and checks
/// every invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDef {
    /// Identifier; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RouteId>,
    /// Path pattern, e.g. `/users/{id:integer}`
    pub path: String,
    /// Allowed methods; `[GET]` when absent
    #[serde(
        default = "default_methods",
        alias = "http_methods",
        serialize_with = "serialize_methods",
        deserialize_with = "deserialize_methods"
    )]
    pub methods: Vec<Method>,
    /// Authentication policy
    #[serde(default, deserialize_with = "crate::security::deserialize_nullable")]
    pub auth: Auth,
    /// Candidate responses in selection order
    #[serde(default)]
    pub responses: Vec<Response>,
    /// Validators every response must satisfy (at least one of)
    #[serde(default)]
    pub response_validators: Vec<ResponseValidator>,
    /// Response selection strategy
    #[serde(default, alias = "response_selector")]
    pub selector: ResponseSelector,
    /// Initial hit counter, carried when re-loading a serialized route
    #[serde(default, skip_serializing)]
    pub hits: u64,
}

impl RouteDef {
    /// `GET` route on `path` with no auth, responses or validators.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            id: None,
            path: path.into(),
            methods: default_methods(),
            auth: Auth::None,
            responses: Vec::new(),
            response_validators: Vec::new(),
            selector: ResponseSelector::default(),
            hits: 0,
        }
    }

    /// Set the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<RouteId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Replace the allowed methods.
    #[must_use]
    pub fn with_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    /// Set the authentication policy.
    #[must_use]
    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    /// Append a response.
    #[must_use]
    pub fn with_response(mut self, response: Response) -> Self {
        self.responses.push(response);
        self
    }

    /// Append a validator.
    #[must_use]
    pub fn with_validator(mut self, validator: ResponseValidator) -> Self {
        self.response_validators.push(validator);
        self
    }

    /// Set the selection strategy.
    #[must_use]
    pub fn with_selector(mut self, selector: ResponseSelector) -> Self {
        self.selector = selector;
        self
    }
}

/// Parse a method name, accepting only the standard verbs (case-insensitive).
pub(crate) fn parse_method(name: &str) -> Option<Method> {
    let upper = name.trim().to_ascii_uppercase();
    SUPPORTED_METHODS
        .iter()
        .find(|m| m.as_str() == upper)
        .cloned()
}

pub(crate) fn serialize_methods<S: Serializer>(
    methods: &[Method],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(methods.iter().map(Method::as_str))
}

fn deserialize_methods<'de, D>(deserializer: D) -> std::result::Result<Vec<Method>, D::Error>
where
    D: Deserializer<'de>,
{
    let names = Vec::<String>::deserialize(deserializer)?;
    names
        .iter()
        .map(|name| {
            parse_method(name)
                .ok_or_else(|| serde::de::Error::custom(format!("unsupported HTTP method '{name}'")))
        })
        .collect()
}
