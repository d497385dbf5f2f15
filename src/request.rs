//! Transport-independent view of an inbound request.
//!
//! The transport layer (or the CLI) builds a [`MockRequest`] and hands it to
//! [`crate::service::MockService`]. Routes match on `method` and `path`;
//! authentication strategies read headers, cookies, form fields and the raw
//! query string.

use http::Method;
use std::collections::HashMap;
use tracing::debug;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Parse a `Cookie` header value into name/value pairs.
///
/// Values are percent-decoded when possible and kept verbatim otherwise.
#[must_use]
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let raw = parts.next().unwrap_or("").trim();
            let value = urlencoding::decode(raw)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| raw.to_string());
            Some((name.to_string(), value))
        })
        .collect()
}

/// Parse a raw query string (without `?`) into decoded pairs, keeping order
/// and repeated keys.
#[must_use]
pub fn parse_query_params(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Parse an `application/x-www-form-urlencoded` body.
#[must_use]
pub fn parse_form(body: &[u8]) -> HashMap<String, String> {
    url::form_urlencoded::parse(body)
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Inbound request as seen by the matching engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MockRequest {
    /// HTTP method
    pub method: Method,
    /// Path without query string, e.g. `/users/42`
    pub path: String,
    /// Raw query string without the leading `?`
    pub query: String,
    /// Headers with lower-cased names
    pub headers: HashMap<String, String>,
    /// Cookies
    pub cookies: HashMap<String, String>,
    /// Form fields from a urlencoded body
    pub form: HashMap<String, String>,
    /// Raw request body
    pub body: Vec<u8>,
}

impl MockRequest {
    /// Create a request from a method and a path that may carry a query string.
    pub fn new(method: Method, path_and_query: &str) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, query),
            None => (path_and_query, ""),
        };
        Self {
            method,
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            query: query.to_string(),
            headers: HashMap::new(),
            cookies: HashMap::new(),
            form: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Create a request from an absolute URL or a bare path.
    ///
    /// Scheme, host and fragment are dropped; the path keeps its
    /// percent-encoding as sent on the wire.
    pub fn from_url(method: Method, url: &str) -> Self {
        match url::Url::parse(url) {
            Ok(parsed) => {
                let mut request = Self::new(method, parsed.path());
                request.query = parsed.query().unwrap_or("").to_string();
                request
            }
            Err(_) => {
                let without_fragment = url.split('#').next().unwrap_or(url);
                Self::new(method, without_fragment)
            }
        }
    }

    /// Add a header. A `cookie` header also populates [`MockRequest::cookies`];
    /// a urlencoded `content-type` re-parses an already set body as form data.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name == "cookie" {
            self.cookies.extend(parse_cookies(value));
        }
        self.headers.insert(name, value.to_string());
        if self.is_form() && !self.body.is_empty() {
            self.form = parse_form(&self.body);
        }
        self
    }

    /// Add a cookie.
    #[must_use]
    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }

    /// Add a form field.
    #[must_use]
    pub fn with_form_field(mut self, name: &str, value: &str) -> Self {
        self.form.insert(name.to_string(), value.to_string());
        self
    }

    /// Set the raw body. Urlencoded bodies are parsed into form fields.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        if self.is_form() {
            self.form = parse_form(&self.body);
            debug!(field_count = self.form.len(), "Form body parsed");
        }
        self
    }

    fn is_form(&self) -> bool {
        self.header("content-type")
            .map(|ct| ct.to_ascii_lowercase().starts_with(FORM_CONTENT_TYPE))
            .unwrap_or(false)
    }

    /// Header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Cookie value by name.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Form field by name.
    #[must_use]
    pub fn form_field(&self, name: &str) -> Option<&str> {
        self.form.get(name).map(String::as_str)
    }

    /// Decoded query parameters in order of appearance.
    #[must_use]
    pub fn query_params(&self) -> Vec<(String, String)> {
        parse_query_params(&self.query)
    }

    /// First decoded value of a query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        url::form_urlencoded::parse(self.query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}
