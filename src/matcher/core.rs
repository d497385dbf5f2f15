//! Path matcher core - hot path for request matching.

use crate::error::{EngineError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Maximum number of path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Finds `{name:type}` placeholders in a raw pattern.
#[allow(clippy::expect_used)]
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{(?P<name>[^{}:]*):(?P<kind>[^{}]*)\}").expect("placeholder regex is valid")
});

/// Placeholder names must be usable as regex capture group names.
#[allow(clippy::expect_used)]
static PLACEHOLDER_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("placeholder name regex is valid")
});

/// Supported placeholder types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderType {
    /// Natural number without leading zero
    Integer,
    /// Digits with an optional single `.` or `,` decimal separator
    Number,
    /// Any run of characters without `/`, `\`, `?` and whitespace
    String,
    /// `0` or `1`
    Boolean,
    /// RFC-4122 version 4 UUID
    Uuid4,
}

impl PlaceholderType {
    /// Regular expression fragment matching a value of this type.
    #[must_use]
    pub fn pattern(self) -> &'static str {
        match self {
            PlaceholderType::Integer => r"[1-9][0-9]*",
            PlaceholderType::Number => r"[0-9]+(?:[.,][0-9]+)?",
            PlaceholderType::String => r"[^\\/\s?]+",
            PlaceholderType::Boolean => r"[01]",
            PlaceholderType::Uuid4 => {
                r"[a-f0-9]{8}-[a-f0-9]{4}-4[a-f0-9]{3}-[89ab][a-f0-9]{3}-[a-f0-9]{12}"
            }
        }
    }

    /// Name used in patterns.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PlaceholderType::Integer => "integer",
            PlaceholderType::Number => "number",
            PlaceholderType::String => "string",
            PlaceholderType::Boolean => "boolean",
            PlaceholderType::Uuid4 => "uuid4",
        }
    }
}

impl FromStr for PlaceholderType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "integer" => Ok(PlaceholderType::Integer),
            "number" => Ok(PlaceholderType::Number),
            "string" => Ok(PlaceholderType::String),
            "boolean" => Ok(PlaceholderType::Boolean),
            "uuid4" => Ok(PlaceholderType::Uuid4),
            other => Err(format!("unknown placeholder type '{other}'")),
        }
    }
}

impl fmt::Display for PlaceholderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a raw path: prefix `/` if missing, otherwise unchanged.
///
/// Trailing slashes are kept, so `/users` and `/users/` are distinct paths.
#[must_use]
pub fn normalize(raw: &str) -> String {
    if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{raw}")
    }
}

/// Path parameters captured by a successful match, in pattern order.
///
/// Stack-allocated for up to [`MAX_INLINE_PARAMS`] placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>);

impl PathParams {
    /// Raw captured value of a placeholder.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of captured placeholders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(name, value)` pairs in pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    /// Copy into an owned map.
    /// Note: This allocates - use get() in hot paths instead
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    pub(crate) fn push(&mut self, name: Arc<str>, value: String) {
        self.0.push((name, value));
    }
}

impl Serialize for PathParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Compiled path pattern.
///
/// Immutable once constructed. Literal parts match verbatim; each
/// `{name:type}` placeholder becomes a named capture group and the whole
/// expression is anchored at both ends.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    pattern: String,
    regex: Regex,
    param_names: Vec<Arc<str>>,
}

impl PathMatcher {
    /// Compile a pattern.
    ///
    /// # Errors
    ///
    /// [`EngineError::PathPattern`] when a placeholder has an unknown type, an
    /// invalid name, or a name used twice in the same pattern.
    pub fn compile(raw: &str) -> Result<Self> {
        let pattern = normalize(raw);
        let (regex, param_names) = Self::pattern_to_regex(&pattern)?;
        Ok(Self {
            pattern,
            regex,
            param_names,
        })
    }

    /// The normalized pattern string.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Placeholder names in pattern order.
    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        &self.param_names
    }

    /// Match a request path, returning the captured placeholders.
    ///
    /// The request path is normalized the same way as the pattern.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<PathParams> {
        let path: Cow<'_, str> = if path.starts_with('/') {
            Cow::Borrowed(path)
        } else {
            Cow::Owned(normalize(path))
        };
        let captures = self.regex.captures(&path)?;
        let mut params = PathParams::default();
        for name in &self.param_names {
            if let Some(value) = captures.name(name) {
                params.push(Arc::clone(name), value.as_str().to_string());
            }
        }
        Some(params)
    }

    /// Convert a normalized pattern into an anchored regex and its placeholder names.
    fn pattern_to_regex(pattern: &str) -> Result<(Regex, Vec<Arc<str>>)> {
        let error = |reason: String| EngineError::PathPattern {
            pattern: pattern.to_string(),
            reason,
        };

        let mut expression = String::with_capacity(pattern.len() * 2 + 2);
        expression.push('^');
        let mut param_names: Vec<Arc<str>> = Vec::new();
        let mut last = 0;

        for captures in PLACEHOLDER.captures_iter(pattern) {
            let (Some(whole), Some(name), Some(kind)) =
                (captures.get(0), captures.name("name"), captures.name("kind"))
            else {
                continue;
            };
            let name = name.as_str();
            if !PLACEHOLDER_NAME.is_match(name) {
                return Err(error(format!("invalid placeholder name '{name}'")));
            }
            let kind: PlaceholderType = kind.as_str().parse().map_err(error)?;
            if param_names.iter().any(|existing| existing.as_ref() == name) {
                return Err(error(format!("placeholder '{name}' is used more than once")));
            }

            expression.push_str(&regex::escape(&pattern[last..whole.start()]));
            expression.push_str("(?P<");
            expression.push_str(name);
            expression.push('>');
            expression.push_str(kind.pattern());
            expression.push(')');
            param_names.push(Arc::from(name));
            last = whole.end();
        }
        expression.push_str(&regex::escape(&pattern[last..]));
        expression.push('$');

        let regex = Regex::new(&expression).map_err(|e| error(e.to_string()))?;
        Ok((regex, param_names))
    }
}

impl PartialEq for PathMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for PathMatcher {}

impl fmt::Display for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl Serialize for PathMatcher {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.pattern)
    }
}

impl<'de> Deserialize<'de> for PathMatcher {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        PathMatcher::compile(&raw).map_err(serde::de::Error::custom)
    }
}
