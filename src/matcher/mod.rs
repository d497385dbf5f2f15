//! # Path Matcher Module
//!
//! Compiles operator-supplied path patterns into anchored regular expressions
//! and extracts typed placeholders from request paths.
//!
//! ## Pattern syntax
//!
//! A pattern is a normal URL path (`/api/v1/users`); a leading `/` is added if
//! missing. Any segment part may be replaced with a placeholder
//! `{name:type}`:
//!
//! | type      | matches                                          |
//! |-----------|--------------------------------------------------|
//! | `integer` | natural number without leading zero (`[1-9]\d*`) |
//! | `number`  | digits with an optional `.`/`,` decimal part     |
//! | `string`  | any run without `/`, `\`, `?` and whitespace     |
//! | `boolean` | `0` or `1`                                       |
//! | `uuid4`   | lower-case RFC-4122 version-4 UUID               |
//!
//! ## Example
//!
//! ```rust
//! use decoy::matcher::PathMatcher;
//!
//! let matcher = PathMatcher::compile("users/{id:integer}/books").unwrap();
//! let params = matcher.match_path("/users/1234/books").unwrap();
//! assert_eq!(params.get("id"), Some("1234"));
//! assert!(matcher.match_path("/users/12a4/books").is_none());
//! ```
//!
//! Extracted values are the raw captured strings; no type coercion happens.

mod core;
#[cfg(test)]
mod tests;

pub use self::core::{normalize, PathMatcher, PathParams, PlaceholderType, MAX_INLINE_PARAMS};
